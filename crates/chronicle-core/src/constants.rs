//! Shared constants for the export pipeline.

/// Messages per viewer part when a job does not ask for a specific size.
pub const DEFAULT_EXPORT_SLICE_LIMIT: usize = 5000;

/// Smallest slice a job may request.
pub const MIN_EXPORT_SLICE_LIMIT: usize = 1;

/// Largest slice a job may request.
pub const MAX_EXPORT_SLICE_LIMIT: usize = 20000;

/// Parallel part renders when a job does not ask for a specific value.
pub const DEFAULT_EXPORT_CONCURRENCY: usize = 2;

/// Upper bound on parallel part renders for a single job.
pub const MAX_EXPORT_CONCURRENCY: usize = 8;

/// Scheduler poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default output directory for finished exports.
pub const DEFAULT_STORAGE_DIR: &str = "./data/exports";

/// Format key that selects the multi-part viewer archive.
pub const VIEWER_FORMAT: &str = "html";

/// Format recorded on a job once the viewer archive has been written.
pub const VIEWER_ARCHIVE_FORMAT: &str = "zip";

/// Archive entry holding the serialized manifest.
pub const MANIFEST_ENTRY: &str = "manifest/meta.json";

/// Archive entry holding the landing page.
pub const INDEX_ENTRY: &str = "index.html";

/// Prefix for generated archive names.
pub const ARCHIVE_NAME_PREFIX: &str = "chronicle";
