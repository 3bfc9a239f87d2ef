use std::path::PathBuf;

use chronicle_core::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_STORAGE_DIR};
use chronicle_core::{ExportLimits, ExporterConfig};

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub storage_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub limits: ExportLimits,
    /// Interval in seconds between runs of the stale job reaper. 0 = disabled.
    pub stale_job_reap_interval_secs: u64,
    /// Jobs stuck in `processing` for longer than this are failed by the reaper.
    pub stale_job_timeout_secs: i64,
    pub inline_images: bool,
    pub viewer_assets_dir: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            limits: ExportLimits::default(),
            stale_job_reap_interval_secs: 60,
            stale_job_timeout_secs: 3600,
            inline_images: true,
            viewer_assets_dir: None,
        }
    }
}

impl From<&ExporterConfig> for WorkerConfig {
    fn from(config: &ExporterConfig) -> Self {
        Self {
            storage_dir: config.storage_dir.clone(),
            poll_interval_ms: config.poll_interval_ms,
            limits: config.limits,
            stale_job_reap_interval_secs: config.stale_job_reap_interval_secs,
            stale_job_timeout_secs: config.stale_job_timeout_secs,
            inline_images: config.inline_images,
            viewer_assets_dir: config.viewer_assets_dir.clone(),
        }
    }
}
