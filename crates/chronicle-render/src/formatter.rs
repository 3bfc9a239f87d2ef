//! Formatter trait for single-document exports

use anyhow::Result;

use chronicle_core::models::ExportPayload;

/// A single-document export format.
///
/// Formatters are registered under a key and selected by the job's format.
/// Implementations must be `Send + Sync`; one instance serves every job.
pub trait ExportFormatter: Send + Sync {
    /// Registry key, matched case-insensitively.
    fn key(&self) -> &str;

    /// File extension without the leading dot.
    fn extension(&self) -> &str;

    /// Render the whole payload into one document.
    fn build(&self, payload: &ExportPayload) -> Result<Vec<u8>>;
}
