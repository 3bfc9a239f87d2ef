//! Error types module
//!
//! Every failure that ends an export job is expressed as an [`ExportError`].
//! The worker converts it into the job's persisted `error_msg`, so the
//! `Display` output is what operators eventually see.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to load messages: {0}")]
    LoadMessages(String),

    #[error("Failed to render part {part}: {message}")]
    Render { part: usize, message: String },

    #[error("Failed to build {format} export: {message}")]
    Build { format: String, message: String },

    #[error("Failed to build archive: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job store error: {0}")]
    Store(String),
}

impl ExportError {
    /// Unsupported formats can never succeed on resubmission either.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ExportError::UnsupportedFormat(_))
    }

    /// Message persisted on the job when it transitions to `failed`.
    ///
    /// Never empty: a failed job must always carry a reason.
    pub fn job_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            "export failed".to_string()
        } else {
            message
        }
    }
}
