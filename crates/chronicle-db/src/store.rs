//! Job store trait
//!
//! The store is the only source of truth for job status. The worker never
//! caches a status across the claim boundary.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use chronicle_core::models::ExportJob;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Claim the oldest `pending` job.
    ///
    /// Returns `Ok(None)` when nothing is pending or when another poller won
    /// the conditional update; neither case is an error.
    async fn acquire_next_pending(&self) -> Result<Option<ExportJob>>;

    /// `processing -> done`. Clears any error message and, when
    /// `format_override` is non-blank, records the produced format.
    async fn mark_done(
        &self,
        job_id: Uuid,
        file_path: &str,
        file_name: &str,
        format_override: Option<&str>,
    ) -> Result<()>;

    /// `processing -> failed` with a non-empty message.
    async fn mark_failed(&self, job_id: Uuid, error_msg: &str) -> Result<()>;

    /// Fail every job that has been `processing` for longer than `older_than`.
    /// Returns the number of jobs affected.
    async fn reap_stale_processing(&self, older_than: Duration, error_msg: &str) -> Result<u64>;

    /// Insert a new `pending` job.
    async fn enqueue(
        &self,
        channel_id: &str,
        format: &str,
        extra_options: Option<serde_json::Value>,
    ) -> Result<ExportJob>;

    async fn get(&self, job_id: Uuid) -> Result<Option<ExportJob>>;
}

/// Never persist an empty failure reason.
pub(crate) fn non_empty_error(error_msg: &str) -> &str {
    if error_msg.trim().is_empty() {
        "export failed"
    } else {
        error_msg
    }
}

/// Blank overrides leave the requested format in place.
pub(crate) fn effective_override(format_override: Option<&str>) -> Option<&str> {
    format_override.map(str::trim).filter(|f| !f.is_empty())
}
