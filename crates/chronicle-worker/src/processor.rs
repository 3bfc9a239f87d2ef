//! Processing of a single claimed export job.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chronicle_core::models::{ExportJob, ExportStatus};
use chronicle_core::ExportError;
use chronicle_db::resolve_channel_name;

use crate::config::WorkerConfig;
use crate::context::ExportContext;
use crate::document::export_document;
use crate::viewer::export_viewer;

/// Output of a successful export, recorded on the job by `mark_done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedExport {
    pub file_path: PathBuf,
    pub file_name: String,
    /// Format persisted instead of the requested one, e.g. `zip` for viewer archives.
    pub format_override: Option<&'static str>,
}

#[derive(Clone)]
pub struct ExportProcessor {
    context: Arc<ExportContext>,
    config: WorkerConfig,
}

impl ExportProcessor {
    pub fn new(context: Arc<ExportContext>, config: WorkerConfig) -> Self {
        Self { context, config }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<ExportContext> {
        &self.context
    }

    /// Claim the oldest pending job and process it to a terminal state.
    ///
    /// Returns `Ok(true)` when a job was claimed, whatever its outcome, and
    /// `Ok(false)` when nothing was pending or the claim was lost. Only claim
    /// failures surface as errors.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(job) = self.context.store.acquire_next_pending().await? else {
            tracing::trace!("No export jobs available");
            return Ok(false);
        };

        let job_id = job.id;
        if let Err(e) = self.process_job(job).await {
            tracing::warn!(
                job_id = %job_id,
                error = %e,
                permanent = e.is_permanent(),
                "Export job failed"
            );
        }
        Ok(true)
    }

    /// Export a job already in `processing` and record the outcome.
    ///
    /// Errors are converted into a `failed` transition and returned for
    /// logging. A failing terminal update is logged and never rolls back a
    /// file that was already written, unless the job left `processing` in
    /// the meantime (the stale job reaper failed it): that file belongs to
    /// no job and is removed.
    #[tracing::instrument(skip(self, job), fields(job.id = %job.id, job.format = %job.format, channel_id = %job.channel_id))]
    pub async fn process_job(&self, job: ExportJob) -> Result<CompletedExport, ExportError> {
        match self.export(&job).await {
            Ok(done) => {
                let file_path = done.file_path.to_string_lossy();
                if let Err(e) = self
                    .context
                    .store
                    .mark_done(job.id, &file_path, &done.file_name, done.format_override)
                    .await
                {
                    tracing::error!(
                        error = %e,
                        file_path = %file_path,
                        "Failed to mark export job as done"
                    );
                    if let Some(status) = self.abandoned_status(&job).await {
                        discard_orphan(&done.file_path).await;
                        return Err(ExportError::Store(format!(
                            "export job is {} and no longer accepts its output",
                            status
                        )));
                    }
                }
                Ok(done)
            }
            Err(e) => {
                if let Err(store_err) = self
                    .context
                    .store
                    .mark_failed(job.id, &e.job_message())
                    .await
                {
                    tracing::error!(
                        error = %store_err,
                        cause = %e,
                        "Failed to mark export job as failed"
                    );
                }
                Err(e)
            }
        }
    }

    /// Status of a job that left `processing` while it was being exported.
    async fn abandoned_status(&self, job: &ExportJob) -> Option<ExportStatus> {
        match self.context.store.get(job.id).await {
            Ok(Some(current)) if current.status != ExportStatus::Processing => Some(current.status),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to re-read export job after rejected update");
                None
            }
        }
    }

    async fn export(&self, job: &ExportJob) -> Result<CompletedExport, ExportError> {
        let channel_name = resolve_channel_name(self.context.channels.as_ref(), &job.channel_id).await;

        let messages = self
            .context
            .messages
            .load_messages_for_export(job)
            .await
            .map_err(|e| ExportError::LoadMessages(format!("{:#}", e)))?;

        if job.is_viewer() {
            export_viewer(&self.context, &self.config, job, &channel_name, messages).await
        } else {
            export_document(
                &self.context.formatters,
                &self.config.storage_dir,
                job,
                &channel_name,
                messages,
            )
            .await
        }
    }
}

async fn discard_orphan(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::info!(path = %path.display(), "Removed export file of abandoned job"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(error = %e, path = %path.display(), "Failed to remove orphaned export file"),
    }
}
