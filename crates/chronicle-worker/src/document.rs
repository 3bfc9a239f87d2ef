//! Single-document exports (`txt`, `json`, ...) resolved through the formatter registry.

use std::path::Path;

use chronicle_core::models::{ExportJob, ExportMessage, ExportPayload};
use chronicle_core::naming::build_export_file_name;
use chronicle_core::ExportError;
use chronicle_render::FormatterRegistry;

use crate::processor::CompletedExport;

/// Build the document and store it as `<storage_dir>/<job id>.<ext>`.
///
/// Fails with [`ExportError::UnsupportedFormat`] before touching the disk
/// when no formatter is registered for the job's format.
pub async fn export_document(
    formatters: &FormatterRegistry,
    storage_dir: &Path,
    job: &ExportJob,
    channel_name: &str,
    messages: Vec<ExportMessage>,
) -> Result<CompletedExport, ExportError> {
    let formatter = formatters
        .get(&job.format)
        .await
        .ok_or_else(|| ExportError::UnsupportedFormat(job.format.clone()))?;

    let payload = ExportPayload::build(job, channel_name, messages, None);
    let ext = formatter.extension().to_string();
    let file_name = build_export_file_name(&payload, &ext);

    let data = tokio::task::spawn_blocking(move || formatter.build(&payload))
        .await
        .map_err(|e| ExportError::Build {
            format: job.format.clone(),
            message: e.to_string(),
        })?
        .map_err(|e| ExportError::Build {
            format: job.format.clone(),
            message: format!("{:#}", e),
        })?;

    tokio::fs::create_dir_all(storage_dir).await?;
    let file_path = storage_dir.join(format!("{}.{}", job.id, ext));
    tokio::fs::write(&file_path, &data).await?;

    tracing::info!(
        job_id = %job.id,
        format = %job.format,
        file_name = %file_name,
        bytes = data.len(),
        "Export document written"
    );

    Ok(CompletedExport {
        file_path,
        file_name,
        format_override: None,
    })
}
