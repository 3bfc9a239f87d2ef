//! Multi-part HTML viewer exports packaged as a zip archive.

use chrono::Utc;
use std::sync::Arc;

use chronicle_core::constants::{VIEWER_ARCHIVE_FORMAT, VIEWER_FORMAT};
use chronicle_core::models::{ExportJob, ExportMessage};
use chronicle_core::naming::build_viewer_archive_name;
use chronicle_core::ExportError;
use chronicle_render::html::render_viewer_index;
use chronicle_render::{InlineImageEmbedder, ViewerAssets};

use crate::archive::{build_manifest, write_viewer_archive_blocking};
use crate::chunk::split_messages;
use crate::config::WorkerConfig;
use crate::context::ExportContext;
use crate::executor::BoundedExecutor;
use crate::part::{render_parts, PartRenderContext};
use crate::processor::CompletedExport;

fn build_error(e: anyhow::Error) -> ExportError {
    ExportError::Build {
        format: VIEWER_FORMAT.to_string(),
        message: format!("{:#}", e),
    }
}

/// Render every part, then write the archive.
///
/// Nothing is written to disk unless all parts rendered. The archive is
/// stored as `<job id>.zip`; the display name only goes into `file_name`,
/// since two exports of one channel within a minute share it.
#[tracing::instrument(skip_all, fields(job_id = %job.id, messages = messages.len()))]
pub async fn export_viewer(
    context: &ExportContext,
    config: &WorkerConfig,
    job: &ExportJob,
    channel_name: &str,
    messages: Vec<ExportMessage>,
) -> Result<CompletedExport, ExportError> {
    let extra = job.extra(&config.limits);
    let requested_limit = i64::try_from(extra.slice_limit).unwrap_or(i64::MAX);
    let chunks = split_messages(messages, requested_limit, &config.limits);
    let part_total = chunks.len();
    let generated_at = Utc::now();

    let assets = Arc::new(
        ViewerAssets::load(config.viewer_assets_dir.as_deref())
            .await
            .map_err(build_error)?,
    );
    let embedder = match (&context.attachments, config.inline_images) {
        (Some(source), true) => Some(Arc::new(InlineImageEmbedder::new(Arc::clone(source)))),
        _ => None,
    };

    tracing::info!(
        part_total,
        slice_limit = extra.slice_limit,
        max_concurrency = extra.max_concurrency,
        inline_images = embedder.is_some(),
        "Rendering viewer export"
    );

    let part_context = Arc::new(PartRenderContext {
        job: job.clone(),
        channel_name: channel_name.to_string(),
        display_options: extra.display_settings.clone(),
        part_total,
        generated_at,
        assets: Arc::clone(&assets),
        renderer: Arc::clone(&context.part_renderer),
        embedder,
    });
    let parts = render_parts(
        part_context,
        chunks,
        BoundedExecutor::new(extra.max_concurrency),
    )
    .await?;

    let manifest = build_manifest(job, channel_name, &extra, generated_at, &parts);
    let index_html = render_viewer_index(&manifest, &assets).map_err(build_error)?;

    tokio::fs::create_dir_all(&config.storage_dir).await?;
    let file_name = build_viewer_archive_name(channel_name, generated_at);
    let file_path = config
        .storage_dir
        .join(format!("{}.{}", job.id, VIEWER_ARCHIVE_FORMAT));
    let total_messages = manifest.total_messages;
    write_viewer_archive_blocking(file_path.clone(), parts, manifest, index_html).await?;

    tracing::info!(
        file_name = %file_name,
        part_total,
        total_messages,
        "Viewer archive written"
    );

    Ok(CompletedExport {
        file_path,
        file_name,
        format_override: Some(VIEWER_ARCHIVE_FORMAT),
    })
}
