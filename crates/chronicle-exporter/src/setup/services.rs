//! Wiring of the export pipeline collaborators.

use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;

use chronicle_core::ExporterConfig;
use chronicle_db::{PgChannelDirectory, PgJobStore, PgMessageSource};
use chronicle_render::{FormatterRegistry, LocalAttachmentSource, ViewerAssets};
use chronicle_worker::ExportContext;

pub async fn build_export_context(config: &ExporterConfig, pool: PgPool) -> Result<ExportContext> {
    let assets = Arc::new(ViewerAssets::load(config.viewer_assets_dir.as_deref()).await?);
    let formatters = FormatterRegistry::with_defaults(assets).await;
    tracing::info!(formats = ?formatters.keys().await, "Export formatters registered");

    let mut context = ExportContext::new(
        Arc::new(PgJobStore::new(pool.clone())),
        Arc::new(PgMessageSource::new(pool.clone())),
        Arc::new(PgChannelDirectory::new(pool)),
        formatters,
    );

    match (&config.attachment_dir, config.inline_images) {
        (Some(dir), true) => {
            tracing::info!(attachment_dir = %dir.display(), "Inline image embedding enabled");
            context = context.with_attachments(Arc::new(LocalAttachmentSource::new(dir.clone())));
        }
        (None, true) => {
            tracing::warn!("ATTACHMENT_STORAGE_DIR not set, images will not be inlined");
        }
        _ => {}
    }

    Ok(context)
}
