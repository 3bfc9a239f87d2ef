//! Viewer archive assembly.
//!
//! Entry order is fixed: every part in index order, then `manifest/meta.json`,
//! then `index.html`.

use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use chronicle_core::constants::{INDEX_ENTRY, MANIFEST_ENTRY};
use chronicle_core::models::{ExportJob, ExportExtraOptions, ViewerManifest};
use chronicle_core::ExportError;

use crate::part::PartRenderResult;

/// Manifest describing `parts`, which must already be in index order.
pub fn build_manifest(
    job: &ExportJob,
    channel_name: &str,
    extra: &ExportExtraOptions,
    generated_at: DateTime<Utc>,
    parts: &[PartRenderResult],
) -> ViewerManifest {
    ViewerManifest {
        channel_id: job.channel_id.clone(),
        channel_name: channel_name.to_string(),
        generated_at,
        display_options: extra.display_settings.clone(),
        slice_limit: extra.slice_limit,
        max_concurrency: extra.max_concurrency,
        part_total: parts.len(),
        total_messages: parts.iter().map(|p| p.meta.messages).sum(),
        parts: parts.iter().map(|p| p.meta.clone()).collect(),
    }
}

/// Write the archive at `path`, removing the partial file if writing fails.
pub fn write_viewer_archive(
    path: &Path,
    parts: &[PartRenderResult],
    manifest: &ViewerManifest,
    index_html: &[u8],
) -> Result<(), ExportError> {
    let result = write_entries(path, parts, manifest, index_html);
    if result.is_err() {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(error = %e, path = %path.display(), "Failed to remove partial archive");
            }
        }
    }
    result
}

fn write_entries(
    path: &Path,
    parts: &[PartRenderResult],
    manifest: &ViewerManifest,
    index_html: &[u8],
) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut add = |name: &str, content: &[u8]| -> Result<(), ExportError> {
        zip.start_file(name, options)
            .map_err(|e| ExportError::Archive(format!("Failed to add {} to archive: {}", name, e)))?;
        zip.write_all(content)?;
        Ok(())
    };

    for part in parts {
        add(&part.file_name, &part.content)?;
    }
    add(MANIFEST_ENTRY, &serde_json::to_vec_pretty(manifest)?)?;
    add(INDEX_ENTRY, index_html)?;

    let mut writer = zip
        .finish()
        .map_err(|e| ExportError::Archive(format!("Failed to finalize archive: {}", e)))?;
    writer.flush()?;
    Ok(())
}

/// [`write_viewer_archive`] on the blocking pool.
pub async fn write_viewer_archive_blocking(
    path: PathBuf,
    parts: Vec<PartRenderResult>,
    manifest: ViewerManifest,
    index_html: Vec<u8>,
) -> Result<(), ExportError> {
    tokio::task::spawn_blocking(move || {
        write_viewer_archive(&path, &parts, &manifest, &index_html)
    })
    .await
    .map_err(|e| ExportError::Archive(format!("Archive writer task failed: {}", e)))?
}
