#[path = "helpers/mod.rs"]
mod helpers;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use chronicle_core::constants::{INDEX_ENTRY, MANIFEST_ENTRY};
use chronicle_core::models::{ExportPayload, ExportStatus, ViewerManifest};
use chronicle_db::JobStore;
use chronicle_render::{HtmlPartRenderer, PartRenderer, ViewerAssets};
use helpers::{entry_names, messages, read_entry, PipelineBuilder};

/// Fails on one specific part and renders the rest normally.
struct FailOnPart(usize);

#[async_trait]
impl PartRenderer for FailOnPart {
    async fn render(&self, payload: &ExportPayload, assets: &ViewerAssets) -> Result<Vec<u8>> {
        if payload.part.map(|p| p.index) == Some(self.0) {
            anyhow::bail!("renderer exploded on part {}", self.0);
        }
        HtmlPartRenderer.render(payload, assets).await
    }
}

#[tokio::test]
async fn test_viewer_export_produces_two_part_archive() {
    let pipeline = PipelineBuilder::new()
        .channel("ch-a", "General", messages(3))
        .build()
        .await;
    let job = pipeline
        .store
        .enqueue("ch-a", "html", Some(json!({ "slice_limit": 2, "max_concurrency": 2 })))
        .await
        .unwrap();

    assert!(pipeline.processor.run_once().await.unwrap());

    let done = pipeline.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(done.status, ExportStatus::Done);
    assert_eq!(done.format, "zip");
    assert!(done.error_msg.is_none());
    assert!(done.finished_at.is_some());

    let file_name = done.file_name.clone().unwrap();
    assert!(file_name.starts_with("chronicle-General-"));
    let file_path = done.file_path.clone().unwrap();
    let mut archive = zip::ZipArchive::new(std::fs::File::open(&file_path).unwrap()).unwrap();

    assert_eq!(
        entry_names(&mut archive),
        vec![
            "parts/part-001.html",
            "parts/part-002.html",
            MANIFEST_ENTRY,
            INDEX_ENTRY
        ]
    );

    let manifest: ViewerManifest =
        serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)).unwrap();
    assert_eq!(manifest.part_total, 2);
    assert_eq!(manifest.total_messages, 3);
    assert_eq!(manifest.slice_limit, 2);
    assert_eq!(manifest.max_concurrency, 2);
    assert_eq!(manifest.channel_name, "General");
    assert!(manifest.is_consistent());
    let sizes: Vec<usize> = manifest.parts.iter().map(|p| p.messages).collect();
    assert_eq!(sizes, vec![2, 1]);

    for part in &manifest.parts {
        let bytes = read_entry(&mut archive, &part.file);
        assert_eq!(hex::encode(Sha256::digest(&bytes)), part.sha256);
    }

    let index = String::from_utf8(read_entry(&mut archive, INDEX_ENTRY)).unwrap();
    assert!(index.contains(MANIFEST_ENTRY));
    assert!(index.contains("parts/part-002.html"));
}

#[tokio::test]
async fn test_viewer_export_of_empty_channel_has_one_part() {
    let pipeline = PipelineBuilder::new()
        .channel("ch-empty", "Quiet", Vec::new())
        .build()
        .await;
    let job = pipeline.store.enqueue("ch-empty", "html", None).await.unwrap();

    pipeline.processor.run_once().await.unwrap();

    let done = pipeline.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(done.status, ExportStatus::Done);
    let mut archive =
        zip::ZipArchive::new(std::fs::File::open(done.file_path.unwrap()).unwrap()).unwrap();
    let manifest: ViewerManifest =
        serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)).unwrap();
    assert_eq!(manifest.part_total, 1);
    assert_eq!(manifest.total_messages, 0);
    assert!(manifest.parts[0].slice_start.is_none());
}

#[tokio::test]
async fn test_unsupported_format_fails_without_output() {
    let pipeline = PipelineBuilder::new()
        .channel("ch-b", "General", messages(2))
        .build()
        .await;
    let job = pipeline
        .store
        .enqueue("ch-b", "docx-unknown", None)
        .await
        .unwrap();

    assert!(pipeline.processor.run_once().await.unwrap());

    let failed = pipeline.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(failed.status, ExportStatus::Failed);
    assert!(failed.error_msg.unwrap().contains("docx-unknown"));
    assert!(failed.file_path.is_none());
    assert!(failed.finished_at.is_some());
    assert!(pipeline.stored_files().is_empty());
}

#[tokio::test]
async fn test_part_failure_fails_job_without_archive() {
    let pipeline = PipelineBuilder::new()
        .channel("ch-c", "General", messages(5))
        .renderer(Arc::new(FailOnPart(2)))
        .build()
        .await;
    let job = pipeline
        .store
        .enqueue("ch-c", "html", Some(json!({ "slice_limit": 1, "max_concurrency": 3 })))
        .await
        .unwrap();

    pipeline.processor.run_once().await.unwrap();

    let failed = pipeline.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(failed.status, ExportStatus::Failed);
    let message = failed.error_msg.unwrap();
    assert!(message.contains("part 2"), "unexpected message: {}", message);
    assert!(message.contains("renderer exploded"));
    assert!(failed.file_path.is_none());

    let exports = pipeline.storage_dir().join("exports");
    let written = std::fs::read_dir(&exports)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(written, 0);
}

#[tokio::test]
async fn test_single_document_uses_sanitized_channel_name() {
    let pipeline = PipelineBuilder::new()
        .channel("ch-d", "Team/Chat*2024", messages(2))
        .build()
        .await;
    let job = pipeline.store.enqueue("ch-d", "txt", None).await.unwrap();

    pipeline.processor.run_once().await.unwrap();

    let done = pipeline.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(done.status, ExportStatus::Done);
    assert_eq!(done.format, "txt");
    let file_name = done.file_name.unwrap();
    assert_eq!(file_name, "Team_Chat_2024_20240410-20240410.txt");
    assert!(!file_name.contains('/'));
    assert!(done
        .file_path
        .unwrap()
        .ends_with(&format!("{}.txt", job.id)));
}

#[tokio::test]
async fn test_viewer_archive_name_is_sanitized() {
    let pipeline = PipelineBuilder::new()
        .channel("ch-e", "../etc/passwd", messages(1))
        .build()
        .await;
    let job = pipeline.store.enqueue("ch-e", "html", None).await.unwrap();

    pipeline.processor.run_once().await.unwrap();

    let done = pipeline.store.get(job.id).await.unwrap().unwrap();
    let file_name = done.file_name.unwrap();
    assert!(file_name.starts_with("chronicle-_etc_passwd-"));
    assert!(!file_name.contains('/'));
    assert!(pipeline
        .storage_dir()
        .join("exports")
        .join(format!("{}.zip", job.id))
        .exists());
}

#[tokio::test]
async fn test_same_channel_viewer_exports_keep_separate_archives() {
    let pipeline = PipelineBuilder::new()
        .channel("ch-g", "General", messages(3))
        .build()
        .await;
    let first = pipeline.store.enqueue("ch-g", "html", None).await.unwrap();
    let second = pipeline.store.enqueue("ch-g", "html", None).await.unwrap();

    assert!(pipeline.processor.run_once().await.unwrap());
    assert!(pipeline.processor.run_once().await.unwrap());

    let first = pipeline.store.get(first.id).await.unwrap().unwrap();
    let second = pipeline.store.get(second.id).await.unwrap().unwrap();
    assert_eq!(first.status, ExportStatus::Done);
    assert_eq!(second.status, ExportStatus::Done);
    assert_ne!(first.file_path, second.file_path);

    for job in [&first, &second] {
        let path = job.file_path.clone().unwrap();
        assert!(path.ends_with(&format!("{}.zip", job.id)));
        let mut archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        let manifest: ViewerManifest =
            serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)).unwrap();
        assert_eq!(manifest.total_messages, 3);
    }
    assert_eq!(pipeline.stored_files().len(), 2);
}

#[tokio::test]
async fn test_jobs_are_processed_oldest_first() {
    let pipeline = PipelineBuilder::new()
        .channel("ch-f", "General", messages(1))
        .build()
        .await;
    let first = pipeline.store.enqueue("ch-f", "json", None).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = pipeline.store.enqueue("ch-f", "txt", None).await.unwrap();

    pipeline.processor.run_once().await.unwrap();
    assert_eq!(
        pipeline.store.get(first.id).await.unwrap().unwrap().status,
        ExportStatus::Done
    );
    assert_eq!(
        pipeline.store.get(second.id).await.unwrap().unwrap().status,
        ExportStatus::Pending
    );

    pipeline.processor.run_once().await.unwrap();
    assert!(!pipeline.processor.run_once().await.unwrap());
}
