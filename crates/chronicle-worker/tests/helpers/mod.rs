#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use chronicle_core::models::ExportMessage;
use chronicle_db::{MemoryChannelDirectory, MemoryJobStore, MemoryMessageSource};
use chronicle_render::{FormatterRegistry, PartRenderer, ViewerAssets};
use chronicle_worker::{ExportContext, ExportProcessor, WorkerConfig};

pub struct TestPipeline {
    pub store: MemoryJobStore,
    pub storage: TempDir,
    pub processor: ExportProcessor,
}

impl TestPipeline {
    pub fn storage_dir(&self) -> &Path {
        self.storage.path()
    }

    /// Directory the processor writes exports into.
    pub fn exports_dir(&self) -> PathBuf {
        self.storage.path().join("exports")
    }

    /// Every file currently in the exports directory.
    pub fn stored_files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.exports_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub struct PipelineBuilder {
    messages: MemoryMessageSource,
    channels: MemoryChannelDirectory,
    renderer: Option<Arc<dyn PartRenderer>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            messages: MemoryMessageSource::new(),
            channels: MemoryChannelDirectory::new(),
            renderer: None,
        }
    }

    pub fn channel(mut self, channel_id: &str, name: &str, messages: Vec<ExportMessage>) -> Self {
        self.channels = self.channels.with_channel(channel_id, name);
        self.messages = self.messages.with_messages(channel_id, messages);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PartRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub async fn build(self) -> TestPipeline {
        let store = MemoryJobStore::new();
        let storage = tempfile::tempdir().expect("create temp storage dir");
        let formatters = FormatterRegistry::with_defaults(Arc::new(ViewerAssets::default())).await;

        let mut context = ExportContext::new(
            Arc::new(store.clone()),
            Arc::new(self.messages),
            Arc::new(self.channels),
            formatters,
        );
        if let Some(renderer) = self.renderer {
            context = context.with_part_renderer(renderer);
        }

        let processor = ExportProcessor::new(
            Arc::new(context),
            WorkerConfig {
                storage_dir: storage.path().join("exports"),
                stale_job_reap_interval_secs: 0,
                ..WorkerConfig::default()
            },
        );

        TestPipeline {
            store,
            storage,
            processor,
        }
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 10, 8, 30, 0).unwrap()
}

/// `n` messages one minute apart.
pub fn messages(n: usize) -> Vec<ExportMessage> {
    (0..n)
        .map(|i| {
            ExportMessage::new(
                format!("msg-{}", i),
                if i % 2 == 0 { "alice" } else { "bob" },
                format!("message number {}", i),
                base_time() + Duration::minutes(i as i64),
            )
        })
        .collect()
}

pub fn read_entry(archive: &mut zip::ZipArchive<std::fs::File>, name: &str) -> Vec<u8> {
    let mut entry = archive.by_name(name).expect("archive entry exists");
    let mut content = Vec::new();
    entry.read_to_end(&mut content).expect("read archive entry");
    content
}

pub fn entry_names(archive: &mut zip::ZipArchive<std::fs::File>) -> Vec<String> {
    (0..archive.len())
        .map(|i| archive.by_index(i).expect("archive entry").name().to_string())
        .collect()
}
