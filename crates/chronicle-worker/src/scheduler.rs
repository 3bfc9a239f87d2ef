//! Export scheduler: a single polling loop per process.
//!
//! Each tick claims at most one job and processes it to a terminal state
//! before the next claim, so a scheduler never has more than one job in
//! flight. Parallelism inside a job is bounded by the job's concurrency.
//!
//! The reaper judges jobs by `updated_at` only, so a job still rendering
//! past the timeout is failed too; its output is then discarded by the
//! processor instead of being recorded.
//!
//! Shutdown: [`ExportScheduler::shutdown`] stops the loop after the job in
//! flight, if any, has been recorded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use chronicle_db::JobStore;

use crate::config::WorkerConfig;
use crate::context::ExportContext;
use crate::processor::ExportProcessor;

/// Failure reason recorded on jobs failed by the stale job reaper.
pub fn stale_job_message(timeout_secs: i64) -> String {
    format!(
        "Export timed out: still processing after {} seconds",
        timeout_secs
    )
}

struct RunningLoop {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct ExportScheduler {
    context: Arc<ExportContext>,
    started: AtomicBool,
    running: Mutex<Option<RunningLoop>>,
}

impl ExportScheduler {
    pub fn new(context: Arc<ExportContext>) -> Self {
        Self {
            context,
            started: AtomicBool::new(false),
            running: Mutex::new(None),
        }
    }

    /// Start the polling loop. Must be called inside a Tokio runtime.
    ///
    /// Only the first call has an effect; it returns `true`. Every later call,
    /// including one after [`shutdown`](Self::shutdown), returns `false`.
    pub fn start(&self, config: WorkerConfig) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Export scheduler already started");
            return false;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let processor = ExportProcessor::new(Arc::clone(&self.context), config);
        let handle = tokio::spawn(Self::run(processor, shutdown_rx));

        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        *running = Some(RunningLoop {
            shutdown_tx,
            handle,
        });
        true
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Signal the loop to stop and wait for it to exit.
    pub async fn shutdown(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(running) = running else {
            return;
        };

        tracing::info!("Initiating export scheduler shutdown");
        let _ = running.shutdown_tx.send(()).await;
        if let Err(e) = running.handle.await {
            tracing::error!(error = %e, "Export scheduler loop ended abnormally");
        }
    }

    async fn run(processor: ExportProcessor, mut shutdown_rx: mpsc::Receiver<()>) {
        let config = processor.config().clone();
        tracing::info!(
            poll_interval_ms = config.poll_interval_ms,
            storage_dir = %config.storage_dir.display(),
            stale_job_reap_interval_secs = config.stale_job_reap_interval_secs,
            "Export scheduler started"
        );

        if let Err(e) = tokio::fs::create_dir_all(&config.storage_dir).await {
            tracing::error!(error = %e, "Failed to create export storage directory");
        }

        let (reaper_shutdown_tx, reaper_shutdown_rx) = mpsc::channel::<()>(1);
        let reaper = (config.stale_job_reap_interval_secs > 0).then(|| {
            tokio::spawn(Self::reap_stale_jobs(
                Arc::clone(&processor.context().store),
                config.clone(),
                reaper_shutdown_rx,
            ))
        });

        let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Export scheduler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = processor.run_once().await {
                        tracing::error!(error = %e, "Failed to claim export job");
                    }
                }
            }
        }

        let _ = reaper_shutdown_tx.send(()).await;
        if let Some(reaper) = reaper {
            let _ = reaper.await;
        }
        tracing::info!("Export scheduler stopped");
    }

    /// Fails jobs left in `processing` past the configured timeout.
    async fn reap_stale_jobs(
        store: Arc<dyn JobStore>,
        config: WorkerConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let timeout = chrono::Duration::seconds(config.stale_job_timeout_secs);
        let error_msg = stale_job_message(config.stale_job_timeout_secs);
        let mut interval =
            tokio::time::interval(Duration::from_secs(config.stale_job_reap_interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = store.reap_stale_processing(timeout, &error_msg).await {
                        tracing::error!(error = %e, "Stale export job reaper failed");
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::models::ExportStatus;
    use chronicle_db::{MemoryChannelDirectory, MemoryJobStore, MemoryMessageSource};
    use chronicle_render::{FormatterRegistry, ViewerAssets};

    async fn scheduler(store: MemoryJobStore) -> ExportScheduler {
        let formatters = FormatterRegistry::with_defaults(Arc::new(ViewerAssets::default())).await;
        ExportScheduler::new(Arc::new(ExportContext::new(
            Arc::new(store),
            Arc::new(MemoryMessageSource::new()),
            Arc::new(MemoryChannelDirectory::new()),
            formatters,
        )))
    }

    fn fast_config(storage_dir: &std::path::Path) -> WorkerConfig {
        WorkerConfig {
            storage_dir: storage_dir.to_path_buf(),
            poll_interval_ms: 10,
            stale_job_reap_interval_secs: 0,
            ..WorkerConfig::default()
        }
    }

    async fn wait_for_status(store: &MemoryJobStore, id: uuid::Uuid, status: ExportStatus) {
        for _ in 0..200 {
            if store.get(id).await.unwrap().is_some_and(|j| j.status == status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached {}", id, status);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler(MemoryJobStore::new()).await;

        assert!(!scheduler.is_started());
        assert!(scheduler.start(fast_config(dir.path())));
        assert!(!scheduler.start(fast_config(dir.path())));
        assert!(scheduler.is_started());

        scheduler.shutdown().await;
        assert!(!scheduler.start(fast_config(dir.path())));
    }

    #[tokio::test]
    async fn test_processes_jobs_in_submission_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryJobStore::new();
        let first = store.enqueue("c1", "txt", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store.enqueue("c2", "docx-unknown", None).await.unwrap();

        let scheduler = scheduler(store.clone()).await;
        scheduler.start(fast_config(dir.path()));

        wait_for_status(&store, first.id, ExportStatus::Done).await;
        wait_for_status(&store, second.id, ExportStatus::Failed).await;
        scheduler.shutdown().await;

        let first = store.get(first.id).await.unwrap().unwrap();
        let second = store.get(second.id).await.unwrap().unwrap();
        assert!(first.finished_at <= second.finished_at);
        assert!(second.error_msg.unwrap().contains("docx-unknown"));
    }

    #[tokio::test]
    async fn test_shutdown_without_start_is_noop() {
        let scheduler = scheduler(MemoryJobStore::new()).await;
        scheduler.shutdown().await;
        assert!(!scheduler.is_started());
    }

    #[tokio::test]
    async fn test_reaper_fails_stale_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryJobStore::new();
        let mut stuck = chronicle_core::ExportJob::new_pending("c1", "txt", None);
        stuck.status = ExportStatus::Processing;
        stuck.updated_at = chrono::Utc::now() - chrono::Duration::hours(2);
        store.insert(stuck.clone()).await;

        let scheduler = scheduler(store.clone()).await;
        scheduler.start(WorkerConfig {
            stale_job_reap_interval_secs: 1,
            stale_job_timeout_secs: 60,
            ..fast_config(dir.path())
        });

        wait_for_status(&store, stuck.id, ExportStatus::Failed).await;
        scheduler.shutdown().await;

        let reaped = store.get(stuck.id).await.unwrap().unwrap();
        assert!(reaped.error_msg.unwrap().contains("timed out"));
    }
}
