//! In-memory collaborators for tests and local tooling.
//!
//! [`MemoryJobStore`] keeps the same two-step claim as the PostgreSQL store:
//! read the oldest pending job, then conditionally update it. The lock is
//! released between the two steps so concurrent claimers can race on the
//! same candidate exactly like separate database sessions would.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use chronicle_core::models::{ExportJob, ExportMessage, ExportStatus};

use crate::source::{ChannelDirectory, MessageSource};
use crate::store::{effective_override, non_empty_error, JobStore};

#[derive(Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<HashMap<Uuid, ExportJob>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job as-is (any status, any timestamps).
    pub async fn insert(&self, job: ExportJob) {
        self.jobs.lock().await.insert(job.id, job);
    }

    pub async fn snapshot(&self) -> Vec<ExportJob> {
        let mut jobs: Vec<ExportJob> = self.jobs.lock().await.values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    async fn finish(
        &self,
        job_id: Uuid,
        apply: impl FnOnce(&mut ExportJob),
        next: ExportStatus,
    ) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| anyhow!("Export job {} not found", job_id))?;
        if !job.status.can_transition_to(next) {
            return Err(anyhow!(
                "Export job {} is {}, cannot transition to {}",
                job_id,
                job.status,
                next
            ));
        }
        apply(job);
        let now = Utc::now();
        job.status = next;
        job.updated_at = now;
        job.finished_at = Some(now);
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn acquire_next_pending(&self) -> Result<Option<ExportJob>> {
        let candidate = {
            let jobs = self.jobs.lock().await;
            jobs.values()
                .filter(|j| j.status == ExportStatus::Pending)
                .min_by_key(|j| (j.created_at, j.id))
                .map(|j| j.id)
        };
        let Some(candidate) = candidate else {
            return Ok(None);
        };

        // Another claimer may run between the read and the conditional update.
        tokio::task::yield_now().await;

        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(&candidate) {
            Some(job) if job.status == ExportStatus::Pending => {
                job.status = ExportStatus::Processing;
                job.updated_at = Utc::now();
                Ok(Some(job.clone()))
            }
            _ => {
                tracing::debug!(job_id = %candidate, "Export job claim lost to another poller");
                Ok(None)
            }
        }
    }

    async fn mark_done(
        &self,
        job_id: Uuid,
        file_path: &str,
        file_name: &str,
        format_override: Option<&str>,
    ) -> Result<()> {
        let format = effective_override(format_override).map(str::to_string);
        self.finish(
            job_id,
            |job| {
                job.file_path = Some(file_path.to_string());
                job.file_name = Some(file_name.to_string());
                job.error_msg = None;
                if let Some(format) = format {
                    job.format = format;
                }
            },
            ExportStatus::Done,
        )
        .await
    }

    async fn mark_failed(&self, job_id: Uuid, error_msg: &str) -> Result<()> {
        let message = non_empty_error(error_msg).to_string();
        self.finish(
            job_id,
            |job| {
                job.error_msg = Some(message);
                job.file_path = None;
                job.file_name = None;
            },
            ExportStatus::Failed,
        )
        .await
    }

    async fn reap_stale_processing(&self, older_than: Duration, error_msg: &str) -> Result<u64> {
        let cutoff = Utc::now() - older_than;
        let message = non_empty_error(error_msg);
        let mut jobs = self.jobs.lock().await;
        let mut reaped = 0;
        for job in jobs.values_mut() {
            if job.status == ExportStatus::Processing && job.updated_at < cutoff {
                let now = Utc::now();
                job.status = ExportStatus::Failed;
                job.error_msg = Some(message.to_string());
                job.updated_at = now;
                job.finished_at = Some(now);
                reaped += 1;
            }
        }
        Ok(reaped)
    }

    async fn enqueue(
        &self,
        channel_id: &str,
        format: &str,
        extra_options: Option<serde_json::Value>,
    ) -> Result<ExportJob> {
        let job = ExportJob::new_pending(channel_id, format, extra_options);
        self.jobs.lock().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<ExportJob>> {
        Ok(self.jobs.lock().await.get(&job_id).cloned())
    }
}

/// Messages keyed by channel id.
#[derive(Clone, Default)]
pub struct MemoryMessageSource {
    messages: HashMap<String, Vec<ExportMessage>>,
    failures: HashMap<String, String>,
}

impl MemoryMessageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(mut self, channel_id: &str, messages: Vec<ExportMessage>) -> Self {
        self.messages.insert(channel_id.to_string(), messages);
        self
    }

    /// Make every load for `channel_id` fail with `message`.
    pub fn with_failure(mut self, channel_id: &str, message: &str) -> Self {
        self.failures.insert(channel_id.to_string(), message.to_string());
        self
    }
}

#[async_trait]
impl MessageSource for MemoryMessageSource {
    async fn load_messages_for_export(&self, job: &ExportJob) -> Result<Vec<ExportMessage>> {
        if let Some(message) = self.failures.get(&job.channel_id) {
            return Err(anyhow!(message.clone()));
        }
        let mut messages = self
            .messages
            .get(&job.channel_id)
            .cloned()
            .unwrap_or_default();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}

#[derive(Clone, Default)]
pub struct MemoryChannelDirectory {
    channels: HashMap<String, String>,
    direct: HashMap<String, (String, String)>,
}

impl MemoryChannelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel_id: &str, name: &str) -> Self {
        self.channels.insert(channel_id.to_string(), name.to_string());
        self
    }

    pub fn with_direct(mut self, channel_id: &str, first: &str, second: &str) -> Self {
        self.direct.insert(
            channel_id.to_string(),
            (first.to_string(), second.to_string()),
        );
        self
    }
}

#[async_trait]
impl ChannelDirectory for MemoryChannelDirectory {
    async fn channel_name(&self, channel_id: &str) -> Result<Option<String>> {
        Ok(self.channels.get(channel_id).cloned())
    }

    async fn direct_participants(&self, channel_id: &str) -> Result<Option<(String, String)>> {
        Ok(self.direct.get(channel_id).cloned())
    }
}
