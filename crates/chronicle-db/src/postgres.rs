use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

use chronicle_core::models::{ExportJob, ExportMessage, ExportStatus};

use crate::source::{ChannelDirectory, MessageSource};
use crate::store::{effective_override, non_empty_error, JobStore};

const JOB_COLUMNS: &str = r#"
    id,
    channel_id,
    format,
    extra_options,
    status,
    error_msg,
    file_path,
    file_name,
    created_at,
    updated_at,
    finished_at
"#;

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    /// Atomically claim the oldest pending export job.
    ///
    /// The claim is a conditional update (`WHERE id = $1 AND status = 'pending'`),
    /// so any number of pollers across processes may race on the same row and
    /// at most one of them sees a returned row. Zero rows means the claim was
    /// lost, which is reported as "no job".
    #[tracing::instrument(skip(self))]
    async fn acquire_next_pending(&self) -> Result<Option<ExportJob>> {
        let candidate: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM export_jobs
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch next pending export job")?;

        let Some(candidate) = candidate else {
            return Ok(None);
        };

        let claimed: Option<ExportJob> = sqlx::query_as::<Postgres, ExportJob>(&format!(
            r#"
            UPDATE export_jobs
            SET status = 'processing',
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(candidate)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to claim export job")?;

        match &claimed {
            Some(job) => tracing::debug!(
                job_id = %job.id,
                channel_id = %job.channel_id,
                format = %job.format,
                "Export job claimed"
            ),
            None => tracing::debug!(job_id = %candidate, "Export job claim lost to another poller"),
        }

        Ok(claimed)
    }

    #[tracing::instrument(skip(self))]
    async fn mark_done(
        &self,
        job_id: Uuid,
        file_path: &str,
        file_name: &str,
        format_override: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE export_jobs
            SET status = 'done',
                file_path = $2,
                file_name = $3,
                error_msg = NULL,
                format = COALESCE($4, format),
                finished_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(job_id)
        .bind(file_path)
        .bind(file_name)
        .bind(effective_override(format_override))
        .execute(&self.pool)
        .await
        .context("Failed to mark export job as done")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Export job {} is not processing, cannot mark done", job_id);
        }

        tracing::info!(job_id = %job_id, file_name = %file_name, "Export job done");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn mark_failed(&self, job_id: Uuid, error_msg: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE export_jobs
            SET status = 'failed',
                error_msg = $2,
                file_path = NULL,
                file_name = NULL,
                finished_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(job_id)
        .bind(non_empty_error(error_msg))
        .execute(&self.pool)
        .await
        .context("Failed to mark export job as failed")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Export job {} is not processing, cannot mark failed", job_id);
        }

        tracing::info!(job_id = %job_id, error = %error_msg, "Export job failed");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn reap_stale_processing(&self, older_than: Duration, error_msg: &str) -> Result<u64> {
        let cutoff = Utc::now() - older_than;
        let result = sqlx::query(
            r#"
            UPDATE export_jobs
            SET status = 'failed',
                error_msg = $2,
                finished_at = NOW(),
                updated_at = NOW()
            WHERE status = 'processing' AND updated_at < $1
            "#,
        )
        .bind(cutoff)
        .bind(non_empty_error(error_msg))
        .execute(&self.pool)
        .await
        .context("Failed to reap stale export jobs")?;

        let reaped = result.rows_affected();
        if reaped > 0 {
            tracing::warn!(count = reaped, cutoff = %cutoff, "Reaped stale export jobs");
        }
        Ok(reaped)
    }

    #[tracing::instrument(skip(self, extra_options))]
    async fn enqueue(
        &self,
        channel_id: &str,
        format: &str,
        extra_options: Option<serde_json::Value>,
    ) -> Result<ExportJob> {
        let job = sqlx::query_as::<Postgres, ExportJob>(&format!(
            r#"
            INSERT INTO export_jobs (id, channel_id, format, extra_options, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(channel_id)
        .bind(format)
        .bind(extra_options)
        .bind(ExportStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert export job")?;

        tracing::info!(job_id = %job.id, channel_id = %channel_id, format = %format, "Export job enqueued");
        Ok(job)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, job_id: Uuid) -> Result<Option<ExportJob>> {
        sqlx::query_as::<Postgres, ExportJob>(&format!(
            "SELECT {JOB_COLUMNS} FROM export_jobs WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch export job")
    }
}

/// Reads messages from the chat service's `messages` table.
#[derive(Clone)]
pub struct PgMessageSource {
    pool: PgPool,
}

impl PgMessageSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageSource for PgMessageSource {
    #[tracing::instrument(skip(self, job), fields(job.id = %job.id, channel_id = %job.channel_id))]
    async fn load_messages_for_export(&self, job: &ExportJob) -> Result<Vec<ExportMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.user_id, COALESCE(NULLIF(m.sender_name, ''), m.user_id) AS sender_name,
                   m.content, m.created_at
            FROM messages m
            WHERE m.channel_id = $1 AND m.is_deleted = FALSE
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(&job.channel_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load messages for export")?;

        let messages = rows
            .into_iter()
            .map(|row| {
                Ok(ExportMessage {
                    id: row.try_get("id")?,
                    sender_id: row.try_get("user_id")?,
                    sender_name: row.try_get("sender_name")?,
                    content: row.try_get("content")?,
                    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .context("Failed to decode message row")?;

        tracing::debug!(count = messages.len(), "Messages loaded for export");
        Ok(messages)
    }
}

#[derive(Clone)]
pub struct PgChannelDirectory {
    pool: PgPool,
}

impl PgChannelDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelDirectory for PgChannelDirectory {
    async fn channel_name(&self, channel_id: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT name FROM channels WHERE id = $1")
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch channel")
    }

    async fn direct_participants(&self, channel_id: &str) -> Result<Option<(String, String)>> {
        let row = sqlx::query("SELECT user_id1, user_id2 FROM friend_relations WHERE id = $1")
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch direct conversation")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let first: String = row.try_get("user_id1")?;
        let second: String = row.try_get("user_id2")?;
        Ok(Some((first, second)))
    }
}
