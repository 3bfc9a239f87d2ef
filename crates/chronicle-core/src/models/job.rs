use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::config::ExportLimits;
use crate::constants::VIEWER_FORMAT;
use crate::models::ExportExtraOptions;

/// Lifecycle of an export job: `pending -> processing -> {done | failed}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Pending => "pending",
            ExportStatus::Processing => "processing",
            ExportStatus::Done => "done",
            ExportStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStatus::Done | ExportStatus::Failed)
    }

    /// Nothing leaves a terminal state and nothing re-enters `pending`.
    pub fn can_transition_to(&self, next: ExportStatus) -> bool {
        matches!(
            (self, next),
            (ExportStatus::Pending, ExportStatus::Processing)
                | (ExportStatus::Processing, ExportStatus::Done)
                | (ExportStatus::Processing, ExportStatus::Failed)
        )
    }
}

impl Display for ExportStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExportStatus::Pending),
            "processing" => Ok(ExportStatus::Processing),
            "done" => Ok(ExportStatus::Done),
            "failed" => Ok(ExportStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid export status: {}", s)),
        }
    }
}

/// A persisted request to export one channel's messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: Uuid,
    pub channel_id: String,
    /// Requested format key; rewritten to the produced format for viewer archives.
    pub format: String,
    /// Free-form options blob, see [`ExportExtraOptions`].
    pub extra_options: Option<serde_json::Value>,
    pub status: ExportStatus,
    pub error_msg: Option<String>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for ExportJob {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(ExportJob {
            id: row.try_get("id")?,
            channel_id: row.try_get("channel_id")?,
            format: row.try_get("format")?,
            extra_options: row.try_get("extra_options")?,
            status: row.try_get::<String, _>("status")?.parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse export status: {}", e).into())
            })?,
            error_msg: row.try_get("error_msg")?,
            file_path: row.try_get("file_path")?,
            file_name: row.try_get("file_name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            finished_at: row.try_get("finished_at")?,
        })
    }
}

impl ExportJob {
    /// A fresh `pending` job, as the API layer would insert it.
    pub fn new_pending(
        channel_id: impl Into<String>,
        format: impl Into<String>,
        extra_options: Option<serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            channel_id: channel_id.into(),
            format: format.into(),
            extra_options,
            status: ExportStatus::Pending,
            error_msg: None,
            file_path: None,
            file_name: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    /// Whether this job produces the multi-part viewer archive.
    pub fn is_viewer(&self) -> bool {
        self.format.trim().eq_ignore_ascii_case(VIEWER_FORMAT)
    }

    pub fn extra(&self, limits: &ExportLimits) -> ExportExtraOptions {
        ExportExtraOptions::parse(self.extra_options.as_ref(), limits)
    }

    /// File fields are set iff done, error message iff failed.
    pub fn satisfies_invariants(&self) -> bool {
        let has_file = self.file_path.is_some() && self.file_name.is_some();
        let has_error = self
            .error_msg
            .as_deref()
            .is_some_and(|m| !m.trim().is_empty());
        match self.status {
            ExportStatus::Done => has_file && !has_error && self.finished_at.is_some(),
            ExportStatus::Failed => has_error && !has_file && self.finished_at.is_some(),
            ExportStatus::Pending | ExportStatus::Processing => !has_file && !has_error,
        }
    }
}
