use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::message::slice_bounds;
use crate::models::{ExportJob, ExportMessage};

/// Position of a part inside a multi-part export (1-based index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartInfo {
    pub index: usize,
    pub total: usize,
}

/// Per-part settings the viewer pipeline passes when building a payload.
#[derive(Debug, Clone)]
pub struct PayloadContext {
    pub display_options: Map<String, Value>,
    pub part: PartInfo,
    pub slice_start: Option<DateTime<Utc>>,
    pub slice_end: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
}

/// Everything a formatter needs to render one document.
///
/// Owned by a single render invocation. The message list is a snapshot; only
/// the inline-image pass rewrites it, and only on this transient copy.
#[derive(Debug, Clone, Serialize)]
pub struct ExportPayload {
    pub channel_id: String,
    pub channel_name: String,
    pub messages: Vec<ExportMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<PartInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub display_options: Map<String, Value>,
}

impl ExportPayload {
    pub fn build(
        job: &ExportJob,
        channel_name: &str,
        messages: Vec<ExportMessage>,
        context: Option<PayloadContext>,
    ) -> Self {
        match context {
            Some(ctx) => Self {
                channel_id: job.channel_id.clone(),
                channel_name: channel_name.to_string(),
                messages,
                part: Some(ctx.part),
                start_time: ctx.slice_start,
                end_time: ctx.slice_end,
                generated_at: ctx.generated_at,
                display_options: ctx.display_options,
            },
            None => {
                let (start_time, end_time) = slice_bounds(&messages);
                Self {
                    channel_id: job.channel_id.clone(),
                    channel_name: channel_name.to_string(),
                    messages,
                    part: None,
                    start_time,
                    end_time,
                    generated_at: Utc::now(),
                    display_options: Map::new(),
                }
            }
        }
    }

    /// Display name, falling back to the channel id.
    pub fn title(&self) -> &str {
        if self.channel_name.trim().is_empty() {
            &self.channel_id
        } else {
            &self.channel_name
        }
    }
}
