use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message as handed to the export pipeline.
///
/// `content` is already converted from rich text by the message source; it
/// may still contain `<img src="id:...">` attachment references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMessage {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ExportMessage {
    pub fn new(
        id: impl Into<String>,
        sender_name: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let sender_name = sender_name.into();
        Self {
            id: id.into(),
            sender_id: sender_name.clone(),
            sender_name,
            content: content.into(),
            created_at,
        }
    }
}

/// Creation time of the first and last message, or `(None, None)` when empty.
pub fn slice_bounds(
    messages: &[ExportMessage],
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match (messages.first(), messages.last()) {
        (Some(first), Some(last)) => (Some(first.created_at), Some(last.created_at)),
        _ => (None, None),
    }
}
