//! Read-only collaborators owned by the chat service.

use anyhow::Result;
use async_trait::async_trait;

use chronicle_core::models::{ExportJob, ExportMessage};

/// Loads the messages a job exports.
///
/// Implementations must return messages ordered by creation time, oldest
/// first; chunking relies on it.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn load_messages_for_export(&self, job: &ExportJob) -> Result<Vec<ExportMessage>>;
}

/// Resolves display names for channels and direct-message conversations.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Name of a regular channel, if `channel_id` is one.
    async fn channel_name(&self, channel_id: &str) -> Result<Option<String>>;

    /// Both participants, if `channel_id` is a direct-message conversation.
    async fn direct_participants(&self, channel_id: &str) -> Result<Option<(String, String)>>;
}

/// Channel name, then `dm-<a>-<b>` for direct messages, then the raw id.
///
/// Lookup errors are logged and fall through to the next candidate.
pub async fn resolve_channel_name(directory: &dyn ChannelDirectory, channel_id: &str) -> String {
    match directory.channel_name(channel_id).await {
        Ok(Some(name)) if !name.trim().is_empty() => return name,
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, channel_id = %channel_id, "Channel lookup failed");
        }
    }

    match directory.direct_participants(channel_id).await {
        Ok(Some((first, second))) => return format!("dm-{}-{}", first, second),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, channel_id = %channel_id, "Direct conversation lookup failed");
        }
    }

    channel_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryChannelDirectory;

    #[tokio::test]
    async fn test_resolves_channel_name() {
        let directory = MemoryChannelDirectory::new().with_channel("c1", "Lobby");
        assert_eq!(resolve_channel_name(&directory, "c1").await, "Lobby");
    }

    #[tokio::test]
    async fn test_blank_channel_name_falls_through() {
        let directory = MemoryChannelDirectory::new()
            .with_channel("c1", "   ")
            .with_direct("c1", "alice", "bob");
        assert_eq!(resolve_channel_name(&directory, "c1").await, "dm-alice-bob");
    }

    #[tokio::test]
    async fn test_falls_back_to_raw_id() {
        let directory = MemoryChannelDirectory::new();
        assert_eq!(resolve_channel_name(&directory, "unknown-42").await, "unknown-42");
    }
}
