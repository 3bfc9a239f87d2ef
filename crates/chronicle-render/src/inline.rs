//! Inline image embedding
//!
//! Rewrites `src="id:<attachment>"` references in message content into
//! `data:` URIs so exported documents are self-contained. Only the transient
//! payload is rewritten; persisted messages are never touched. Running the
//! pass twice is a no-op because `data:` URIs never match the `id:` pattern.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use lru::LruCache;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;

use chronicle_core::models::ExportPayload;

static ATTACHMENT_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src="id:([A-Za-z0-9_.-]+)""#).expect("static regex is valid")
});

const DEFAULT_CACHE_ENTRIES: usize = 256;
const DEFAULT_MAX_INLINE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime: String,
    pub data: Vec<u8>,
}

/// Where attachment bytes come from.
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    /// `Ok(None)` when the attachment does not exist.
    async fn load(&self, attachment_id: &str) -> Result<Option<Attachment>>;
}

/// Attachments stored as `<root>/<attachment id>` on the local filesystem.
#[derive(Clone)]
pub struct LocalAttachmentSource {
    root: PathBuf,
}

impl LocalAttachmentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, attachment_id: &str) -> Option<PathBuf> {
        let name = Path::new(attachment_id).file_name()?.to_str()?;
        if name != attachment_id || name.starts_with('.') {
            return None;
        }
        Some(self.root.join(name))
    }
}

#[async_trait]
impl AttachmentSource for LocalAttachmentSource {
    async fn load(&self, attachment_id: &str) -> Result<Option<Attachment>> {
        let Some(path) = self.path_for(attachment_id) else {
            return Ok(None);
        };
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Attachment {
                mime: sniff_image_mime(&data).to_string(),
                data,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read attachment {}", path.display()))
            }
        }
    }
}

/// Best-effort image type from magic bytes.
pub fn sniff_image_mime(data: &[u8]) -> &'static str {
    match data {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Shared by every part render of a job; caches resolved data URIs.
pub struct InlineImageEmbedder {
    source: Arc<dyn AttachmentSource>,
    cache: Mutex<LruCache<String, Option<Arc<str>>>>,
    max_inline_bytes: usize,
}

impl InlineImageEmbedder {
    pub fn new(source: Arc<dyn AttachmentSource>) -> Self {
        Self::with_limits(source, DEFAULT_CACHE_ENTRIES, DEFAULT_MAX_INLINE_BYTES)
    }

    pub fn with_limits(
        source: Arc<dyn AttachmentSource>,
        cache_entries: usize,
        max_inline_bytes: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            cache: Mutex::new(LruCache::new(capacity)),
            max_inline_bytes,
        }
    }

    /// Rewrite attachment references in `payload`. Returns how many were embedded.
    ///
    /// Unknown, unreadable or oversized attachments keep their original reference.
    pub async fn inline_payload(&self, payload: &mut ExportPayload) -> usize {
        let mut resolved: HashMap<String, Option<Arc<str>>> = HashMap::new();
        for message in &payload.messages {
            for caps in ATTACHMENT_REF.captures_iter(&message.content) {
                let id = &caps[1];
                if !resolved.contains_key(id) {
                    let uri = self.data_uri(id).await;
                    resolved.insert(id.to_string(), uri);
                }
            }
        }
        if resolved.is_empty() {
            return 0;
        }

        let mut embedded = 0;
        for message in &mut payload.messages {
            let rewritten = ATTACHMENT_REF.replace_all(&message.content, |caps: &Captures| {
                match resolved.get(&caps[1]).and_then(Option::as_ref) {
                    Some(uri) => {
                        embedded += 1;
                        format!(r#"src="{}""#, uri)
                    }
                    None => caps[0].to_string(),
                }
            });
            if let std::borrow::Cow::Owned(content) = rewritten {
                message.content = content;
            }
        }
        embedded
    }

    async fn data_uri(&self, attachment_id: &str) -> Option<Arc<str>> {
        if let Some(hit) = self.cache.lock().await.get(attachment_id) {
            return hit.clone();
        }

        let uri = match self.source.load(attachment_id).await {
            Ok(Some(attachment)) if attachment.data.len() <= self.max_inline_bytes => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&attachment.data);
                Some(Arc::from(format!("data:{};base64,{}", attachment.mime, encoded)))
            }
            Ok(Some(attachment)) => {
                tracing::debug!(
                    attachment_id = %attachment_id,
                    size = attachment.data.len(),
                    "Attachment too large to inline"
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, attachment_id = %attachment_id, "Failed to load attachment for inlining");
                None
            }
        };

        self.cache
            .lock()
            .await
            .put(attachment_id.to_string(), uri.clone());
        uri
    }
}
