//! Rendering one viewer part and recording its manifest entry.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use chronicle_core::models::{
    slice_bounds, ExportJob, ExportMessage, ExportPayload, PartInfo, PayloadContext,
    ViewerManifestPart,
};
use chronicle_core::ExportError;
use chronicle_render::{InlineImageEmbedder, PartRenderer, ViewerAssets};

use crate::executor::BoundedExecutor;

/// A rendered part ready to be written into the archive.
#[derive(Debug, Clone)]
pub struct PartRenderResult {
    pub file_name: String,
    pub content: Vec<u8>,
    pub meta: ViewerManifestPart,
}

/// Archive entry name for the 1-based `part_index`.
pub fn part_file_name(part_index: usize) -> String {
    format!("parts/part-{:03}.html", part_index)
}

pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Read-only state shared by every part render of one job.
pub struct PartRenderContext {
    pub job: ExportJob,
    pub channel_name: String,
    pub display_options: Map<String, Value>,
    pub part_total: usize,
    pub generated_at: DateTime<Utc>,
    pub assets: Arc<ViewerAssets>,
    pub renderer: Arc<dyn PartRenderer>,
    pub embedder: Option<Arc<InlineImageEmbedder>>,
}

impl PartRenderContext {
    /// Render the chunk at 0-based `index`.
    pub async fn render(
        &self,
        index: usize,
        messages: Vec<ExportMessage>,
    ) -> Result<PartRenderResult, ExportError> {
        let part_index = index + 1;
        let file_name = part_file_name(part_index);
        let (slice_start, slice_end) = slice_bounds(&messages);
        let message_count = messages.len();

        let mut payload = ExportPayload::build(
            &self.job,
            &self.channel_name,
            messages,
            Some(PayloadContext {
                display_options: self.display_options.clone(),
                part: PartInfo {
                    index: part_index,
                    total: self.part_total,
                },
                slice_start,
                slice_end,
                generated_at: self.generated_at,
            }),
        );

        if let Some(embedder) = &self.embedder {
            embedder.inline_payload(&mut payload).await;
        }

        let content = self
            .renderer
            .render(&payload, &self.assets)
            .await
            .map_err(|e| ExportError::Render {
                part: part_index,
                message: format!("{:#}", e),
            })?;

        tracing::debug!(
            job_id = %self.job.id,
            part_index,
            part_total = self.part_total,
            messages = message_count,
            bytes = content.len(),
            "Viewer part rendered"
        );

        Ok(PartRenderResult {
            meta: ViewerManifestPart {
                file: file_name.clone(),
                part_index,
                part_total: self.part_total,
                messages: message_count,
                slice_start,
                slice_end,
                sha256: sha256_hex(&content),
            },
            file_name,
            content,
        })
    }
}

/// Render every chunk through `executor`, results in chunk order.
pub async fn render_parts(
    context: Arc<PartRenderContext>,
    chunks: Vec<Vec<ExportMessage>>,
    executor: BoundedExecutor,
) -> Result<Vec<PartRenderResult>, ExportError> {
    executor
        .run(chunks, move |index, messages| {
            let context = Arc::clone(&context);
            async move { context.render(index, messages).await }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use chronicle_render::HtmlPartRenderer;
    use std::time::Duration;

    struct SlowFirstRenderer;

    #[async_trait]
    impl PartRenderer for SlowFirstRenderer {
        async fn render(&self, payload: &ExportPayload, _assets: &ViewerAssets) -> Result<Vec<u8>> {
            let part = payload.part.map(|p| p.index).unwrap_or_default();
            // Earlier parts finish later.
            tokio::time::sleep(Duration::from_millis((5 - part as u64) * 10)).await;
            Ok(format!("part {}", part).into_bytes())
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl PartRenderer for FailingRenderer {
        async fn render(&self, _payload: &ExportPayload, _assets: &ViewerAssets) -> Result<Vec<u8>> {
            anyhow::bail!("template missing")
        }
    }

    fn context(renderer: Arc<dyn PartRenderer>, part_total: usize) -> Arc<PartRenderContext> {
        Arc::new(PartRenderContext {
            job: ExportJob::new_pending("ch-1", "html", None),
            channel_name: "Lobby".to_string(),
            display_options: Map::new(),
            part_total,
            generated_at: Utc::now(),
            assets: Arc::new(ViewerAssets::default()),
            renderer,
            embedder: None,
        })
    }

    fn chunk(ids: &[u32]) -> Vec<ExportMessage> {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        ids.iter()
            .map(|i| {
                ExportMessage::new(
                    i.to_string(),
                    "bob",
                    "hi",
                    base + chrono::Duration::minutes(*i as i64),
                )
            })
            .collect()
    }

    #[test]
    fn test_part_file_name_is_zero_padded() {
        assert_eq!(part_file_name(1), "parts/part-001.html");
        assert_eq!(part_file_name(42), "parts/part-042.html");
        assert_eq!(part_file_name(1000), "parts/part-1000.html");
    }

    #[tokio::test]
    async fn test_render_records_bounds_and_hash() {
        let ctx = context(Arc::new(HtmlPartRenderer), 1);
        let result = ctx.render(0, chunk(&[1, 2, 3])).await.unwrap();

        assert_eq!(result.file_name, "parts/part-001.html");
        assert_eq!(result.meta.messages, 3);
        assert_eq!(result.meta.part_index, 1);
        assert_eq!(result.meta.sha256, sha256_hex(&result.content));
        assert_eq!(result.meta.sha256.len(), 64);
        assert!(result.meta.slice_start < result.meta.slice_end);
    }

    #[tokio::test]
    async fn test_empty_chunk_has_no_bounds() {
        let ctx = context(Arc::new(HtmlPartRenderer), 1);
        let result = ctx.render(0, Vec::new()).await.unwrap();
        assert_eq!(result.meta.messages, 0);
        assert!(result.meta.slice_start.is_none());
        assert!(result.meta.slice_end.is_none());
    }

    #[tokio::test]
    async fn test_parts_are_ordered_by_index_not_completion() {
        let chunks = vec![chunk(&[1]), chunk(&[2]), chunk(&[3]), chunk(&[4])];
        let results = render_parts(
            context(Arc::new(SlowFirstRenderer), 4),
            chunks,
            BoundedExecutor::new(4),
        )
        .await
        .unwrap();

        let indexes: Vec<usize> = results.iter().map(|r| r.meta.part_index).collect();
        assert_eq!(indexes, vec![1, 2, 3, 4]);
        assert_eq!(results[2].content, b"part 3");
    }

    #[tokio::test]
    async fn test_renderer_error_names_the_part() {
        let err = render_parts(
            context(Arc::new(FailingRenderer), 1),
            vec![chunk(&[1])],
            BoundedExecutor::new(1),
        )
        .await
        .unwrap_err();

        match err {
            ExportError::Render { part, message } => {
                assert_eq!(part, 1);
                assert!(message.contains("template missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
