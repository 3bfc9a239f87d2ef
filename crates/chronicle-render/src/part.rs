use anyhow::Result;
use async_trait::async_trait;

use chronicle_core::models::ExportPayload;

use crate::assets::ViewerAssets;
use crate::html::render_html_part;

/// Renders one slice of a multi-part viewer export.
///
/// Called concurrently for different parts of the same job, so
/// implementations must not keep per-part mutable state.
#[async_trait]
pub trait PartRenderer: Send + Sync {
    async fn render(&self, payload: &ExportPayload, assets: &ViewerAssets) -> Result<Vec<u8>>;
}

/// Default renderer producing `parts/part-NNN.html` pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPartRenderer;

#[async_trait]
impl PartRenderer for HtmlPartRenderer {
    async fn render(&self, payload: &ExportPayload, assets: &ViewerAssets) -> Result<Vec<u8>> {
        render_html_part(payload, assets)
    }
}
