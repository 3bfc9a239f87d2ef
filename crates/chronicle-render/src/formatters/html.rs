use anyhow::Result;
use std::sync::Arc;

use chronicle_core::models::ExportPayload;

use crate::assets::ViewerAssets;
use crate::formatter::ExportFormatter;
use crate::html::render_single_page;

/// Self-contained single HTML page, registered as `html-page`.
///
/// Jobs requesting `html` are routed to the multi-part viewer archive; this
/// formatter serves callers that want the whole channel as one page.
pub struct HtmlFormatter {
    assets: Arc<ViewerAssets>,
}

impl HtmlFormatter {
    pub fn new(assets: Arc<ViewerAssets>) -> Self {
        Self { assets }
    }
}

impl ExportFormatter for HtmlFormatter {
    fn key(&self) -> &str {
        "html-page"
    }

    fn extension(&self) -> &str {
        "html"
    }

    fn build(&self, payload: &ExportPayload) -> Result<Vec<u8>> {
        render_single_page(payload, &self.assets)
    }
}
