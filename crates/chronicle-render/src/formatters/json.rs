use anyhow::{Context, Result};

use chronicle_core::models::ExportPayload;

use crate::formatter::ExportFormatter;

/// The payload itself, pretty-printed.
pub struct JsonFormatter;

impl ExportFormatter for JsonFormatter {
    fn key(&self) -> &str {
        "json"
    }

    fn extension(&self) -> &str {
        "json"
    }

    fn build(&self, payload: &ExportPayload) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(payload).context("Failed to serialize export payload")
    }
}
