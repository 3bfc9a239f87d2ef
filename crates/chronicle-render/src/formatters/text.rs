use anyhow::Result;
use std::fmt::Write;

use chronicle_core::models::ExportPayload;

use crate::formatter::ExportFormatter;

/// Plain text log, one line per message: `[time] sender: content`.
pub struct TextFormatter;

impl ExportFormatter for TextFormatter {
    fn key(&self) -> &str {
        "txt"
    }

    fn extension(&self) -> &str {
        "txt"
    }

    fn build(&self, payload: &ExportPayload) -> Result<Vec<u8>> {
        let mut out = String::new();
        let _ = writeln!(out, "# {}", payload.title());
        let _ = writeln!(
            out,
            "# generated {} · {} messages",
            payload.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            payload.messages.len()
        );
        out.push('\n');

        for message in &payload.messages {
            let _ = writeln!(
                out,
                "[{}] {}: {}",
                message.created_at.format("%Y-%m-%d %H:%M:%S"),
                message.sender_name,
                message.content.replace('\n', "\n    ")
            );
        }
        Ok(out.into_bytes())
    }
}
