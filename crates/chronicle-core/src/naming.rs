//! File naming for export artifacts.
//!
//! Names are derived from the channel name so they read well in a download
//! dialog. They are not unique across rapid repeated exports; the on-disk path
//! for single-document exports is keyed by job id instead.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::constants::ARCHIVE_NAME_PREFIX;
use crate::models::ExportPayload;

static FILENAME_UNSAFE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^0-9A-Za-z\x{4E00}-\x{9FA5}_-]+").expect("static regex is valid")
});

/// Collapse every run of characters outside the safe set into a single `_`.
///
/// Returns an empty string for blank input so callers can fall back.
pub fn sanitize_file_name(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    FILENAME_UNSAFE.replace_all(trimmed, "_").into_owned()
}

/// `YYYYMMDD-YYYYMMDD` from whichever bounds are present, or empty.
pub fn safe_time_range_label(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> String {
    [start, end]
        .into_iter()
        .flatten()
        .map(|t| t.format("%Y%m%d").to_string())
        .collect::<Vec<_>>()
        .join("-")
}

/// Human-readable name of a single-document export: `<channel>_<range>.<ext>`.
pub fn build_export_file_name(payload: &ExportPayload, ext: &str) -> String {
    let base = [payload.channel_name.as_str(), payload.channel_id.as_str()]
        .into_iter()
        .map(sanitize_file_name)
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "channel".to_string());

    let mut range = safe_time_range_label(payload.start_time, payload.end_time);
    if range.is_empty() {
        range = payload.generated_at.format("%Y%m%d_%H%M%S").to_string();
    }
    format!("{}_{}.{}", base, range, ext)
}

/// Name of a viewer archive, at minute resolution.
pub fn build_viewer_archive_name(channel_name: &str, generated_at: DateTime<Utc>) -> String {
    let mut safe_name = sanitize_file_name(channel_name);
    if safe_name.is_empty() {
        safe_name = "channel".to_string();
    }
    format!(
        "{}-{}-{}.zip",
        ARCHIVE_NAME_PREFIX,
        safe_name,
        generated_at.format("%Y%m%d-%H%M")
    )
}
