use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ExportLimits;

/// Parsed view of a job's extra-options blob.
///
/// `slice_limit` is already clamped into the configured bounds and
/// `max_concurrency` is at least 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportExtraOptions {
    pub slice_limit: usize,
    pub max_concurrency: usize,
    pub display_settings: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawExtraOptions {
    #[serde(default)]
    slice_limit: Option<i64>,
    #[serde(default)]
    max_concurrency: Option<i64>,
    #[serde(default)]
    display_settings: Option<Map<String, Value>>,
}

impl ExportExtraOptions {
    /// Parse the blob leniently: a missing or malformed blob yields defaults.
    ///
    /// The blob may be a JSON object or a string containing one.
    pub fn parse(blob: Option<&Value>, limits: &ExportLimits) -> Self {
        let raw = match blob {
            Some(Value::Object(_)) => blob
                .cloned()
                .and_then(|v| serde_json::from_value::<RawExtraOptions>(v).ok()),
            Some(Value::String(s)) if !s.trim().is_empty() => {
                serde_json::from_str::<RawExtraOptions>(s).ok()
            }
            _ => None,
        };
        let raw = raw.unwrap_or_else(|| {
            if blob.is_some_and(|v| !v.is_null()) {
                tracing::debug!("Ignoring malformed export extra options");
            }
            RawExtraOptions::default()
        });

        Self {
            slice_limit: limits.normalize_slice_limit(raw.slice_limit.unwrap_or(0)),
            max_concurrency: limits.normalize_concurrency(raw.max_concurrency.unwrap_or(0)),
            display_settings: raw.display_settings.unwrap_or_default(),
        }
    }

    pub fn defaults(limits: &ExportLimits) -> Self {
        Self::parse(None, limits)
    }
}
