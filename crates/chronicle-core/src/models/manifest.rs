use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Archive metadata written to `manifest/meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerManifest {
    pub channel_id: String,
    pub channel_name: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub display_options: Map<String, Value>,
    pub slice_limit: usize,
    pub max_concurrency: usize,
    pub part_total: usize,
    pub total_messages: usize,
    pub parts: Vec<ViewerManifestPart>,
}

/// One rendered part as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerManifestPart {
    pub file: String,
    pub part_index: usize,
    pub part_total: usize,
    pub messages: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_end: Option<DateTime<Utc>>,
    /// Hex SHA-256 of the exact bytes stored for this part.
    pub sha256: String,
}

impl ViewerManifest {
    /// `parts.len() == part_total` and the per-part counts add up.
    pub fn is_consistent(&self) -> bool {
        self.parts.len() == self.part_total
            && self.parts.iter().map(|p| p.messages).sum::<usize>() == self.total_messages
            && self
                .parts
                .iter()
                .enumerate()
                .all(|(i, p)| p.part_index == i + 1 && p.part_total == self.part_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(index: usize, total: usize, messages: usize) -> ViewerManifestPart {
        ViewerManifestPart {
            file: format!("parts/part-{:03}.html", index),
            part_index: index,
            part_total: total,
            messages,
            slice_start: None,
            slice_end: None,
            sha256: String::new(),
        }
    }

    #[test]
    fn test_consistency() {
        let mut manifest = ViewerManifest {
            channel_id: "c".to_string(),
            channel_name: "n".to_string(),
            generated_at: Utc::now(),
            display_options: Map::new(),
            slice_limit: 2,
            max_concurrency: 1,
            part_total: 2,
            total_messages: 3,
            parts: vec![part(1, 2, 2), part(2, 2, 1)],
        };
        assert!(manifest.is_consistent());

        manifest.total_messages = 4;
        assert!(!manifest.is_consistent());

        manifest.total_messages = 3;
        manifest.parts.swap(0, 1);
        assert!(!manifest.is_consistent());
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let json = serde_json::to_value(part(1, 1, 0)).unwrap();
        assert!(json.get("slice_start").is_none());
        assert_eq!(json["file"], "parts/part-001.html");
    }
}
