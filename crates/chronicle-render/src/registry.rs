//! Formatter registry for single-document exports

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::assets::ViewerAssets;
use crate::formatter::ExportFormatter;
use crate::formatters::{HtmlFormatter, JsonFormatter, TextFormatter};

/// Registry mapping format keys to formatters.
///
/// Cloning is cheap and shares the underlying map. Keys are normalised to
/// lowercase, so `"TXT"` and `"txt"` resolve to the same formatter.
#[derive(Clone)]
pub struct FormatterRegistry {
    formatters: Arc<RwLock<HashMap<String, Arc<dyn ExportFormatter>>>>,
}

impl FormatterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            formatters: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry with the built-in `txt`, `json` and `html-page` formatters.
    pub async fn with_defaults(assets: Arc<ViewerAssets>) -> Self {
        let registry = Self::new();
        registry.register(Arc::new(TextFormatter)).await;
        registry.register(Arc::new(JsonFormatter)).await;
        registry.register(Arc::new(HtmlFormatter::new(assets))).await;
        registry
    }

    /// Register a formatter under its key, replacing any previous one.
    pub async fn register(&self, formatter: Arc<dyn ExportFormatter>) {
        let key = normalize_key(formatter.key());
        let mut formatters = self.formatters.write().await;
        if formatters.insert(key.clone(), formatter).is_some() {
            tracing::debug!(format = %key, "Replaced export formatter");
        }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<dyn ExportFormatter>> {
        self.formatters.read().await.get(&normalize_key(key)).cloned()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.formatters
            .read()
            .await
            .contains_key(&normalize_key(key))
    }

    /// Registered keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.formatters.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}
