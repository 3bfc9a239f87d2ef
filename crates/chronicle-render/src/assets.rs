//! Static assets shared by every viewer page of a job.

use anyhow::{Context, Result};
use std::path::Path;

const DEFAULT_STYLESHEET: &str = r#"
:root { --fg: #1f2328; --bg: #ffffff; --muted: #656d76; --accent: #0969da; }
body.theme-dark { --fg: #e6edf3; --bg: #0d1117; --muted: #8d96a0; --accent: #4493f8; }
body { margin: 0 auto; max-width: 960px; padding: 24px; font-family: system-ui, sans-serif;
       color: var(--fg); background: var(--bg); }
header { border-bottom: 1px solid var(--muted); margin-bottom: 16px; }
.meta { color: var(--muted); font-size: 0.875rem; }
.message { padding: 6px 0; line-height: 1.5; }
.message .time { color: var(--muted); font-size: 0.8rem; margin-right: 8px; }
.message .sender { font-weight: 600; margin-right: 6px; }
.message img { max-width: 100%; display: block; margin-top: 4px; }
nav.pager a { color: var(--accent); margin-right: 12px; }
table.parts { border-collapse: collapse; width: 100%; }
table.parts td, table.parts th { padding: 6px 8px; border-bottom: 1px solid var(--muted); text-align: left; }
"#;

const DEFAULT_SCRIPT: &str = r#"
document.querySelectorAll('time[datetime]').forEach(function (el) {
  var d = new Date(el.getAttribute('datetime'));
  if (!isNaN(d)) { el.textContent = d.toLocaleString(); }
});
"#;

/// Stylesheet and script inlined into every rendered page.
///
/// Loaded once per job and shared read-only by all part renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerAssets {
    pub stylesheet: String,
    pub script: String,
}

impl Default for ViewerAssets {
    fn default() -> Self {
        Self {
            stylesheet: DEFAULT_STYLESHEET.to_string(),
            script: DEFAULT_SCRIPT.to_string(),
        }
    }
}

impl ViewerAssets {
    /// Built-in assets, overridden by `viewer.css` / `viewer.js` from `dir` when present.
    pub async fn load(dir: Option<&Path>) -> Result<Self> {
        let mut assets = Self::default();
        let Some(dir) = dir else {
            return Ok(assets);
        };

        if let Some(css) = read_optional(&dir.join("viewer.css")).await? {
            assets.stylesheet = css;
        }
        if let Some(js) = read_optional(&dir.join("viewer.js")).await? {
            assets.script = js;
        }
        Ok(assets)
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read viewer asset {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_without_dir() {
        let assets = ViewerAssets::load(None).await.unwrap();
        assert_eq!(assets, ViewerAssets::default());
    }

    #[tokio::test]
    async fn test_overrides_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("viewer.css"), "body{}")
            .await
            .unwrap();

        let assets = ViewerAssets::load(Some(dir.path())).await.unwrap();
        assert_eq!(assets.stylesheet, "body{}");
        assert_eq!(assets.script, ViewerAssets::default().script);
    }
}
