//! HTML rendering for viewer parts, the archive landing page and the
//! single-page HTML export.

use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt::Write;
use std::sync::LazyLock;

use chronicle_core::constants::MANIFEST_ENTRY;
use chronicle_core::models::{ExportMessage, ExportPayload, ViewerManifest};

use crate::assets::ViewerAssets;

static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<img\s+[^>]*?src="([^"]*)"[^>]*?/?>"#).expect("static regex is valid")
});

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape message text, keeping `<img src="...">` tags as images.
fn render_content(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for caps in IMG_TAG.captures_iter(content) {
        let (Some(whole), Some(src)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&escape_html(&content[last..whole.start()]).replace('\n', "<br>"));
        let _ = write!(out, r#"<img src="{}" alt="">"#, escape_html(src.as_str()));
        last = whole.end();
    }
    out.push_str(&escape_html(&content[last..]).replace('\n', "<br>"));
    out
}

fn display_flag(options: &Map<String, Value>, key: &str, default: bool) -> bool {
    options.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn theme_class(options: &Map<String, Value>) -> &'static str {
    match options.get("theme").and_then(Value::as_str) {
        Some("dark") => "theme-dark",
        _ => "theme-light",
    }
}

fn time_tag(t: DateTime<Utc>) -> String {
    format!(
        r#"<time datetime="{}">{}</time>"#,
        t.to_rfc3339(),
        t.format("%Y-%m-%d %H:%M:%S")
    )
}

fn open_document(out: &mut String, title: &str, assets: &ViewerAssets, body_class: &str) {
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body class=\"{}\">\n",
        escape_html(title),
        assets.stylesheet,
        body_class
    );
}

fn close_document(out: &mut String, assets: &ViewerAssets) {
    let _ = write!(out, "<script>{}</script>\n</body>\n</html>\n", assets.script);
}

fn write_messages(out: &mut String, messages: &[ExportMessage], options: &Map<String, Value>) {
    let show_time = display_flag(options, "show_timestamps", true);
    out.push_str("<main class=\"messages\">\n");
    for message in messages {
        out.push_str("<div class=\"message\">");
        if show_time {
            let _ = write!(out, "<span class=\"time\">{}</span>", time_tag(message.created_at));
        }
        let _ = write!(
            out,
            "<span class=\"sender\">{}</span><span class=\"content\">{}</span></div>\n",
            escape_html(&message.sender_name),
            render_content(&message.content)
        );
    }
    out.push_str("</main>\n");
}

fn write_range(out: &mut String, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) {
    if let (Some(start), Some(end)) = (start, end) {
        let _ = write!(out, "{} – {}", time_tag(start), time_tag(end));
    } else {
        out.push_str("no messages");
    }
}

/// One viewer part: `parts/part-NNN.html`.
pub fn render_html_part(payload: &ExportPayload, assets: &ViewerAssets) -> Result<Vec<u8>> {
    let part = payload
        .part
        .ok_or_else(|| anyhow::anyhow!("Viewer part payload is missing part information"))?;

    let mut out = String::new();
    let title = format!("{} ({}/{})", payload.title(), part.index, part.total);
    open_document(&mut out, &title, assets, theme_class(&payload.display_options));

    let _ = write!(
        out,
        "<header>\n<h1>{}</h1>\n<p class=\"meta\">Part {} of {} · {} messages · ",
        escape_html(payload.title()),
        part.index,
        part.total,
        payload.messages.len()
    );
    write_range(&mut out, payload.start_time, payload.end_time);
    out.push_str("</p>\n<nav class=\"pager\"><a href=\"../index.html\">Index</a>");
    if part.index > 1 {
        let _ = write!(out, "<a href=\"part-{:03}.html\">Previous</a>", part.index - 1);
    }
    if part.index < part.total {
        let _ = write!(out, "<a href=\"part-{:03}.html\">Next</a>", part.index + 1);
    }
    out.push_str("</nav>\n</header>\n");

    write_messages(&mut out, &payload.messages, &payload.display_options);
    close_document(&mut out, assets);
    Ok(out.into_bytes())
}

/// Landing page of the viewer archive.
pub fn render_viewer_index(manifest: &ViewerManifest, assets: &ViewerAssets) -> Result<Vec<u8>> {
    let mut out = String::new();
    let title = if manifest.channel_name.trim().is_empty() {
        manifest.channel_id.as_str()
    } else {
        manifest.channel_name.as_str()
    };
    open_document(&mut out, title, assets, theme_class(&manifest.display_options));

    let _ = write!(
        out,
        "<header>\n<h1>{}</h1>\n<p class=\"meta\">{} messages in {} parts · generated {} · \
         <a href=\"{}\">manifest</a></p>\n</header>\n",
        escape_html(title),
        manifest.total_messages,
        manifest.part_total,
        time_tag(manifest.generated_at),
        MANIFEST_ENTRY
    );

    out.push_str(
        "<table class=\"parts\">\n<thead><tr><th>Part</th><th>Messages</th><th>Range</th></tr></thead>\n<tbody>\n",
    );
    for part in &manifest.parts {
        let _ = write!(
            out,
            "<tr><td><a href=\"{}\">{} / {}</a></td><td>{}</td><td>",
            escape_html(&part.file),
            part.part_index,
            part.part_total,
            part.messages
        );
        write_range(&mut out, part.slice_start, part.slice_end);
        out.push_str("</td></tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");

    close_document(&mut out, assets);
    Ok(out.into_bytes())
}

/// The whole channel as one self-contained page.
pub fn render_single_page(payload: &ExportPayload, assets: &ViewerAssets) -> Result<Vec<u8>> {
    let mut out = String::new();
    open_document(&mut out, payload.title(), assets, theme_class(&payload.display_options));
    let _ = write!(
        out,
        "<header>\n<h1>{}</h1>\n<p class=\"meta\">{} messages · ",
        escape_html(payload.title()),
        payload.messages.len()
    );
    write_range(&mut out, payload.start_time, payload.end_time);
    out.push_str("</p>\n</header>\n");
    write_messages(&mut out, &payload.messages, &payload.display_options);
    close_document(&mut out, assets);
    Ok(out.into_bytes())
}
