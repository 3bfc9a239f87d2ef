//! Built-in single-document formatters.

mod html;
mod json;
mod text;

pub use html::HtmlFormatter;
pub use json::JsonFormatter;
pub use text::TextFormatter;
