//! Body decoding
//!
//! Bodies arrive base64 encoded. Decoding never fails the report: invalid
//! base64 renders as an empty body and invalid UTF-8 is replaced lossily.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use localup_inspect_proto::FormatOptions;
use tracing::debug;

/// Decode a base64 payload into display text
pub fn decode_body(raw: Option<&str>) -> String {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return String::new(),
    };

    match BASE64.decode(raw.trim()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            debug!("Body is not valid base64 ({}), rendering it empty", e);
            String::new()
        }
    }
}

/// Apply pretty-printing and truncation to decoded body text
///
/// Truncation runs on the final rendered string and counts characters, not
/// bytes.
pub fn render_body(text: &str, options: &FormatOptions) -> String {
    let rendered = if options.pretty_print {
        pretty_json(text).unwrap_or_else(|| text.to_string())
    } else {
        text.to_string()
    };

    match options.truncate {
        Some(limit) => truncate(rendered, limit),
        None => rendered,
    }
}

fn pretty_json(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

fn truncate(text: String, limit: usize) -> String {
    let total = text.chars().count();
    if total <= limit {
        return text;
    }

    let cut = text
        .char_indices()
        .nth(limit)
        .map(|(index, _)| index)
        .unwrap_or(text.len());

    format!("{}\n... (truncated, {} total chars)", &text[..cut], total)
}
