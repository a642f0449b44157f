//! Output formatting options

/// Options controlling how records are rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Re-indent bodies that parse as JSON
    pub pretty_print: bool,
    /// Max characters per body, `None` disables truncation
    pub truncate: Option<usize>,
    pub show_headers: bool,
    /// If set, only these headers are shown (case-insensitive)
    pub headers_filter: Option<Vec<String>>,
    /// Replace credentials in headers such as `Authorization` with `***`
    pub mask_sensitive: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            pretty_print: false,
            truncate: None,
            show_headers: true,
            headers_filter: None,
            mask_sensitive: true,
        }
    }
}

impl FormatOptions {
    /// Whether a header passes `headers_filter`
    pub fn shows_header(&self, name: &str) -> bool {
        match &self.headers_filter {
            Some(allowed) => allowed.iter().any(|a| a.eq_ignore_ascii_case(name)),
            None => true,
        }
    }
}
