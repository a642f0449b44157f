//! Markdown report formatter
//!
//! A report is a summary header followed by one block per record, each
//! preceded by a `---` rule. Repeated headers are rendered as repeated
//! lines, never comma-joined.

use chrono::{DateTime, Utc};
use localup_inspect_proto::{CapturedRecord, FormatOptions, HttpHeaders};

use crate::body::{decode_body, render_body};
use crate::summary::FiltersSummary;

/// Headers whose values are replaced by `***` when masking is enabled
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "x-api-key",
    "cookie",
    "set-cookie",
];

const MASK: &str = "***";

/// Renders captured records as Markdown
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter;

impl ReportFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Format a list of records with a summary header
    pub fn format_requests(
        &self,
        records: &[CapturedRecord],
        options: &FormatOptions,
        summary: &FiltersSummary,
    ) -> String {
        self.format_requests_at(records, options, summary, Utc::now())
    }

    /// Same as [`ReportFormatter::format_requests`] with a fixed retrieval time
    pub fn format_requests_at(
        &self,
        records: &[CapturedRecord],
        options: &FormatOptions,
        summary: &FiltersSummary,
        retrieved: DateTime<Utc>,
    ) -> String {
        let mut lines: Vec<String> = Vec::new();

        let count = records.len();
        let plural = if count == 1 { "" } else { "s" };
        lines.push(format!("# Inspector - {} request{}", count, plural));
        lines.push(String::new());

        if !summary.is_empty() {
            lines.push(format!("**Filters:** {}", summary));
        }
        lines.push(format!("**Retrieved:** {}", retrieved.to_rfc3339()));
        lines.push(String::new());

        for (i, record) in records.iter().enumerate() {
            lines.push("---".to_string());
            lines.push(String::new());
            lines.push(self.format_request(record, options));
            if i + 1 < count {
                lines.push(String::new());
            }
        }

        lines.join("\n")
    }

    /// Notice for a filtered list that came back empty
    pub fn format_empty(&self, summary: &FiltersSummary, base_url: &str) -> String {
        let mut lines: Vec<String> = Vec::new();

        if summary.is_empty() {
            lines.push("No requests captured yet.".to_string());
        } else {
            lines.push("No requests found matching filters:".to_string());
            for part in summary.parts() {
                lines.push(format!("  • {}", part));
            }
            lines.push(String::new());
            lines.push("Try broadening your filters or check the inspector at:".to_string());
        }
        lines.push(format!("{}/inspect/http", base_url.trim_end_matches('/')));

        lines.join("\n")
    }

    /// Single record preceded by a labelled separator, as printed by tail
    pub fn format_tail_entry(&self, record: &CapturedRecord, options: &FormatOptions) -> String {
        format!(
            "──── {} {} ────\n\n{}",
            record.request.method,
            record.request.uri,
            self.format_request(record, options)
        )
    }

    /// Format a single record
    pub fn format_request(&self, record: &CapturedRecord, options: &FormatOptions) -> String {
        let mut lines: Vec<String> = Vec::new();

        let status = match &record.response {
            Some(response) => response.status.clone(),
            None => "pending (no response yet)".to_string(),
        };

        lines.push(format!("## {} {}", record.request.method, record.request.uri));
        lines.push(format!("**ID:** {}", record.id));
        lines.push(format!("**Status:** {}", status));
        lines.push(format!("**Duration:** {}ms", record.duration / 1_000_000));
        lines.push(format!("**Timestamp:** {}", record.start.to_rfc3339()));
        lines.push(format!("**Tunnel:** {}", record.tunnel_name));
        lines.push(format!("**Remote:** {}", record.remote_addr));
        lines.push(String::new());

        self.push_section(
            &mut lines,
            "Request",
            &record.request.headers,
            record.request.raw.as_deref(),
            options,
        );

        match &record.response {
            Some(response) => self.push_section(
                &mut lines,
                "Response",
                &response.headers,
                response.raw.as_deref(),
                options,
            ),
            None => {
                lines.push("_No response recorded._".to_string());
                lines.push(String::new());
            }
        }

        lines.join("\n")
    }

    fn push_section(
        &self,
        lines: &mut Vec<String>,
        title: &str,
        headers: &HttpHeaders,
        raw: Option<&str>,
        options: &FormatOptions,
    ) {
        if options.show_headers {
            let header_lines = self.format_headers(headers, options);
            let fence = code_fence(&header_lines.join("\n"));
            lines.push(format!("### {} Headers", title));
            lines.push(fence.clone());
            lines.extend(header_lines);
            lines.push(fence);
            lines.push(String::new());
        }

        let body = decode_body(raw);
        if body.is_empty() {
            return;
        }

        let content_type = headers.first_ignore_case("Content-Type").unwrap_or("");
        let rendered = render_body(&body, options);
        let fence = code_fence(&rendered);
        lines.push(format!("### {} Body", title));
        lines.push(format!("{}{}", fence, code_block_lang(content_type)));
        lines.push(rendered);
        lines.push(fence);
        lines.push(String::new());
    }

    /// One `Name: value` line per header value
    pub fn format_headers(&self, headers: &HttpHeaders, options: &FormatOptions) -> Vec<String> {
        let mut lines = Vec::new();

        for (name, values) in headers.iter() {
            if !options.shows_header(name) {
                continue;
            }

            if options.mask_sensitive && is_sensitive(name) {
                lines.push(format!("{}: {}", name, MASK));
                continue;
            }

            for value in values {
                lines.push(format!("{}: {}", name, value));
            }
        }

        lines
    }
}

fn is_sensitive(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|sensitive| sensitive.eq_ignore_ascii_case(name))
}

/// Backtick fence longer than any backtick run inside `content`
fn code_fence(content: &str) -> String {
    let longest = content
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat((longest + 1).max(3))
}

/// Code fence language for a content type
fn code_block_lang(content_type: &str) -> &'static str {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("json") {
        "json"
    } else if ct.contains("xml") {
        "xml"
    } else if ct.contains("html") {
        "html"
    } else if ct.contains("javascript") {
        "javascript"
    } else if ct.contains("css") {
        "css"
    } else {
        ""
    }
}
