//! Human-readable summary of active filters
//!
//! The limit is not a predicate and is left out.

use localup_inspect_proto::RequestFilters;
use std::fmt;

/// Active filters, one entry per constraint (`errors only`, `path=/api/*`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiltersSummary {
    parts: Vec<String>,
}

impl FiltersSummary {
    pub fn from_filters(filters: &RequestFilters) -> Self {
        let mut parts = Vec::new();

        if let Some(status) = &filters.status {
            if status.is_errors_only() {
                parts.push("errors only".to_string());
            }

            let codes: Vec<String> = status
                .exact()
                .iter()
                .map(|code| code.to_string())
                .chain(status.ranges().iter().map(|class| format!("{}xx", class)))
                .collect();
            if !codes.is_empty() {
                parts.push(format!("status={}", codes.join(",")));
            }
        }

        if let Some(pattern) = &filters.path_pattern {
            parts.push(format!("path={}", pattern));
        }

        if let Some(domain) = &filters.domain {
            parts.push(format!("domain={}", domain));
        }

        if let Some(tunnel_name) = &filters.tunnel_name {
            parts.push(format!("tunnel={}", tunnel_name));
        }

        if let Some(window) = &filters.time_window {
            parts.push(format!("since={}", window));
        }

        Self { parts }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl fmt::Display for FiltersSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join(", "))
    }
}
