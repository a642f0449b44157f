//! Request path matching with glob or regex patterns
//!
//! Glob patterns are anchored to the full path: `*` matches any run of
//! characters including `/`, `?` matches exactly one character. Regex
//! patterns use search semantics unless they carry their own anchors.
//!
//! A pattern containing any of `^ $ [ ] ( ) { } \ + |` is treated as a regex,
//! anything else as a glob.

use glob::{MatchOptions, Pattern};
use regex_lite::Regex;
use std::fmt;

use crate::error::ParseError;

const REGEX_MARKERS: &[char] = &['^', '$', '[', ']', '(', ')', '{', '}', '\\', '+', '|'];

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Compiled path pattern
#[derive(Debug, Clone)]
pub enum PathPattern {
    Glob { source: String, pattern: Pattern },
    Regex { source: String, regex: Regex },
}

impl PathPattern {
    /// Compile a pattern, choosing glob or regex mode from its content
    pub fn parse(pattern: &str) -> Result<Self, ParseError> {
        if pattern.contains(REGEX_MARKERS) {
            Self::regex(pattern)
        } else {
            Self::glob(pattern)
        }
    }

    /// Compile a glob pattern
    ///
    /// Only `*` and `?` are wildcards; every other character is literal.
    pub fn glob(pattern: &str) -> Result<Self, ParseError> {
        let mut escaped = String::with_capacity(pattern.len());
        let mut previous_star = false;

        for c in pattern.chars() {
            match c {
                // `*` already crosses separators, so runs of stars collapse
                '*' if previous_star => continue,
                '*' | '?' => escaped.push(c),
                _ => escaped.push_str(&Pattern::escape(c.encode_utf8(&mut [0u8; 4]))),
            }
            previous_star = c == '*';
        }

        let compiled = Pattern::new(&escaped).map_err(|e| ParseError::PathPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(PathPattern::Glob {
            source: pattern.to_string(),
            pattern: compiled,
        })
    }

    /// Compile a regular expression
    pub fn regex(pattern: &str) -> Result<Self, ParseError> {
        let regex = Regex::new(pattern).map_err(|e| ParseError::PathPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(PathPattern::Regex {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Check whether a request path satisfies the pattern
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Glob { pattern, .. } => pattern.matches_with(path, GLOB_OPTIONS),
            PathPattern::Regex { regex, .. } => regex.is_match(path),
        }
    }

    /// The pattern as the user wrote it
    pub fn as_str(&self) -> &str {
        match self {
            PathPattern::Glob { source, .. } | PathPattern::Regex { source, .. } => source,
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, PathPattern::Regex { .. })
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
