//! Captured request records as served by the inspector API
//!
//! `GET /api/requests/http` returns `{"uri": ..., "requests": [...]}` and
//! `GET /api/requests/http/{id}` returns a single record. Bodies are carried
//! base64 encoded in the `raw` fields.

use chrono::{DateTime, FixedOffset};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use tracing::warn;

use crate::error::ParseError;

/// Multi-value HTTP header mapping
///
/// Keys keep the case and order in which the agent reported them, and every
/// value of a repeated header is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    entries: Vec<(String, Vec<String>)>,
}

impl HttpHeaders {
    /// Create an empty header mapping
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a value, creating the key if needed
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, values)) => values.push(value.into()),
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// Builder form of [`HttpHeaders::append`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    /// Values for an exact (case-sensitive) key
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, values)| values.as_slice())
    }

    /// First value for a key, matched case-insensitively
    pub fn first_ignore_case(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// Iterate over `(name, values)` in received order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for HttpHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, values) in &self.entries {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HttpHeaders {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = HttpHeaders;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to lists of values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut headers = HttpHeaders::new();
                while let Some((key, values)) = access.next_entry::<String, Vec<String>>()? {
                    for value in values {
                        headers.append(key.clone(), value);
                    }
                }
                Ok(headers)
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(HttpHeaders::new())
            }
        }

        deserializer.deserialize_any(HeadersVisitor)
    }
}

/// Incoming request half of a capture
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestPart {
    pub method: String,
    pub proto: String,
    #[serde(default)]
    pub headers: HttpHeaders,
    /// Request target as sent by the client
    pub uri: String,
    /// Base64 encoded payload
    #[serde(default)]
    pub raw: Option<String>,
}

/// Response half of a capture
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponsePart {
    /// Status line text, e.g. "200 OK"
    pub status: String,
    pub status_code: u16,
    pub proto: String,
    #[serde(default)]
    pub headers: HttpHeaders,
    /// Base64 encoded payload
    #[serde(default)]
    pub raw: Option<String>,
}

/// One observed request/response exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapturedRecord {
    /// Inspector API resource URI of this record
    pub uri: String,
    pub id: String,
    pub tunnel_name: String,
    pub remote_addr: String,
    /// Start of the exchange, offset preserved as reported
    pub start: DateTime<FixedOffset>,
    /// Duration in nanoseconds
    pub duration: u64,
    pub request: RequestPart,
    /// Absent until the agent has recorded a response
    #[serde(default)]
    pub response: Option<ResponsePart>,
}

impl CapturedRecord {
    /// Parse a single record from a JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self, ParseError> {
        serde_json::from_value(value).map_err(|e| ParseError::Record(e.to_string()))
    }

    /// Response status code, if a response was recorded
    pub fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status_code)
    }

    /// Path component of the request target (no query string or fragment)
    pub fn path(&self) -> Cow<'_, str> {
        let target = self.request.uri.as_str();

        // Origin-form targets are used as is; anything after `?` may hold a URL
        if !target.starts_with('/') {
            if let Ok(url) = url::Url::parse(target) {
                if url.has_host() {
                    return Cow::Owned(url.path().to_string());
                }
            }
        }

        let end = target.find(['?', '#']).unwrap_or(target.len());
        Cow::Borrowed(&target[..end])
    }

    /// Domain the request was addressed to
    ///
    /// Taken from the `Host` header, or from the authority of an
    /// absolute-form request target.
    pub fn domain(&self) -> Option<String> {
        if let Some(host) = self.request.headers.first_ignore_case("Host") {
            return Some(host.to_string());
        }

        let parsed = url::Url::parse(&self.request.uri).ok()?;
        let host = parsed.host_str()?;
        Some(match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }
}

/// Query constraints understood by the list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub tunnel_name: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_tunnel_name(mut self, tunnel_name: impl Into<String>) -> Self {
        self.tunnel_name = Some(tunnel_name.into());
        self
    }
}

#[derive(Deserialize)]
struct RawRecordList {
    #[serde(default)]
    requests: Vec<serde_json::Value>,
}

/// Result of decoding a list payload
///
/// Records are decoded one by one; a malformed entry is skipped with a
/// warning instead of failing the whole batch.
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    pub records: Vec<CapturedRecord>,
    pub skipped: usize,
}

impl RecordBatch {
    /// Decode the body of `GET /api/requests/http`
    pub fn from_value(value: serde_json::Value) -> Result<Self, ParseError> {
        let list: RawRecordList =
            serde_json::from_value(value).map_err(|e| ParseError::Record(e.to_string()))?;

        let mut batch = RecordBatch::default();
        for entry in list.requests {
            let id = entry
                .get("id")
                .and_then(|id| id.as_str())
                .unwrap_or("<unknown>")
                .to_string();

            match CapturedRecord::from_value(entry) {
                Ok(record) => batch.records.push(record),
                Err(e) => {
                    warn!("Skipping captured record {}: {}", id, e);
                    batch.skipped += 1;
                }
            }
        }

        Ok(batch)
    }
}
