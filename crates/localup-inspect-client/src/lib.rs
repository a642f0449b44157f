//! Inspector API client
//!
//! Fetches captured requests from the tunnel agent's local inspector API and
//! provides the list, get and tail operations on top of it.

pub mod client;
pub mod error;
pub mod service;
pub mod source;
pub mod tail;

#[cfg(test)]
mod fixtures;

pub use client::{InspectorClient, REQUEST_TIMEOUT};
pub use error::InspectorError;
pub use service::InspectorService;
pub use source::InspectorSource;
pub use tail::{TailLoop, TailStats, DEFAULT_POLL_INTERVAL};

pub use localup_inspect_proto::{CapturedRecord, FormatOptions, ListQuery, RequestFilters};
