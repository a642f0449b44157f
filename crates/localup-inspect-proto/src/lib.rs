//! Inspector Data Model
//!
//! This crate defines the captured request records returned by the agent's
//! inspector API, and the filter types used to select a subset of them.

pub mod error;
pub mod filters;
pub mod output;
pub mod path_pattern;
pub mod records;

pub use error::ParseError;
pub use filters::{FilterStage, RequestFilters, StatusCodeFilter, TimeUnit, TimeWindow};
pub use output::FormatOptions;
pub use path_pattern::PathPattern;
pub use records::{
    CapturedRecord, HttpHeaders, ListQuery, RecordBatch, RequestPart, ResponsePart,
};

/// Default number of records returned by `list`
pub const DEFAULT_LIST_LIMIT: usize = 20;
