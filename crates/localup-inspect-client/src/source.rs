//! Upstream source of captured records

use async_trait::async_trait;
use localup_inspect_proto::{CapturedRecord, ListQuery};

use crate::error::InspectorError;

/// Anything that can serve captured records
///
/// `list_records` always returns a full snapshot; the inspector API has no
/// incremental primitive.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InspectorSource: Send + Sync {
    /// Fetch the current records, newest first
    async fn list_records(&self, query: &ListQuery) -> Result<Vec<CapturedRecord>, InspectorError>;

    /// Fetch one record; unknown IDs yield [`InspectorError::NotFound`]
    async fn get_record(&self, id: &str) -> Result<CapturedRecord, InspectorError>;

    /// Whether the inspector answers at all
    async fn health_check(&self) -> bool;
}
