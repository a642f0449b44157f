//! List, get and tail on top of an [`InspectorSource`]

use localup_inspect_proto::{CapturedRecord, FormatOptions, ListQuery, RequestFilters};
use tracing::debug;

use crate::error::InspectorError;
use crate::source::InspectorSource;
use crate::tail::TailLoop;

/// Inspector operations with client-side filtering
pub struct InspectorService<S> {
    source: S,
}

impl<S: InspectorSource> InspectorService<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch records and apply `filters`
    ///
    /// The tunnel name is also forwarded to the API. The limit is applied
    /// locally after all predicates, so it is never sent upstream.
    pub async fn list(&self, filters: &RequestFilters) -> Result<Vec<CapturedRecord>, InspectorError> {
        let query = list_query(filters);
        let records = self.source.list_records(&query).await?;
        let fetched = records.len();

        let records = filters.apply(records);
        debug!("{} of {} record(s) kept after filtering", records.len(), fetched);

        Ok(records)
    }

    /// Fetch a single record by ID
    pub async fn get(&self, id: &str) -> Result<CapturedRecord, InspectorError> {
        self.source.get_record(id).await
    }

    pub async fn health_check(&self) -> bool {
        self.source.health_check().await
    }

    /// Build a tail loop over this service's source
    pub fn tail(&self, filters: &RequestFilters, options: FormatOptions) -> TailLoop<'_, S> {
        TailLoop::new(&self.source, filters, options)
    }
}

/// Upstream query for a filter set; only the tunnel name is pushed down
pub(crate) fn list_query(filters: &RequestFilters) -> ListQuery {
    ListQuery {
        limit: None,
        tunnel_name: filters.tunnel_name.clone(),
    }
}
