//! HTTP client for the agent's inspector API

use async_trait::async_trait;
use localup_inspect_proto::{CapturedRecord, ListQuery, RecordBatch};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::InspectorError;
use crate::source::InspectorSource;

/// Timeout for a single inspector API call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Inspector API client
///
/// The underlying connection pool is released when the client is dropped.
#[derive(Debug, Clone)]
pub struct InspectorClient {
    base_url: String,
    http: reqwest::Client,
}

impl InspectorClient {
    /// Create a client for the given base URL (e.g. `http://127.0.0.1:4040`)
    pub fn new(base_url: &str) -> Result<Self, InspectorError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|_| InspectorError::InvalidUrl(base_url.clone()))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InspectorError::Connection {
                base_url: base_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build `<base_url>/<segments...>` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, InspectorError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|_| InspectorError::InvalidUrl(self.base_url.clone()))?;

        url.path_segments_mut()
            .map_err(|_| InspectorError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn get_json(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, String, Option<serde_json::Value>), InspectorError> {
        let response = request.send().await.map_err(|e| InspectorError::Connection {
            base_url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            return Ok((status, url, None));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| InspectorError::InvalidResponse(e.to_string()))?;

        Ok((status, url, Some(body)))
    }
}

#[async_trait]
impl InspectorSource for InspectorClient {
    async fn list_records(&self, query: &ListQuery) -> Result<Vec<CapturedRecord>, InspectorError> {
        let url = self.endpoint(&["api", "requests", "http"])?;

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(tunnel_name) = &query.tunnel_name {
            params.push(("tunnel_name", tunnel_name.clone()));
        }

        debug!("Fetching captured requests from {} {:?}", url, params);

        let (status, url, body) = self.get_json(self.http.get(url).query(&params)).await?;
        let body = match body {
            Some(body) => body,
            None => {
                return Err(InspectorError::Http {
                    status: status.as_u16(),
                    url,
                })
            }
        };

        let batch = RecordBatch::from_value(body)
            .map_err(|e| InspectorError::InvalidResponse(e.to_string()))?;

        if batch.skipped > 0 {
            warn!(
                "Skipped {} malformed record(s) out of {}",
                batch.skipped,
                batch.skipped + batch.records.len()
            );
        }
        debug!("Retrieved {} captured request(s)", batch.records.len());

        Ok(batch.records)
    }

    async fn get_record(&self, id: &str) -> Result<CapturedRecord, InspectorError> {
        let url = self.endpoint(&["api", "requests", "http", id])?;
        debug!("Fetching captured request {} from {}", id, url);

        let (status, url, body) = self.get_json(self.http.get(url)).await?;
        match body {
            Some(body) => CapturedRecord::from_value(body)
                .map_err(|e| InspectorError::InvalidResponse(e.to_string())),
            None if status == StatusCode::NOT_FOUND => Err(InspectorError::NotFound(id.to_string())),
            None => Err(InspectorError::Http {
                status: status.as_u16(),
                url,
            }),
        }
    }

    async fn health_check(&self) -> bool {
        let url = match self.endpoint(&["api", "status"]) {
            Ok(url) => url,
            Err(_) => return false,
        };

        match self.http.get(url).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!("Inspector health check failed: {}", e);
                false
            }
        }
    }
}
