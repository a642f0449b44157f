//! Inspector client errors

use thiserror::Error;

/// Errors returned while talking to the inspector API
#[derive(Debug, Error)]
pub enum InspectorError {
    #[error(
        "Cannot connect to the inspector at {base_url}: {reason}\n\n\
         Possible causes:\n  \
         • the tunnel agent is not running\n  \
         • the inspector listens on a different address (use --base-url or LOCALUP_INSPECT_URL)\n  \
         • the inspector interface is disabled"
    )]
    Connection { base_url: String, reason: String },

    #[error("Request not found: {0}")]
    NotFound(String),

    #[error("Inspector returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Invalid response from inspector: {0}")]
    InvalidResponse(String),

    #[error("Invalid inspector URL '{0}'")]
    InvalidUrl(String),
}

impl InspectorError {
    pub fn is_connection(&self) -> bool {
        matches!(self, InspectorError::Connection { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, InspectorError::NotFound(_))
    }
}
