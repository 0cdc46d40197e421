//! Error types for Crawlify

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned whenever the primary fetch fails
pub const FETCH_FAILED_MESSAGE: &str = "Unable to fetch the requested URL.";

/// Message returned when a search backend responds with a non-2xx status
pub const SEARCH_FAILED_MESSAGE: &str = "Unable to complete search request.";

/// Message returned for unrecognized search failures
pub const SEARCH_UNEXPECTED_MESSAGE: &str = "Unexpected error occurred while searching.";

/// JSON body describing a fatal error: `{"status": "error", "message": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Errors that abort a whole crawl
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL has invalid scheme
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Upstream was unreachable or answered with a non-2xx status
    #[error("Unable to fetch the requested URL.")]
    Upstream {
        /// Upstream status, 502 when no response was received
        status: u16,
    },
}

impl FetchError {
    /// Create an error from a transport-level reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16()).unwrap_or(502);
        if err.is_timeout() {
            tracing::warn!("Fetch timed out: {}", err);
        } else if err.is_connect() {
            tracing::warn!("Failed to connect to upstream: {}", err);
        } else {
            tracing::warn!("Fetch failed: {}", err);
        }
        FetchError::Upstream { status }
    }

    /// HTTP-style status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            FetchError::MissingUrl | FetchError::InvalidUrlScheme => 422,
            FetchError::ClientBuildError(_) => 500,
            FetchError::Upstream { status } => *status,
        }
    }

    /// JSON-shaped body for this error
    pub fn body(&self) -> ErrorBody {
        match self {
            FetchError::ClientBuildError(_) => {
                ErrorBody::new("Unexpected error occurred while crawling.")
            }
            other => ErrorBody::new(other.to_string()),
        }
    }
}

/// Errors from the external HTML to Markdown converter
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Converter binary is absent or lacks the execute bit
    #[error("html2markdown binary missing or not executable")]
    NotExecutable,

    /// The process could not be started
    #[error("failed to start html2markdown: {0}")]
    Spawn(#[source] std::io::Error),

    /// The process was killed after exceeding its deadline
    #[error("html2markdown conversion timed out")]
    TimedOut,

    /// The process exited unsuccessfully; carries stderr or a generic message
    #[error("{0}")]
    Failed(String),

    /// Waiting on the process or draining its pipes failed
    #[error("html2markdown I/O error: {0}")]
    Io(#[source] std::io::Error),
}

/// Errors from the headless browser
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Browser could not be launched
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// Navigation did not reach the requested lifecycle state in time
    #[error("navigation timed out after {0} ms")]
    NavigationTimeout(u64),

    /// Navigation failed for another reason
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Any other protocol-level failure
    #[error("browser error: {0}")]
    Protocol(String),

    /// Filesystem failure while writing a screenshot
    #[error("screenshot I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a search
#[derive(Debug, Error)]
pub enum SearchError {
    /// Query or limit failed validation
    #[error("{0}")]
    InvalidRequest(String),

    /// Backend is unknown or its credentials/endpoint are not configured
    #[error("{0}")]
    Unavailable(String),

    /// Backend call failed or returned a recognized failure shape
    #[error("{message}")]
    Upstream { status: u16, message: String },
}

impl SearchError {
    pub(crate) fn upstream(status: u16) -> Self {
        SearchError::Upstream {
            status,
            message: SEARCH_FAILED_MESSAGE.to_string(),
        }
    }

    pub(crate) fn unexpected() -> Self {
        SearchError::Upstream {
            status: 502,
            message: SEARCH_UNEXPECTED_MESSAGE.to_string(),
        }
    }

    /// Create an error from a transport-level reqwest error
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        tracing::warn!("Search request failed: {}", err);
        SearchError::upstream(err.status().map(|s| s.as_u16()).unwrap_or(502))
    }

    /// HTTP-style status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            SearchError::InvalidRequest(_) => 422,
            SearchError::Unavailable(_) => 503,
            SearchError::Upstream { status, .. } => *status,
        }
    }

    /// JSON-shaped body for this error
    pub fn body(&self) -> ErrorBody {
        ErrorBody::new(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FetchError::MissingUrl.to_string(),
            "Missing required parameter: url"
        );
        assert_eq!(
            FetchError::InvalidUrlScheme.to_string(),
            "Invalid URL: must start with http:// or https://"
        );
        assert_eq!(
            FetchError::Upstream { status: 404 }.to_string(),
            FETCH_FAILED_MESSAGE
        );
        assert_eq!(
            ConversionError::TimedOut.to_string(),
            "html2markdown conversion timed out"
        );
    }

    #[test]
    fn test_fetch_error_status_codes() {
        assert_eq!(FetchError::Upstream { status: 404 }.status_code(), 404);
        assert_eq!(FetchError::Upstream { status: 502 }.status_code(), 502);
        assert_eq!(FetchError::InvalidUrlScheme.status_code(), 422);
    }

    #[test]
    fn test_search_error_mapping() {
        let err = SearchError::Unavailable("missing".to_string());
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.body(), ErrorBody::new("missing"));

        let err = SearchError::upstream(429);
        assert_eq!(err.status_code(), 429);
        assert_eq!(err.to_string(), SEARCH_FAILED_MESSAGE);
        assert_eq!(SearchError::unexpected().status_code(), 502);
    }

    #[test]
    fn test_error_body_serialization() {
        let json = serde_json::to_value(ErrorBody::new("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "error", "message": "boom"}));
    }
}
