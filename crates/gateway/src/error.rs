//! Fetch pipeline errors and their HTTP rendering.

use {
    axum::{
        http::StatusCode,
        response::{IntoResponse, Json, Response},
    },
    nse_relay_browser::BrowserError,
    thiserror::Error,
};

/// Summary sent as `error` for every downstream failure.
pub const FETCH_FAILED: &str = "Failed to fetch NSE data";

/// Summary sent as `error` when the query string cannot be decoded.
pub const INVALID_QUERY: &str = "Invalid query parameters";

/// Summary sent as `error` when no session slot is free.
pub const UNAVAILABLE: &str = "Service temporarily unavailable";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Missing required parameters: symbol, fromDate, toDate")]
    MissingParameter,

    /// The query string could not be decoded at all (e.g. a repeated key).
    #[error("{0}")]
    InvalidQuery(String),

    /// The browser could not be started.
    #[error("session acquisition failed: {0}")]
    Launch(#[source] BrowserError),

    /// The admission gate turned the request away.
    #[error("{0}")]
    Unavailable(#[source] BrowserError),

    #[error("{step} timed out after {after_ms}ms")]
    Timeout { step: &'static str, after_ms: u64 },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("invalid JSON from upstream: {0}")]
    Parse(#[source] serde_json::Error),
}

impl FetchError {
    /// Classify a failure from opening a session.
    #[must_use]
    pub fn from_open(err: BrowserError) -> Self {
        match err {
            BrowserError::PoolExhausted(_) => Self::Unavailable(err),
            other => Self::Launch(other),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter | Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Launch(_) | Self::Timeout { .. } | Self::Browser(_) | Self::Parse(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Short stable label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter => "missing_parameter",
            Self::InvalidQuery(_) => "invalid_query",
            Self::Launch(_) => "session_acquisition",
            Self::Unavailable(_) => "unavailable",
            Self::Timeout { .. } => "timeout",
            Self::Browser(_) => "browser",
            Self::Parse(_) => "parse",
        }
    }
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::MissingParameter => serde_json::json!({ "error": self.to_string() }),
            Self::InvalidQuery(_) => serde_json::json!({
                "error": INVALID_QUERY,
                "message": self.to_string(),
            }),
            Self::Unavailable(_) => serde_json::json!({
                "error": UNAVAILABLE,
                "message": self.to_string(),
            }),
            _ => serde_json::json!({
                "error": FETCH_FAILED,
                "message": self.to_string(),
            }),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(FetchError::MissingParameter.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            FetchError::from_open(BrowserError::PoolExhausted("busy".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            FetchError::from_open(BrowserError::LaunchFailed("no binary".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            FetchError::Timeout {
                step: "navigation",
                after_ms: 10
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_query_is_client_error() {
        let err = FetchError::InvalidQuery("duplicate field `symbol`".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "invalid_query");
        assert_eq!(err.to_string(), "duplicate field `symbol`");
    }

    #[test]
    fn messages() {
        let timeout = FetchError::Timeout {
            step: "navigation",
            after_ms: 60_000,
        };
        assert_eq!(timeout.to_string(), "navigation timed out after 60000ms");

        let parse = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        assert!(
            FetchError::Parse(parse)
                .to_string()
                .starts_with("invalid JSON from upstream")
        );

        let launch = FetchError::from_open(BrowserError::LaunchFailed("spawn failed".into()));
        assert_eq!(
            launch.to_string(),
            "session acquisition failed: browser launch failed: spawn failed"
        );
        assert_eq!(launch.kind(), "session_acquisition");
    }
}
