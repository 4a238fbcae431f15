//! Browser error types.

use thiserror::Error;

/// Errors that can occur while driving a browser session.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser not available: Chrome/Chromium not found. {0}")]
    BrowserNotAvailable(String),

    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("failed to read response body: {0}")]
    BodyUnavailable(String),

    #[error("no browser session available: {0}")]
    PoolExhausted(String),

    #[error("browser session already released")]
    SessionReleased,

    #[error("CDP error: {0}")]
    Cdp(String),
}

impl BrowserError {
    /// Whether the failure happened before a browser process existed.
    #[must_use]
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, Self::BrowserNotAvailable(_) | Self::LaunchFailed(_))
    }
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::Cdp(err.to_string())
    }
}
