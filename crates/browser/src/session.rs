//! Automation session abstraction.
//!
//! A session is one browser process plus one page. The fetch pipeline only
//! talks to these traits, so the chromiumoxide implementation in
//! [`crate::cdp`] can be swapped for an in-process fake in tests.

use async_trait::async_trait;

use crate::error::BrowserError;

/// A live browser process with a single page.
#[async_trait]
pub trait AutomationSession: Send {
    /// Identifier used in logs.
    fn id(&self) -> &str;

    /// Headers sent with every request the page makes from now on.
    async fn set_extra_headers(&mut self, headers: &[(String, String)])
    -> Result<(), BrowserError>;

    /// Navigate the page and wait until the network is idle.
    ///
    /// Implementations may block for as long as the remote takes; callers
    /// bound the call with their own deadline.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Text content of the loaded document.
    async fn body_text(&mut self) -> Result<String, BrowserError>;

    /// Close the page and terminate the browser process.
    ///
    /// Must be idempotent: a second call is a no-op.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Creates fresh, unshared sessions.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn AutomationSession>, BrowserError>;
}
