//! Scoped ownership of an automation session.
//!
//! [`SessionGuard`] is the only way the fetch pipeline holds a session. The
//! happy path calls [`SessionGuard::release`] and awaits the close; every
//! other exit (early `?`, panic unwinding, the request future being dropped
//! on client disconnect) goes through `Drop`, which hands the close to the
//! runtime. Either way the admission permit is returned only after the
//! browser process is gone, or once the release ceiling has passed and the
//! process has been left to kill-on-drop.

use std::time::Duration;

use tracing::{debug, warn};

use crate::{error::BrowserError, gate::SessionPermit, session::AutomationSession};

/// Release ceiling for guards built without one.
const DEFAULT_RELEASE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct SessionGuard {
    session: Option<Box<dyn AutomationSession>>,
    permit: Option<SessionPermit>,
    release_timeout: Duration,
}

impl SessionGuard {
    /// Wrap a freshly launched session, optionally tied to an admission permit.
    #[must_use]
    pub fn new(session: Box<dyn AutomationSession>, permit: Option<SessionPermit>) -> Self {
        Self {
            session: Some(session),
            permit,
            release_timeout: DEFAULT_RELEASE_TIMEOUT,
        }
    }

    /// Bound how long closing may take before the session is abandoned.
    #[must_use]
    pub fn with_release_timeout(mut self, release_timeout: Duration) -> Self {
        self.release_timeout = release_timeout;
        self
    }

    /// Session identifier, empty once released.
    #[must_use]
    pub fn id(&self) -> &str {
        self.session.as_deref().map(|s| s.id()).unwrap_or_default()
    }

    /// Borrow the guarded session.
    pub fn session(&mut self) -> Result<&mut (dyn AutomationSession + 'static), BrowserError> {
        self.session
            .as_deref_mut()
            .ok_or(BrowserError::SessionReleased)
    }

    /// Close the session and wait for it, at most `release_timeout`.
    ///
    /// Close failures are logged, never returned: by the time a session is
    /// released the request outcome is already decided. If this future is
    /// dropped part-way, the permit still goes back with the guard.
    pub async fn release(mut self) {
        if let Some(session) = self.session.take() {
            close_session(session, self.release_timeout).await;
        }
        drop(self.permit.take());
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let permit = self.permit.take();
        let release_timeout = self.release_timeout;
        let session_id = session.id().to_string();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(session_id, "session guard dropped unreleased, closing in background");
                handle.spawn(async move {
                    close_session(session, release_timeout).await;
                    drop(permit);
                });
            },
            Err(_) => {
                warn!(
                    session_id,
                    "no async runtime to close browser session; relying on process kill-on-drop"
                );
            },
        }
    }
}

/// Close `session`, giving up after `deadline`. Dropping an unclosed session
/// kills its process, so the slot can be reused either way.
async fn close_session(mut session: Box<dyn AutomationSession>, deadline: Duration) {
    let session_id = session.id().to_string();
    match tokio::time::timeout(deadline, session.close()).await {
        Ok(Ok(())) => debug!(session_id, "browser session released"),
        Ok(Err(e)) => {
            warn!(session_id, error = %e, "failed to release browser session");

            #[cfg(feature = "metrics")]
            nse_relay_metrics::counter!(nse_relay_metrics::browser::RELEASE_FAILURES_TOTAL)
                .increment(1);
        },
        Err(_elapsed) => {
            warn!(
                session_id,
                after_ms = deadline.as_millis() as u64,
                "browser session did not close in time, abandoning it"
            );

            #[cfg(feature = "metrics")]
            nse_relay_metrics::counter!(nse_relay_metrics::browser::RELEASE_FAILURES_TOTAL)
                .increment(1);
        },
    }

    #[cfg(feature = "metrics")]
    nse_relay_metrics::counter!(nse_relay_metrics::browser::SESSIONS_CLOSED_TOTAL).increment(1);
}
