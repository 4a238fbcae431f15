//! Chrome DevTools Protocol sessions backed by chromiumoxide.

use std::time::Duration;

use {
    async_trait::async_trait,
    chromiumoxide::{
        Browser, BrowserConfig as CdpBrowserConfig, Page,
        cdp::browser_protocol::network::{
            Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
        },
    },
    futures::StreamExt,
    tokio::{task::JoinHandle, time::Instant},
    tracing::{debug, info, warn},
};

use crate::{
    detect::{Detection, detect_browser},
    error::BrowserError,
    session::{AutomationSession, SessionLauncher},
    types::LaunchOptions,
};

/// Interval between network-activity probes while waiting for idle.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Reports `[document.readyState, number of resource timing entries]`.
const IDLE_PROBE_JS: &str =
    "[document.readyState, performance.getEntriesByType('resource').length]";

/// Browsers render a JSON document inside a single `<pre>`; newer Chrome
/// versions add a formatter toolbar next to it that must not leak into the text.
const BODY_TEXT_JS: &str = r#"(() => {
    const pre = document.querySelector('body > pre');
    if (pre) return pre.innerText;
    return document.body ? document.body.innerText : '';
})()"#;

/// Launches one headless Chromium per session.
pub struct CdpLauncher {
    options: LaunchOptions,
}

impl CdpLauncher {
    #[must_use]
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl SessionLauncher for CdpLauncher {
    async fn launch(&self) -> Result<Box<dyn AutomationSession>, BrowserError> {
        let session = CdpSession::launch(&self.options).await?;
        Ok(Box::new(session))
    }
}

/// A browser process, its event loop task, and its single page.
pub struct CdpSession {
    id: String,
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    network_idle: Duration,
    /// Ceiling for each teardown step before falling back to a kill.
    close_timeout: Duration,
    closed: bool,
    // Per-session profile so concurrent browsers don't fight over the
    // profile lock. Deleted when the session is dropped.
    _profile_dir: tempfile::TempDir,
}

impl CdpSession {
    async fn launch(options: &LaunchOptions) -> Result<Self, BrowserError> {
        let executable = match detect_browser(options.chrome_path.as_deref()) {
            Detection::Found { path, source } => {
                debug!(path = %path.display(), %source, "resolved browser executable");
                path
            },
            Detection::NotFound { install_hint } => {
                return Err(BrowserError::BrowserNotAvailable(install_hint));
            },
        };

        let profile_dir = tempfile::Builder::new()
            .prefix("nse-relay-profile-")
            .tempdir()
            .map_err(|e| BrowserError::LaunchFailed(format!("failed to create profile dir: {e}")))?;

        let mut builder = CdpBrowserConfig::builder()
            .chrome_executable(&executable)
            .user_data_dir(profile_dir.path())
            .request_timeout(options.request_timeout)
            .args(options.chrome_args());

        // chromiumoxide runs headless unless told otherwise.
        if !options.headless {
            builder = builder.with_head();
        }

        let config = builder.build().map_err(|e| {
            BrowserError::LaunchFailed(format!("failed to build browser config: {e}"))
        })?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let id = generate_session_id();
        let handler_id = id.clone();
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(session_id = handler_id, error = %e, "browser handler error");
                }
            }
            debug!(session_id = handler_id, "browser event handler exited");
        });

        let mut session = Self {
            id,
            browser,
            page: None,
            handler_task,
            network_idle: options.network_idle,
            close_timeout: options.request_timeout,
            closed: false,
            _profile_dir: profile_dir,
        };

        // The process is already running here: a failure to open the page
        // must still tear it down before reporting the error.
        match session.browser.new_page("about:blank").await {
            Ok(page) => session.page = Some(page),
            Err(e) => {
                if let Err(close_err) = session.close().await {
                    warn!(session_id = session.id, error = %close_err, "failed to close browser after page error");
                }
                return Err(BrowserError::LaunchFailed(format!("failed to open page: {e}")));
            },
        }

        info!(
            session_id = session.id,
            executable = %executable.display(),
            headless = options.headless,
            "launched browser session"
        );
        Ok(session)
    }

    fn page(&self) -> Result<&Page, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::SessionReleased)
    }

    /// Poll until the document is complete and no new resource entries have
    /// appeared for the idle window.
    async fn wait_for_network_idle(&self) -> Result<(), BrowserError> {
        let page = self.page()?;
        let mut last_count: Option<u64> = None;
        let mut quiet_since = Instant::now();

        loop {
            let (ready_state, resources): (String, u64) = page
                .evaluate(IDLE_PROBE_JS)
                .await
                .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?
                .into_value()
                .map_err(|e| BrowserError::Cdp(format!("unexpected idle probe result: {e}")))?;

            if last_count != Some(resources) {
                last_count = Some(resources);
                quiet_since = Instant::now();
            } else if ready_state == "complete" && quiet_since.elapsed() >= self.network_idle {
                debug!(session_id = self.id, resources, "network idle");
                return Ok(());
            }

            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl AutomationSession for CdpSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set_extra_headers(
        &mut self,
        headers: &[(String, String)],
    ) -> Result<(), BrowserError> {
        let page = self.page()?;

        // navigator.userAgent should agree with the header the server sees.
        if let Some((_, ua)) = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
        {
            page.execute(SetUserAgentOverrideParams::new(ua.clone()))
                .await?;
        }

        let map: serde_json::Map<String, serde_json::Value> = headers
            .iter()
            .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
            .collect();
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            serde_json::Value::Object(map),
        )))
        .await?;

        debug!(session_id = self.id, count = headers.len(), "extra headers set");
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.page()?
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        self.wait_for_network_idle().await
    }

    async fn body_text(&mut self) -> Result<String, BrowserError> {
        self.page()?
            .evaluate(BODY_TEXT_JS)
            .await
            .map_err(|e| BrowserError::BodyUnavailable(e.to_string()))?
            .into_value::<String>()
            .map_err(|e| BrowserError::BodyUnavailable(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }

        if let Some(page) = self.page.take() {
            match tokio::time::timeout(self.close_timeout, page.close()).await {
                Ok(Ok(())) => {},
                Ok(Err(e)) => {
                    debug!(session_id = self.id, error = %e, "page close failed, closing browser anyway");
                },
                Err(_) => debug!(session_id = self.id, "page close timed out, closing browser anyway"),
            }
        }

        let close_result = match tokio::time::timeout(self.close_timeout, self.browser.close()).await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Cdp(format!("browser did not close cleanly: {e}"))),
            Err(_) => Err(BrowserError::Cdp(format!(
                "browser did not close within {}ms",
                self.close_timeout.as_millis()
            ))),
        };
        if close_result.is_err()
            && let Some(Err(e)) = self.browser.kill().await
        {
            warn!(session_id = self.id, error = %e, "failed to kill browser process");
        }

        // Reap the child so it does not linger as a zombie.
        match tokio::time::timeout(self.close_timeout, self.browser.wait()).await {
            Ok(Ok(_)) => {},
            Ok(Err(e)) => debug!(session_id = self.id, error = %e, "failed to wait for browser exit"),
            Err(_) => warn!(session_id = self.id, "browser process still running after close"),
        }
        self.handler_task.abort();
        self.closed = true;

        close_result
    }
}

impl Drop for CdpSession {
    /// Covers sessions dropped before `close` finished. chromiumoxide kills
    /// a still-running child when its `Browser` is dropped; the event loop
    /// task has to be stopped here.
    fn drop(&mut self) {
        self.handler_task.abort();
        if !self.closed {
            debug!(session_id = self.id, "browser session dropped without a completed close");
        }
    }
}

/// Generate a random session ID.
fn generate_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let id: u64 = rng.random();
    format!("browser-{:016x}", id)
}
