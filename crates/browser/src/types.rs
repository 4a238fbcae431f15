//! Launch and admission options derived from the relay configuration.

use std::time::Duration;

/// Arguments every launched browser gets.
///
/// The relay runs inside containers without user namespaces, so the
/// sandbox must be off; the rest trims subsystems a JSON fetch never uses.
const BASE_CHROME_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-software-rasterizer",
    "--no-first-run",
    "--no-zygote",
    "--single-process",
    "--disable-web-security",
    "--disable-features=VizDisplayCompositor",
    "--disable-extensions",
    "--disable-background-networking",
    "--mute-audio",
    "--renderer-process-limit=1",
];

/// How a single browser process is launched.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Configured executable path (detection falls back from here).
    pub chrome_path: Option<String>,
    pub headless: bool,
    /// Default timeout for every CDP command the session issues.
    pub request_timeout: Duration,
    /// Quiescence window after which the network is considered idle.
    pub network_idle: Duration,
    /// V8 heap ceiling in megabytes (0 leaves the browser default).
    pub js_heap_limit_mb: u32,
    /// Extra arguments appended after the built-in ones.
    pub extra_args: Vec<String>,
}

impl LaunchOptions {
    /// Full argument list passed to the browser executable.
    #[must_use]
    pub fn chrome_args(&self) -> Vec<String> {
        let mut args: Vec<String> = BASE_CHROME_ARGS.iter().map(|a| (*a).to_string()).collect();
        if self.js_heap_limit_mb > 0 {
            args.push(format!(
                "--js-flags=--max-old-space-size={}",
                self.js_heap_limit_mb
            ));
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::from(&nse_relay_config::BrowserConfig::default())
    }
}

impl From<&nse_relay_config::BrowserConfig> for LaunchOptions {
    fn from(cfg: &nse_relay_config::BrowserConfig) -> Self {
        Self {
            chrome_path: cfg.chrome_path.clone(),
            headless: cfg.headless,
            request_timeout: Duration::from_millis(cfg.navigation_timeout_ms),
            network_idle: Duration::from_millis(cfg.network_idle_ms),
            js_heap_limit_mb: cfg.js_heap_limit_mb,
            extra_args: cfg.chrome_args.clone(),
        }
    }
}

/// Admission limits for concurrently live sessions.
#[derive(Debug, Clone)]
pub struct GateOptions {
    /// Maximum number of browser processes alive at once.
    pub max_sessions: usize,
    /// How long to wait for a free slot before giving up.
    pub admission_timeout: Duration,
    /// Host memory usage (percent) at or above which launches are refused.
    /// 100 disables the check.
    pub memory_limit_percent: u8,
    /// Ceiling on closing a session. Past it the process is killed and the
    /// slot is returned anyway.
    pub release_timeout: Duration,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self::from(&nse_relay_config::BrowserConfig::default())
    }
}

impl From<&nse_relay_config::BrowserConfig> for GateOptions {
    fn from(cfg: &nse_relay_config::BrowserConfig) -> Self {
        Self {
            max_sessions: cfg.max_concurrent_sessions.max(1),
            admission_timeout: Duration::from_millis(cfg.admission_timeout_ms),
            memory_limit_percent: cfg.memory_limit_percent,
            release_timeout: Duration::from_millis(cfg.navigation_timeout_ms),
        }
    }
}
