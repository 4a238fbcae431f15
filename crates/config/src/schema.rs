//! Config schema types (server, runtime, browser, upstream, metrics).

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub runtime: RuntimeConfig,
    pub browser: BrowserConfig,
    pub upstream: UpstreamConfig,
    pub metrics: MetricsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0".
    pub bind: String,
    /// Port to listen on. Defaults to 3000.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// Tokio runtime sizing, applied once when the process starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of async worker threads.
    pub worker_threads: usize,
    /// Upper bound on the blocking thread pool.
    pub max_blocking_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            max_blocking_threads: 16,
        }
    }
}

/// Headless browser launch and lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Path to the Chrome/Chromium binary. Falls back to `/usr/bin/chromium`,
    /// then to a `PATH` lookup.
    pub chrome_path: Option<String>,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Ceiling for every automation step (navigation, waits), in milliseconds.
    pub navigation_timeout_ms: u64,
    /// Quiescence window used to decide the network is idle, in milliseconds.
    pub network_idle_ms: u64,
    /// Maximum number of browser processes alive at once.
    pub max_concurrent_sessions: usize,
    /// How long a request may wait for a free session slot, in milliseconds.
    pub admission_timeout_ms: u64,
    /// System memory usage threshold (0-100) above which launches are refused.
    pub memory_limit_percent: u8,
    /// V8 heap ceiling passed to the browser, in megabytes.
    pub js_heap_limit_mb: u32,
    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            navigation_timeout_ms: 60_000,
            network_idle_ms: 500,
            max_concurrent_sessions: 2,
            admission_timeout_ms: 30_000,
            memory_limit_percent: 90,
            js_heap_limit_mb: 256,
            chrome_args: Vec::new(),
        }
    }
}

/// Remote NSE endpoint and the browser fingerprint it expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin of the remote API, without a trailing path.
    pub base_url: String,
    pub user_agent: String,
    pub accept: String,
    pub referer: String,
    pub accept_language: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.nseindia.com".into(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .into(),
            accept: "application/json".into(),
            referer: "https://www.nseindia.com/".into(),
            accept_language: "en-US,en;q=0.9".into(),
        }
    }
}

/// Metrics collection toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_expectations() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.server.bind, "0.0.0.0");
        assert_eq!(cfg.browser.navigation_timeout_ms, 60_000);
        assert!(cfg.browser.headless);
        assert!(cfg.browser.chrome_path.is_none());
        assert_eq!(cfg.upstream.accept, "application/json");
        assert!(cfg.upstream.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: RelayConfig = toml::from_str(
            r#"
            [browser]
            max_concurrent_sessions = 8
            "#,
        )
        .unwrap();
        assert_eq!(cfg.browser.max_concurrent_sessions, 8);
        assert_eq!(cfg.browser.network_idle_ms, 500);
        assert_eq!(cfg.server.port, 3000);
    }
}
