//! Semantic checks on a loaded [`RelayConfig`].
//!
//! Parsing already rejects type errors; this catches values that parse fine
//! but would make the relay hang, refuse every request, or talk to nothing.

use crate::schema::RelayConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "browser.navigation_timeout_ms"
    pub path: &'static str,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn error(&mut self, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            path,
            message: message.into(),
        });
    }

    fn warning(&mut self, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            path,
            message: message.into(),
        });
    }
}

/// Validate a loaded configuration.
#[must_use]
pub fn validate(config: &RelayConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.runtime.worker_threads == 0 {
        result.error("runtime.worker_threads", "must be at least 1");
    }
    if config.runtime.max_blocking_threads == 0 {
        result.error("runtime.max_blocking_threads", "must be at least 1");
    }

    let browser = &config.browser;
    if browser.navigation_timeout_ms == 0 {
        result.error("browser.navigation_timeout_ms", "must be greater than 0");
    }
    if browser.network_idle_ms >= browser.navigation_timeout_ms {
        result.warning(
            "browser.network_idle_ms",
            "idle window is not shorter than the navigation timeout; every fetch will time out",
        );
    }
    if browser.max_concurrent_sessions == 0 {
        result.error(
            "browser.max_concurrent_sessions",
            "must be at least 1, otherwise no request can launch a browser",
        );
    }
    if browser.admission_timeout_ms == 0 {
        result.warning(
            "browser.admission_timeout_ms",
            "0 rejects requests immediately whenever all session slots are busy",
        );
    }
    if browser.memory_limit_percent == 0 || browser.memory_limit_percent > 100 {
        result.error(
            "browser.memory_limit_percent",
            format!("{} is outside 1..=100", browser.memory_limit_percent),
        );
    }
    if !browser.headless {
        result.warning(
            "browser.headless",
            "headed mode needs a display server and is meant for local debugging",
        );
    }

    match url::Url::parse(&config.upstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {},
        Ok(url) => result.error(
            "upstream.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        ),
        Err(e) => result.error("upstream.base_url", format!("not a valid URL: {e}")),
    }
    if config.upstream.user_agent.trim().is_empty() {
        result.warning(
            "upstream.user_agent",
            "empty user agent; the upstream rejects clients without a browser fingerprint",
        );
    }

    result
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_clean() {
        let result = validate(&RelayConfig::default());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn zero_concurrency_is_an_error() {
        let mut cfg = RelayConfig::default();
        cfg.browser.max_concurrent_sessions = 0;
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "browser.max_concurrent_sessions")
        );
    }

    #[test]
    fn bad_base_url_is_an_error() {
        let mut cfg = RelayConfig::default();
        cfg.upstream.base_url = "ftp://example.com".into();
        assert!(validate(&cfg).has_errors());

        cfg.upstream.base_url = "not a url".into();
        assert!(validate(&cfg).has_errors());
    }

    #[test]
    fn idle_window_longer_than_timeout_warns() {
        let mut cfg = RelayConfig::default();
        cfg.browser.navigation_timeout_ms = 100;
        cfg.browser.network_idle_ms = 500;
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn memory_percent_out_of_range() {
        let mut cfg = RelayConfig::default();
        cfg.browser.memory_limit_percent = 120;
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 1);
        assert!(result.diagnostics[0].to_string().starts_with("error: browser.memory_limit_percent"));
    }
}
