//! The fetch pipeline: validate, open a session, fetch, parse, release.

use std::{future::Future, sync::Arc, time::Duration};

use {
    nse_relay_browser::{
        BrowserError, CdpLauncher, GateOptions, LaunchOptions, SessionGate, SessionGuard,
        SessionLauncher,
    },
    nse_relay_config::RelayConfig,
    serde::Deserialize,
    serde_json::Value,
    tokio::time::Instant,
    tracing::{debug, info, warn},
};

use crate::{
    error::FetchError,
    nse::{HistoricalQuery, UpstreamProfile},
};

/// Raw query parameters of `GET /nse-data`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchParams {
    pub symbol: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

impl FetchParams {
    /// All three parameters, present and non-empty.
    pub fn validate(&self) -> Result<HistoricalQuery<'_>, FetchError> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }
        match (
            present(&self.symbol),
            present(&self.from_date),
            present(&self.to_date),
        ) {
            (Some(symbol), Some(from_date), Some(to_date)) => Ok(HistoricalQuery {
                symbol,
                from_date,
                to_date,
            }),
            _ => Err(FetchError::MissingParameter),
        }
    }
}

/// Opens one session per request and turns upstream JSON into a value.
pub struct FetchService {
    launcher: Arc<dyn SessionLauncher>,
    gate: SessionGate,
    upstream: UpstreamProfile,
    step_timeout: Duration,
}

impl FetchService {
    #[must_use]
    pub fn new(
        launcher: Arc<dyn SessionLauncher>,
        gate: SessionGate,
        upstream: UpstreamProfile,
        step_timeout: Duration,
    ) -> Self {
        Self {
            launcher,
            gate,
            upstream,
            step_timeout,
        }
    }

    /// Wire the chromiumoxide launcher and admission gate from config.
    pub fn from_config(config: &RelayConfig) -> anyhow::Result<Self> {
        let upstream = UpstreamProfile::from_config(&config.upstream).map_err(|e| {
            anyhow::anyhow!("invalid upstream.base_url '{}': {e}", config.upstream.base_url)
        })?;
        Ok(Self::new(
            Arc::new(CdpLauncher::new(LaunchOptions::from(&config.browser))),
            SessionGate::new(GateOptions::from(&config.browser)),
            upstream,
            Duration::from_millis(config.browser.navigation_timeout_ms),
        ))
    }

    #[must_use]
    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    /// Fetch the historical report for `params`.
    ///
    /// Parameter validation happens before any slot or process is claimed.
    /// Once a session is open it is released before this returns, whatever
    /// the outcome.
    pub async fn handle_fetch(&self, params: &FetchParams) -> Result<Value, FetchError> {
        let query = params.validate()?;
        let url = self.upstream.historical_url(&query);
        let started = Instant::now();

        info!(
            symbol = query.symbol,
            from = query.from_date,
            to = query.to_date,
            "fetching historical data"
        );

        let result = self.fetch_url(url.as_str()).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        #[cfg(feature = "metrics")]
        {
            use nse_relay_metrics::{counter, fetch, histogram, labels};

            counter!(fetch::REQUESTS_TOTAL).increment(1);
            histogram!(fetch::DURATION_SECONDS).record(started.elapsed().as_secs_f64());
            if let Err(ref e) = result {
                counter!(fetch::ERRORS_TOTAL, labels::ERROR_TYPE => e.kind()).increment(1);
            }
        }

        match &result {
            Ok(_) => info!(symbol = query.symbol, duration_ms, "fetch succeeded"),
            Err(e) => warn!(
                symbol = query.symbol,
                duration_ms,
                kind = e.kind(),
                error = %e,
                "error fetching NSE data"
            ),
        }
        result
    }

    async fn fetch_url(&self, url: &str) -> Result<Value, FetchError> {
        let mut guard = self
            .gate
            .open(self.launcher.as_ref())
            .await
            .map_err(FetchError::from_open)?;
        debug!(session_id = guard.id(), url, "session opened");

        let outcome = self.drive(&mut guard, url).await;
        guard.release().await;
        outcome
    }

    async fn drive(&self, guard: &mut SessionGuard, url: &str) -> Result<Value, FetchError> {
        let headers = self.upstream.headers();
        self.step("header setup", guard.session()?.set_extra_headers(headers))
            .await?;
        self.step("navigation", guard.session()?.navigate(url))
            .await?;
        let body = self
            .step("body read", guard.session()?.body_text())
            .await?;

        serde_json::from_str(&body).map_err(FetchError::Parse)
    }

    /// Run one automation step under the per-step ceiling.
    async fn step<T>(
        &self,
        step: &'static str,
        fut: impl Future<Output = Result<T, BrowserError>>,
    ) -> Result<T, FetchError> {
        match tokio::time::timeout(self.step_timeout, fut).await {
            Ok(result) => result.map_err(FetchError::Browser),
            Err(_elapsed) => Err(FetchError::Timeout {
                step,
                after_ms: self.step_timeout.as_millis() as u64,
            }),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn params(symbol: Option<&str>, from: Option<&str>, to: Option<&str>) -> FetchParams {
        FetchParams {
            symbol: symbol.map(String::from),
            from_date: from.map(String::from),
            to_date: to.map(String::from),
        }
    }

    #[test]
    fn validate_accepts_all_present() {
        let p = params(Some("SBIN"), Some("01-01-2024"), Some("31-01-2024"));
        let q = p.validate().unwrap();
        assert_eq!(q.symbol, "SBIN");
        assert_eq!(q.from_date, "01-01-2024");
        assert_eq!(q.to_date, "31-01-2024");
    }

    #[test]
    fn validate_rejects_missing_or_empty() {
        let cases = [
            params(None, Some("01-01-2024"), Some("31-01-2024")),
            params(Some("SBIN"), None, Some("31-01-2024")),
            params(Some("SBIN"), Some("01-01-2024"), None),
            params(Some(""), Some("01-01-2024"), Some("31-01-2024")),
            params(None, None, None),
        ];
        for p in cases {
            assert!(
                matches!(p.validate(), Err(FetchError::MissingParameter)),
                "{p:?}"
            );
        }
    }

    #[test]
    fn params_deserialize_from_camel_case() {
        let p: FetchParams =
            serde_json::from_str(r#"{"symbol":"SBIN","fromDate":"01-01-2024","toDate":"31-01-2024"}"#)
                .unwrap();
        assert!(p.validate().is_ok());
    }

    #[test]
    fn from_config_rejects_bad_upstream() {
        let mut cfg = RelayConfig::default();
        cfg.upstream.base_url = "::".into();
        assert!(FetchService::from_config(&cfg).is_err());
    }
}
