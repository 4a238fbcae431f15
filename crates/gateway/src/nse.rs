//! The NSE historical data endpoint and the browser fingerprint it expects.

use {nse_relay_config::UpstreamConfig, url::Url};

/// Path of the security-wise historical price/volume/delivery report.
pub const HISTORICAL_DATA_PATH: &str = "/api/historicalOR/generateSecurityWiseHistoricalData";

/// A validated historical data query. Dates are `DD-MM-YYYY` by convention;
/// their format is the upstream's concern, not ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoricalQuery<'a> {
    pub symbol: &'a str,
    pub from_date: &'a str,
    pub to_date: &'a str,
}

/// Where to fetch from and which headers make the request look like a browser.
#[derive(Debug, Clone)]
pub struct UpstreamProfile {
    base_url: Url,
    headers: Vec<(String, String)>,
}

impl UpstreamProfile {
    pub fn from_config(cfg: &UpstreamConfig) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&cfg.base_url)?;
        let headers = [
            ("User-Agent", &cfg.user_agent),
            ("Accept", &cfg.accept),
            ("Referer", &cfg.referer),
            ("Accept-Language", &cfg.accept_language),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();

        Ok(Self { base_url, headers })
    }

    /// Headers to install on the page before navigating.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Build the report URL. Every parameter is form-encoded, so symbols such
    /// as `M&M` cannot smuggle extra query parameters.
    #[must_use]
    pub fn historical_url(&self, query: &HistoricalQuery<'_>) -> Url {
        let mut url = self.base_url.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{prefix}{HISTORICAL_DATA_PATH}"));
        url.query_pairs_mut()
            .clear()
            .append_pair("from", query.from_date)
            .append_pair("to", query.to_date)
            .append_pair("symbol", query.symbol)
            .append_pair("type", "priceVolumeDeliverable")
            .append_pair("series", "ALL");
        url
    }
}
