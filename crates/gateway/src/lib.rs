//! HTTP relay that fetches NSE historical data through a headless browser.
//!
//! Routes:
//! - `GET /health`: liveness and version
//! - `GET /`: endpoint index
//! - `GET /nse-data?symbol=&fromDate=&toDate=`: one browser-backed fetch
//! - `GET /metrics`: Prometheus scrape (feature `prometheus`)

pub mod error;
pub mod fetch;
#[cfg(feature = "metrics")]
pub mod metrics_middleware;
#[cfg(feature = "prometheus")]
pub mod metrics_routes;
pub mod nse;
pub mod server;

pub use {
    error::FetchError,
    fetch::{FetchParams, FetchService},
    nse::{HistoricalQuery, UpstreamProfile},
    server::{AppState, build_gateway_app, start_gateway},
};
