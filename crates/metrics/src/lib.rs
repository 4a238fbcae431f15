//! Metrics collection and export for the relay.
//!
//! All instrumentation goes through the `metrics` crate facade. When the
//! `prometheus` feature is enabled, [`init_metrics`] installs a Prometheus
//! recorder whose [`MetricsHandle`] renders the `/metrics` endpoint.
//!
//! ```rust,ignore
//! use nse_relay_metrics::{browser, counter};
//!
//! counter!(browser::SESSIONS_LAUNCHED_TOTAL).increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
