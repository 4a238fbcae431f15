//! Metric name and label definitions.
//!
//! Every metric the relay emits is named here so the exported set is
//! documented in one place.

/// HTTP request metrics
pub mod http {
    /// Total number of HTTP requests handled
    pub const REQUESTS_TOTAL: &str = "nse_relay_http_requests_total";
    /// Duration of HTTP requests in seconds
    pub const REQUEST_DURATION_SECONDS: &str = "nse_relay_http_request_duration_seconds";
    /// Number of currently in-flight HTTP requests
    pub const REQUESTS_IN_FLIGHT: &str = "nse_relay_http_requests_in_flight";
}

/// Browser session lifecycle metrics
pub mod browser {
    /// Browser processes currently alive
    pub const SESSIONS_ACTIVE: &str = "nse_relay_browser_sessions_active";
    /// Total browser processes launched
    pub const SESSIONS_LAUNCHED_TOTAL: &str = "nse_relay_browser_sessions_launched_total";
    /// Total browser processes closed (cleanly or not)
    pub const SESSIONS_CLOSED_TOTAL: &str = "nse_relay_browser_sessions_closed_total";
    /// Launch attempts that failed
    pub const LAUNCH_FAILURES_TOTAL: &str = "nse_relay_browser_launch_failures_total";
    /// Close attempts that reported an error
    pub const RELEASE_FAILURES_TOTAL: &str = "nse_relay_browser_release_failures_total";
    /// Requests turned away by the admission gate
    pub const ADMISSION_REJECTED_TOTAL: &str = "nse_relay_browser_admission_rejected_total";
    /// Time spent waiting for a session slot, in seconds
    pub const ADMISSION_WAIT_SECONDS: &str = "nse_relay_browser_admission_wait_seconds";
}

/// Upstream fetch metrics
pub mod fetch {
    /// Total fetches attempted (after parameter validation)
    pub const REQUESTS_TOTAL: &str = "nse_relay_fetch_requests_total";
    /// End-to-end fetch duration in seconds, launch to parsed body
    pub const DURATION_SECONDS: &str = "nse_relay_fetch_duration_seconds";
    /// Fetch failures by error type
    pub const ERRORS_TOTAL: &str = "nse_relay_fetch_errors_total";
}

/// Common label keys
pub mod labels {
    pub const ENDPOINT: &str = "endpoint";
    pub const METHOD: &str = "method";
    pub const STATUS: &str = "status";
    pub const ERROR_TYPE: &str = "error_type";
}

/// Histogram bucket boundaries
pub mod buckets {
    use once_cell::sync::Lazy;

    /// HTTP request duration buckets (in seconds)
    /// Covers 1ms to 60s
    pub static HTTP_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]
    });

    /// Browser fetch buckets (in seconds)
    /// A cold browser launch alone takes ~0.5-2s; the ceiling is the 60s timeout.
    pub static FETCH_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 7.5, 10.0, 15.0, 20.0, 30.0, 45.0, 60.0, 90.0,
        ]
    });
}
