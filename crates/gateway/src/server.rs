use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::{Query, State, rejection::QueryRejection},
        http::StatusCode,
        response::{IntoResponse, Json},
        routing::get,
    },
    chrono::{SecondsFormat, Utc},
    nse_relay_config::RelayConfig,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

use crate::{
    error::FetchError,
    fetch::{FetchParams, FetchService},
};

/// Name reported by `/health` and `/`.
pub const SERVICE_NAME: &str = "NSE Scraper API";

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub fetch: Arc<FetchService>,
    #[cfg(feature = "metrics")]
    pub metrics_handle: Option<nse_relay_metrics::MetricsHandle>,
}

impl AppState {
    #[must_use]
    pub fn new(fetch: Arc<FetchService>) -> Self {
        Self {
            fetch,
            #[cfg(feature = "metrics")]
            metrics_handle: None,
        }
    }
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the relay router (shared between production startup and tests).
pub fn build_gateway_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/nse-data", get(nse_data_handler));

    #[cfg(feature = "prometheus")]
    let router = router.route(
        "/metrics",
        get(crate::metrics_routes::prometheus_metrics_handler),
    );

    #[cfg(feature = "metrics")]
    let router = router.layer(axum::middleware::from_fn(
        crate::metrics_middleware::http_metrics_middleware,
    ));

    router
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the relay and serve until SIGINT/SIGTERM, then drain in-flight requests.
pub async fn start_gateway(config: RelayConfig) -> anyhow::Result<()> {
    let fetch = Arc::new(FetchService::from_config(&config)?);

    #[allow(unused_mut)]
    let mut state = AppState::new(Arc::clone(&fetch));

    #[cfg(feature = "metrics")]
    {
        let handle = nse_relay_metrics::init_metrics(nse_relay_metrics::MetricsRecorderConfig {
            enabled: config.metrics.enabled,
        })?;
        state.metrics_handle = handle.is_recording().then_some(handle);
    }

    let app = build_gateway_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .map_err(|e| {
            anyhow::anyhow!(
                "invalid listen address {}:{}: {e}",
                config.server.bind,
                config.server.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        addr = %listener.local_addr()?,
        max_sessions = fetch.gate().capacity(),
        navigation_timeout_ms = config.browser.navigation_timeout_ms,
        "server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received, draining in-flight requests");
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": format!("{SERVICE_NAME} is running"),
        "endpoints": {
            "health": "/health",
            "nseData": "/nse-data?symbol=SYMBOL&fromDate=DD-MM-YYYY&toDate=DD-MM-YYYY",
        },
    }))
}

async fn nse_data_handler(
    State(state): State<AppState>,
    query: Result<Query<FetchParams>, QueryRejection>,
) -> Result<Json<serde_json::Value>, FetchError> {
    let Query(params) = query.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected undecodable query string");
        FetchError::InvalidQuery(rejection.body_text())
    })?;
    let data = state.fetch.handle_fetch(&params).await?;
    Ok(Json(serde_json::json!({ "data": data })))
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}
