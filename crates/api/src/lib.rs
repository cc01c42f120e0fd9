//! HTTP API server with observability for the money transfer service.
//!
//! Provides REST endpoints for starting, observing, approving, and
//! cancelling transfers, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{InMemoryBank, InMemoryNotifier, TransferConfig};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::transfers::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/transfers", post(routes::transfers::create))
        .route("/transfers", get(routes::transfers::list))
        .route("/transfers/{id}", get(routes::transfers::get))
        .route("/transfers/{id}/approve", post(routes::transfers::approve))
        .route("/transfers/{id}/cancel", post(routes::transfers::cancel))
        .route("/transfers/{id}/outcome", get(routes::transfers::outcome))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state with in-memory bank services.
pub fn create_default_state(config: TransferConfig) -> Arc<AppState> {
    Arc::new(AppState {
        bank: InMemoryBank::new(),
        notifier: InMemoryNotifier::new(),
        config,
        transfers: RwLock::new(HashMap::new()),
    })
}
