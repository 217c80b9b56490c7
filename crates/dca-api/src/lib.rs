//! # dca-api: HTTP Service for the Case Engine
//!
//! Axum routes over [`dca_workflow::CaseEngine`]. Each `/v1/*` request is
//! authenticated into a [`dca_core::Principal`], handed to the engine,
//! and written through to Postgres when a pool is configured.
//!
//! ## Layers (outermost first)
//!
//! 1. `TraceLayer` request spans.
//! 2. Prometheus request and error counters.
//! 3. Bearer authentication and profile lookup.
//!
//! `/health/liveness`, `/health/readiness` and `/metrics` sit outside
//! the authenticated router.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod views;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::cases::router())
        .merge(routes::debtors::router())
        .merge(routes::assignments::router())
        .merge(routes::payments::router())
        .merge(routes::actions::router())
        .merge(routes::compliance::router())
        .merge(routes::allocation::router())
        .merge(routes::import::router())
        .merge(routes::profiles::router())
        .merge(routes::worklist::router())
        .merge(openapi::router())
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let open = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(middleware::metrics::render))
        .with_state(state);

    Router::new().merge(open).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}
