//! # Prometheus Metrics
//!
//! Request counters recorded through the `metrics` facade and rendered by
//! the Prometheus exporter at `/metrics`. Engine operations record their
//! own counters (`dca_transitions_total`, `dca_payments_total`, ...) into
//! the same recorder.

use axum::extract::{MatchedPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Install the global Prometheus recorder.
///
/// Returns `None` when a recorder is already installed (e.g. a second app
/// built in the same test process).
pub fn install_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder not installed");
            None
        }
    }
}

/// Count every request, and every 4xx/5xx response, by matched route.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = request.method().to_string();

    let response = next.run(request).await;

    let status = response.status();
    metrics::counter!("dca_http_requests_total", "method" => method.clone(), "route" => route.clone())
        .increment(1);
    if status.is_client_error() || status.is_server_error() {
        metrics::counter!(
            "dca_http_errors_total",
            "method" => method,
            "route" => route,
            "status" => status.as_u16().to_string()
        )
        .increment(1);
    }

    response
}

/// GET /metrics: Prometheus text exposition.
pub async fn render(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}
