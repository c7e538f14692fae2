use crate::app_state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// Logs every request and feeds its latency to telemetry.
///
/// Telemetry is labelled with the matched route template, not the raw path,
/// so metric names embedded in URLs do not create new label sets.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    // ---
    let start = Instant::now();
    let method = req.method().clone();
    let uri_path = req.uri().path().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;
    let status = response.status();

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    if status.is_server_error() {
        tracing::error!(%method, path = %uri_path, status = status.as_u16(), elapsed_ms, "request failed");
    } else {
        tracing::info!(%method, path = %uri_path, status = status.as_u16(), elapsed_ms, "request");
    }

    state
        .telemetry()
        .record_http_request(start, &route, method.as_str(), status.as_u16());

    response
}
