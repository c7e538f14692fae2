use crate::app_state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};

/// Handler for the `/metrics` endpoint.
///
/// Returns the server's own telemetry in Prometheus text format. The body is
/// empty when the no-op recorder is configured.
pub async fn telemetry_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    // ---
    let text = app_state.telemetry().render();

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        text,
    )
}
