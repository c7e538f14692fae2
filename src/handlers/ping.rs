use crate::app_state::AppState;
use axum::{extract::State, http::StatusCode};

/// Liveness of the storage backend.
///
/// - `200 OK` when `ping` succeeds
/// - `500 INTERNAL SERVER ERROR` otherwise
pub async fn ping(State(state): State<AppState>) -> StatusCode {
    // ---
    match state.storage().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::error!("Storage ping failed: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
