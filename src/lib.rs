// src/lib.rs
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};

use handlers::*;
use middleware::{gzip_bodies, signatures, track_requests};

// Public exports (visible outside this module)
pub mod agent;
pub mod backoff;
pub mod domain;
pub mod infrastructure;
pub mod shutdown;
pub mod signer;

// Internal-only exports (sibling access within this module)
mod app_state;
mod config;
mod handlers;
mod middleware;
mod server;

// Hoist up only the public symbol(s)
pub use app_state::AppState;
pub use config::*;
pub use server::{create_storage, create_telemetry, Server};
pub use signer::Signer;

/// Build the HTTP router.
///
/// Layers, outermost first: request tracking, gzip, signature checks (only
/// when `signer` is set), then the handlers. Signatures are therefore always
/// computed over uncompressed bodies.
pub fn create_router(state: AppState, signer: Option<Signer>) -> Router {
    // ---
    let router = Router::new()
        .route("/", get(root_handler))
        .route("/ping", get(ping))
        .route("/metrics", get(telemetry_handler))
        .route("/updates", post(update_batch))
        .route("/updates/", post(update_batch))
        .route("/update", post(update_json))
        .route("/update/", post(update_json))
        // Truncated path forms share one handler so each gets its own status.
        .route("/update/{kind}", post(update_from_path))
        .route("/update/{kind}/", post(update_from_path))
        .route("/update/{kind}/{name}", post(update_from_path))
        .route("/update/{kind}/{name}/", post(update_from_path))
        .route("/update/{kind}/{name}/{value}", post(update_from_path))
        .route("/value", post(value_as_json))
        .route("/value/", post(value_as_json))
        .route("/value/{kind}/{name}", get(value_as_text));

    let router = match signer {
        Some(signer) => router.layer(from_fn_with_state(signer, signatures)),
        None => router,
    };

    router
        .layer(from_fn(gzip_bodies))
        .layer(from_fn_with_state(state.clone(), track_requests))
        .with_state(state)
}
