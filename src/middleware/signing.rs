use super::MAX_BODY_BYTES;
use crate::signer::{Signer, SIGNATURE_HEADER};
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Verifies `HashSHA256` on incoming bodies and signs outgoing ones.
///
/// Installed only when a key is configured. Runs inside the gzip layer, so
/// both directions see uncompressed bytes. A request without the header is
/// let through; a request whose header does not match is rejected with 400.
pub async fn signatures(State(signer): State<Signer>, req: Request, next: Next) -> Response {
    // ---
    let (parts, body) = req.into_parts();
    let payload = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, format!("failed to read request body: {err}")).into_response()
        }
    };

    match parts.headers.get(SIGNATURE_HEADER) {
        Some(value) => {
            let valid = value
                .to_str()
                .map(|signature| signer.verify(signature, &payload))
                .unwrap_or(false);

            if !valid {
                tracing::warn!(path = %parts.uri.path(), "Request signature mismatch");
                return (StatusCode::BAD_REQUEST, "signature mismatch").into_response();
            }
        }
        None if !payload.is_empty() => {
            tracing::debug!(path = %parts.uri.path(), "Unsigned request body accepted");
        }
        None => {}
    }

    let response = next.run(Request::from_parts(parts, Body::from(payload))).await;
    sign_response(&signer, response).await
}

async fn sign_response(signer: &Signer, response: Response) -> Response {
    // ---
    let (mut parts, body) = response.into_parts();
    let payload = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("Failed to buffer response body: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !payload.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&signer.sign(&payload)) {
            parts.headers.insert(SIGNATURE_HEADER, value);
        }
    }

    Response::from_parts(parts, Body::from(payload))
}
