use axum::{
    body::{to_bytes, Body, Bytes},
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{Read, Write};

/// Upper bound for a request body, compressed or not.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Gzip handling for both directions.
///
/// Requests with `Content-Encoding: gzip` are inflated before anything else
/// sees them. JSON and HTML responses are deflated when the client sends
/// `Accept-Encoding: gzip`.
pub async fn gzip_bodies(req: Request, next: Next) -> Response {
    // ---
    let req = match inflate_request(req).await {
        Ok(req) => req,
        Err(response) => return response,
    };

    let wants_gzip = accepts_gzip(req.headers());
    let response = next.run(req).await;

    if wants_gzip && is_compressible(&response) {
        deflate_response(response).await
    } else {
        response
    }
}

fn has_gzip_encoding(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"))
}

fn accepts_gzip(headers: &HeaderMap) -> bool {
    // ---
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|coding| coding.split(';').next())
        .any(|coding| coding.trim().eq_ignore_ascii_case("gzip"))
}

fn is_compressible(response: &Response) -> bool {
    // ---
    if !response.status().is_success() || response.headers().contains_key(header::CONTENT_ENCODING) {
        return false;
    }

    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json") || ct.starts_with("text/html"))
}

async fn inflate_request(req: Request) -> Result<Request, Response> {
    // ---
    if !has_gzip_encoding(req.headers()) {
        return Ok(req);
    }

    let (mut parts, body) = req.into_parts();
    let compressed = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|err| bad_request(format!("failed to read request body: {err}")))?;

    let mut decoded = Vec::new();
    GzDecoder::new(compressed.as_ref())
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_end(&mut decoded)
        .map_err(|err| bad_request(format!("invalid gzip body: {err}")))?;

    if decoded.len() > MAX_BODY_BYTES {
        return Err(bad_request("decompressed body too large".to_string()));
    }

    parts.headers.remove(header::CONTENT_ENCODING);
    parts.headers.remove(header::CONTENT_LENGTH);

    Ok(Request::from_parts(parts, Body::from(decoded)))
}

async fn deflate_response(response: Response) -> Response {
    // ---
    let (mut parts, body) = response.into_parts();
    let plain = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("Failed to buffer response body: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if plain.is_empty() {
        return Response::from_parts(parts, Body::empty());
    }

    match gzip(&plain) {
        Ok(compressed) => {
            parts.headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            parts.headers.remove(header::CONTENT_LENGTH);
            parts.headers.append(header::VARY, HeaderValue::from_static("accept-encoding"));
            Response::from_parts(parts, Body::from(compressed))
        }
        Err(err) => {
            tracing::warn!("Response compression failed, sending identity: {err}");
            Response::from_parts(parts, Body::from(plain))
        }
    }
}

fn gzip(plain: &Bytes) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(plain.len() / 2), Compression::default());
    encoder.write_all(plain)?;
    encoder.finish()
}

fn bad_request(message: String) -> Response {
    tracing::warn!("{message}");
    (StatusCode::BAD_REQUEST, message).into_response()
}
