use super::shared_types::{parse_json, ApiError};
use crate::app_state::AppState;
use crate::domain::{MetricKind, MetricValue, StoragePtr, WireMetric};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};

async fn lookup(storage: &StoragePtr, kind: MetricKind, name: &str) -> Result<MetricValue, ApiError> {
    // ---
    let value = match kind {
        MetricKind::Gauge => storage.get_gauge(name).await?.map(MetricValue::Gauge),
        MetricKind::Counter => storage.get_counter(name).await?.map(MetricValue::Counter),
    };

    value.ok_or_else(|| ApiError::NotFound(format!("{kind} {name:?} not found")))
}

/// `GET /value/{kind}/{name}`: the current value as plain text.
#[tracing::instrument(skip(state))]
pub async fn value_as_text(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    // ---
    let kind: MetricKind = kind.parse()?;
    let value = lookup(state.storage(), kind, &name).await?;

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], value.to_string()))
}

/// `POST /value`: fills in `value` or `delta` of the requested record.
#[tracing::instrument(skip(state, body))]
pub async fn value_as_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WireMetric>, ApiError> {
    // ---
    let mut record: WireMetric = parse_json(&body)?;
    if record.id.is_empty() {
        return Err(ApiError::BadRequest("metric name is missing".to_string()));
    }

    match lookup(state.storage(), record.kind, &record.id).await? {
        MetricValue::Gauge(v) => {
            record.value = Some(v);
            record.delta = None;
        }
        MetricValue::Counter(d) => {
            record.delta = Some(d);
            record.value = None;
        }
    }

    Ok(Json(record))
}
