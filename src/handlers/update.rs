use super::shared_types::{parse_json, ApiError};
use crate::app_state::AppState;
use crate::domain::{Metric, MetricKind, MetricValue, MetricsSnapshot, ValidationError, WireMetric};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use std::collections::HashMap;

/// `POST /updates`: applies a JSON array of records as one batch.
///
/// Every record is validated before anything is written. The response holds
/// the post-merge value of each submitted name.
#[tracing::instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn update_batch(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<WireMetric>>, ApiError> {
    // ---
    let records: Vec<WireMetric> = parse_json(&body)?;
    let batch = MetricsSnapshot::from_wire(records)?;

    state.storage().set_many(&batch).await?;
    let updated = state.storage().get_many(&batch.keys()).await?;

    tracing::debug!(gauges = batch.gauges.len(), counters = batch.counters.len(), "Batch applied");
    state.after_update(&batch).await;

    Ok(Json(updated.to_wire()))
}

/// `POST /update`: applies a single JSON record and returns its new value.
#[tracing::instrument(skip(state, body))]
pub async fn update_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WireMetric>, ApiError> {
    // ---
    let record: WireMetric = parse_json(&body)?;
    let metric = Metric::try_from(record)?;
    let current = apply(&state, metric).await?;

    Ok(Json(WireMetric::from(current)))
}

/// `POST /update/{kind}/{name}/{value}` and its truncated forms.
///
/// - unknown kind: `400`
/// - missing name: `404`
/// - missing or unparsable value: `400`
#[tracing::instrument(skip(state))]
pub async fn update_from_path(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    // ---
    let kind: MetricKind = params.get("kind").map(String::as_str).unwrap_or_default().parse()?;

    let name = params
        .get("name")
        .filter(|name| !name.is_empty())
        .ok_or(ValidationError::MissingName)?;

    let raw = params
        .get("value")
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ValidationError::MissingValue {
            kind,
            name: name.clone(),
        })?;

    let metric = Metric {
        name: name.clone(),
        value: MetricValue::parse(kind, raw)?,
    };
    apply(&state, metric).await?;

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], ""))
}

/// Writes one metric and reads back its merged value.
async fn apply(state: &AppState, metric: Metric) -> Result<Metric, ApiError> {
    // ---
    let storage = state.storage();
    let current = match metric.value {
        MetricValue::Gauge(v) => {
            storage.set_gauge(&metric.name, v).await?;
            storage.get_gauge(&metric.name).await?.map(MetricValue::Gauge)
        }
        MetricValue::Counter(d) => {
            storage.set_counter(&metric.name, d).await?;
            storage.get_counter(&metric.name).await?.map(MetricValue::Counter)
        }
    };

    let Some(value) = current else {
        return Err(ApiError::Internal(anyhow::anyhow!(
            "{} {:?} missing right after write",
            metric.value.kind(),
            metric.name
        )));
    };

    let applied: MetricsSnapshot = std::iter::once(metric.clone()).collect();
    state.after_update(&applied).await;

    Ok(Metric {
        name: metric.name,
        value,
    })
}
