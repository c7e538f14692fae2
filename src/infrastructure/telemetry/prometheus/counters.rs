use crate::domain::MetricKind;
use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Count gauge/counter writes applied to storage.
pub fn add_metric_updates(kind: MetricKind, count: usize) {
    counter!("metric_updates_total", "kind" => kind.as_str()).increment(count as u64);
}

/// Count saver runs and remember the size of the latest snapshot.
pub fn track_snapshot_saved(metrics: usize) {
    counter!("snapshots_saved_total").increment(1);
    gauge!("snapshot_metrics").set(metrics as f64);
}

/// Track HTTP request count and latency.
pub fn track_http_request(start: Instant, path: &str, method: &str, status: u16) {
    // ---
    let elapsed = start.elapsed();
    let (path, method) = (path.to_string(), method.to_string());

    counter!(
        "http_requests_total",
        "path" => path.clone(),
        "method" => method.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "path" => path, "method" => method).record(elapsed);
}
