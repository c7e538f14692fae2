//! Prometheus telemetry.
//!
//! Events go to the global `metrics` registry through the helpers in
//! `counters.rs`; `recorder.rs` owns the handle that renders them.

use crate::domain::{MetricKind, Telemetry};
use std::time::Instant;

/// Prometheus-backed telemetry. Holds no state of its own; the `metrics`
/// facade routes every macro call to the global recorder.
#[derive(Debug, Default)]
pub struct PrometheusTelemetry;

impl PrometheusTelemetry {
    pub fn new() -> Self {
        PrometheusTelemetry
    }
}

impl Telemetry for PrometheusTelemetry {
    // ---
    fn render(&self) -> String {
        super::render_metrics()
    }

    fn record_updates(&self, kind: MetricKind, count: usize) {
        if count > 0 {
            super::add_metric_updates(kind, count);
        }
    }

    fn record_snapshot_saved(&self, metrics: usize) {
        super::track_snapshot_saved(metrics);
    }

    fn record_http_request(&self, start: Instant, path: &str, method: &str, status: u16) {
        super::track_http_request(start, path, method, status);
    }
}
