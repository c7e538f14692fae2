use crate::domain::{MetricKind, Telemetry};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct NoopTelemetry;

impl NoopTelemetry {
    pub fn new() -> Self {
        NoopTelemetry
    }
}

impl Telemetry for NoopTelemetry {
    // ---
    fn render(&self) -> String {
        String::new()
    }
    fn record_updates(&self, _: MetricKind, _: usize) {}
    fn record_snapshot_saved(&self, _: usize) {}
    fn record_http_request(&self, _: Instant, _: &str, _: &str, _: u16) {}
}
