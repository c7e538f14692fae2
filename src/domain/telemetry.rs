use super::metric::MetricKind;
use std::sync::Arc;
use std::time::Instant;

/// Self-observability of the collector server (request latency, applied
/// updates, saver runs). Unrelated to the metrics the server stores.
pub trait Telemetry: Send + Sync + 'static {
    // ---
    /// Render current telemetry in Prometheus text format.
    fn render(&self) -> String;

    /// Record `count` metric writes of the given kind applied to storage.
    fn record_updates(&self, kind: MetricKind, count: usize);

    /// Record a snapshot written by the saver.
    fn record_snapshot_saved(&self, metrics: usize);

    /// Record HTTP request duration and labels.
    fn record_http_request(&self, start: Instant, path: &str, method: &str, status: u16);
}

/// Type alias for any backend that implements Telemetry.
pub type TelemetryPtr = Arc<dyn Telemetry>;
