mod counters;
mod prometheus_telemetry;
mod recorder;

pub use prometheus_telemetry::PrometheusTelemetry;
use std::sync::Arc;

// Re-export utilities for internal use within this module
pub(crate) use counters::{add_metric_updates, track_http_request, track_snapshot_saved};
pub(crate) use recorder::{init_metrics, render_metrics};

/// Creates Prometheus telemetry, installing the global recorder on first use.
pub fn create() -> anyhow::Result<crate::domain::TelemetryPtr> {
    tracing::info!("Initializing Prometheus telemetry");
    init_metrics()?;

    Ok(Arc::new(PrometheusTelemetry::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MetricKind;
    use std::time::Instant;

    #[test]
    fn create_is_repeatable_and_renders_recorded_events() {
        // ---
        let telemetry = create().unwrap();
        let again = create().unwrap();

        telemetry.record_updates(MetricKind::Counter, 3);
        again.record_snapshot_saved(2);
        telemetry.record_http_request(Instant::now(), "/updates", "POST", 200);

        let text = telemetry.render();
        assert!(text.contains("metric_updates_total"), "{text}");
        assert!(text.contains("snapshots_saved_total"), "{text}");
        assert!(text.contains("http_requests_total"), "{text}");
    }
}
