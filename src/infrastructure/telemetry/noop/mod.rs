mod noop_telemetry;

pub use noop_telemetry::NoopTelemetry;
use std::sync::Arc;

/// Creates a telemetry sink that ignores every event.
///
/// Used when `METRICS_EXPORTER` is not `prom`, and by tests.
pub fn create() -> anyhow::Result<crate::domain::TelemetryPtr> {
    Ok(Arc::new(NoopTelemetry::new()))
}
