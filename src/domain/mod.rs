mod metric;
mod snapshot;
mod storage;
mod telemetry;

// Publicly expose the metric data model
pub use metric::{Metric, MetricKind, MetricValue, ValidationError, WireMetric};
pub use snapshot::{MetricKeys, MetricsSnapshot};

// Publicly expose the storage and telemetry abstractions
pub use storage::{MetricsStorage, StoragePtr};
pub use telemetry::{Telemetry, TelemetryPtr};
