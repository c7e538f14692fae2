use super::snapshot::{MetricKeys, MetricsSnapshot};
use anyhow::Result;
use std::sync::Arc;

/// System of record for current metric values.
///
/// Implementations must keep the two merge rules: `set_gauge` replaces the
/// stored value, `set_counter` adds the delta to it (absent counts as zero).
/// Reads of absent metrics return `Ok(None)`, never an error.
#[async_trait::async_trait]
pub trait MetricsStorage: Send + Sync {
    // ---
    /// Current value of a gauge.
    async fn get_gauge(&self, name: &str) -> Result<Option<f64>>;

    /// Current total of a counter.
    async fn get_counter(&self, name: &str) -> Result<Option<i64>>;

    /// Values of the requested names; absent names are omitted.
    async fn get_many(&self, keys: &MetricKeys) -> Result<MetricsSnapshot>;

    /// Consistent copy of everything stored.
    async fn get_all(&self) -> Result<MetricsSnapshot>;

    /// Overwrite a gauge.
    async fn set_gauge(&self, name: &str, value: f64) -> Result<()>;

    /// Add `delta` to a counter.
    async fn set_counter(&self, name: &str, delta: i64) -> Result<()>;

    /// Apply a whole batch. No other batch may observe or interleave with a
    /// half-applied one.
    async fn set_many(&self, items: &MetricsSnapshot) -> Result<()>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}

/// Type alias for any backend that implements MetricsStorage.
pub type StoragePtr = Arc<dyn MetricsStorage>;
