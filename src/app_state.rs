//! Application state management.
//!
//! `AppState` is the dependency injection container handed to every Axum
//! handler through the `State` extractor. It is built once at startup and
//! cloned per request; every heavy resource sits behind an `Arc`.

use crate::domain::{MetricKind, MetricsSnapshot, StoragePtr, TelemetryPtr};
use crate::infrastructure::{SavePolicy, StorageSaver};
use std::sync::Arc;

/// Saver plus the policy deciding when it runs.
struct Persistence {
    saver: StorageSaver,
    policy: SavePolicy,
}

/// Shared application state passed to all Axum handlers.
///
/// - `storage`: metric storage, already wrapped in the retry decorator for
///   remote backends
/// - `telemetry`: self-observability (Prometheus or no-op)
/// - `persistence`: optional snapshot saver with its trigger policy
#[derive(Clone)]
pub struct AppState {
    // ---
    storage: StoragePtr,
    telemetry: TelemetryPtr,
    persistence: Option<Arc<Persistence>>,
}

impl AppState {
    // ---
    pub fn new(storage: StoragePtr, telemetry: TelemetryPtr) -> Self {
        // ---
        AppState {
            storage,
            telemetry,
            persistence: None,
        }
    }

    /// Attaches a saver that runs after updates according to `policy`.
    pub fn with_saver(mut self, saver: StorageSaver, policy: SavePolicy) -> Self {
        // ---
        self.persistence = Some(Arc::new(Persistence { saver, policy }));
        self
    }

    pub fn storage(&self) -> &StoragePtr {
        &self.storage
    }

    pub fn telemetry(&self) -> &TelemetryPtr {
        &self.telemetry
    }

    pub fn saver(&self) -> Option<&StorageSaver> {
        self.persistence.as_deref().map(|p| &p.saver)
    }

    /// Bookkeeping after a successful write: telemetry, then a save if the
    /// policy says one is due.
    ///
    /// Save failures are logged, never returned; the update itself already
    /// succeeded.
    pub async fn after_update(&self, applied: &MetricsSnapshot) {
        // ---
        self.telemetry.record_updates(MetricKind::Gauge, applied.gauges.len());
        self.telemetry.record_updates(MetricKind::Counter, applied.counters.len());

        let Some(persistence) = self.persistence.as_deref() else {
            return;
        };

        if persistence.policy.claim_due() {
            self.save(&persistence.saver).await;
        }
    }

    /// Unconditional save, used at shutdown.
    pub async fn flush(&self) {
        // ---
        if let Some(saver) = self.saver() {
            self.save(saver).await;
        }
    }

    async fn save(&self, saver: &StorageSaver) {
        // ---
        match saver.save().await {
            Ok(records) => self.telemetry.record_snapshot_saved(records),
            Err(err) => tracing::warn!(path = %saver.path().display(), "Snapshot save failed: {err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::domain::MetricsStorage;
    use crate::infrastructure::{create_noop_telemetry, MemStorage};
    use std::time::Duration;

    #[tokio::test]
    async fn zero_interval_saves_after_every_update() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let storage: StoragePtr = Arc::new(MemStorage::new());
        let saver = StorageSaver::open(storage.clone(), &path).await.unwrap();

        let state = AppState::new(storage.clone(), create_noop_telemetry().unwrap())
            .with_saver(saver, SavePolicy::new(Duration::ZERO));

        storage.set_counter("PollCount", 1).await.unwrap();
        state.after_update(&MetricsSnapshot::new()).await;
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);

        storage.set_gauge("Alloc", 2.0).await.unwrap();
        state.after_update(&MetricsSnapshot::new()).await;
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[tokio::test]
    async fn throttled_policy_defers_to_flush() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let storage: StoragePtr = Arc::new(MemStorage::new());
        let saver = StorageSaver::open(storage.clone(), &path).await.unwrap();

        let state = AppState::new(storage.clone(), create_noop_telemetry().unwrap())
            .with_saver(saver, SavePolicy::new(Duration::from_secs(300)));

        storage.set_gauge("Alloc", 2.0).await.unwrap();
        state.after_update(&MetricsSnapshot::new()).await;
        assert!(std::fs::read_to_string(&path).unwrap().is_empty());

        state.flush().await;
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn state_without_saver_is_cloneable_and_quiet() {
        // ---
        let state = AppState::new(Arc::new(MemStorage::new()), create_noop_telemetry().unwrap());
        let cloned = state.clone();

        assert!(cloned.saver().is_none());
        cloned.after_update(&MetricsSnapshot::new()).await;
        cloned.flush().await;
    }
}
