use crate::backoff::Backoff;
use crate::domain::{MetricKeys, MetricsSnapshot, MetricsStorage, StoragePtr};
use anyhow::Result;

/// Decorator that re-runs failed storage calls through a [`Backoff`].
///
/// It forwards inputs and outputs untouched; merge rules stay in the wrapped
/// backend. Backends classify as retryable only failures that happen before
/// a command reaches the server, so a replayed counter write is never
/// applied twice.
pub struct RetryableStorage {
    // ---
    inner: StoragePtr,
    backoff: Backoff,
}

impl RetryableStorage {
    // ---
    /// Wraps `inner` with the standard schedule and a backend-specific
    /// classifier of transient errors.
    pub fn new<F>(inner: StoragePtr, is_retryable: F) -> Self
    where
        F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    {
        Self::with_backoff(inner, Backoff::standard().with_classifier(is_retryable))
    }

    pub fn with_backoff(inner: StoragePtr, backoff: Backoff) -> Self {
        Self { inner, backoff }
    }
}

#[async_trait::async_trait]
impl MetricsStorage for RetryableStorage {
    // ---
    async fn get_gauge(&self, name: &str) -> Result<Option<f64>> {
        self.backoff.retry(|| self.inner.get_gauge(name)).await
    }

    async fn get_counter(&self, name: &str) -> Result<Option<i64>> {
        self.backoff.retry(|| self.inner.get_counter(name)).await
    }

    async fn get_many(&self, keys: &MetricKeys) -> Result<MetricsSnapshot> {
        self.backoff.retry(|| self.inner.get_many(keys)).await
    }

    async fn get_all(&self) -> Result<MetricsSnapshot> {
        self.backoff.retry(|| self.inner.get_all()).await
    }

    async fn set_gauge(&self, name: &str, value: f64) -> Result<()> {
        self.backoff.retry(|| self.inner.set_gauge(name, value)).await
    }

    async fn set_counter(&self, name: &str, delta: i64) -> Result<()> {
        self.backoff.retry(|| self.inner.set_counter(name, delta)).await
    }

    async fn set_many(&self, items: &MetricsSnapshot) -> Result<()> {
        self.backoff.retry(|| self.inner.set_many(items)).await
    }

    async fn ping(&self) -> Result<()> {
        self.backoff.retry(|| self.inner.ping()).await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::infrastructure::storage::MemStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    enum FakeError {
        #[error("connection lost")]
        Disconnected,
        #[error("constraint violated")]
        Constraint,
    }

    /// Fails the first `failures` calls with `error`, then delegates.
    struct FlakyStorage {
        inner: MemStorage,
        failures: usize,
        error: fn() -> FakeError,
        calls: AtomicUsize,
    }

    impl FlakyStorage {
        fn new(failures: usize, error: fn() -> FakeError) -> Self {
            Self {
                inner: MemStorage::new(),
                failures,
                error,
                calls: AtomicUsize::new(0),
            }
        }

        fn gate(&self) -> Result<()> {
            // ---
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(anyhow::Error::new((self.error)()));
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl MetricsStorage for FlakyStorage {
        async fn get_gauge(&self, name: &str) -> Result<Option<f64>> {
            self.gate()?;
            self.inner.get_gauge(name).await
        }
        async fn get_counter(&self, name: &str) -> Result<Option<i64>> {
            self.gate()?;
            self.inner.get_counter(name).await
        }
        async fn get_many(&self, keys: &MetricKeys) -> Result<MetricsSnapshot> {
            self.gate()?;
            self.inner.get_many(keys).await
        }
        async fn get_all(&self) -> Result<MetricsSnapshot> {
            self.gate()?;
            self.inner.get_all().await
        }
        async fn set_gauge(&self, name: &str, value: f64) -> Result<()> {
            self.gate()?;
            self.inner.set_gauge(name, value).await
        }
        async fn set_counter(&self, name: &str, delta: i64) -> Result<()> {
            self.gate()?;
            self.inner.set_counter(name, delta).await
        }
        async fn set_many(&self, items: &MetricsSnapshot) -> Result<()> {
            self.gate()?;
            self.inner.set_many(items).await
        }
        async fn ping(&self) -> Result<()> {
            self.gate()
        }
    }

    fn is_disconnect(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<FakeError>(), Some(FakeError::Disconnected))
    }

    fn decorate(flaky: Arc<FlakyStorage>) -> RetryableStorage {
        // ---
        let backoff = Backoff::new(vec![Duration::from_millis(10); 3]).with_classifier(is_disconnect);
        RetryableStorage::with_backoff(flaky, backoff)
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_masked() {
        // ---
        let flaky = Arc::new(FlakyStorage::new(2, || FakeError::Disconnected));
        let storage = decorate(flaky.clone());

        storage.set_counter("c", 5).await.unwrap();
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);

        // The failed attempts never reached the backend, so the delta lands once.
        assert_eq!(storage.get_counter("c").await.unwrap(), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_propagates_immediately() {
        // ---
        let flaky = Arc::new(FlakyStorage::new(1, || FakeError::Constraint));
        let storage = decorate(flaky.clone());

        let err = storage.set_gauge("g", 1.0).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<FakeError>(), Some(FakeError::Constraint)));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_schedule_surfaces_final_error() {
        // ---
        let flaky = Arc::new(FlakyStorage::new(usize::MAX, || FakeError::Disconnected));
        let storage = decorate(flaky.clone());

        assert!(storage.ping().await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn semantics_match_wrapped_backend() {
        // ---
        let storage = decorate(Arc::new(FlakyStorage::new(0, || FakeError::Disconnected)));

        storage.set_gauge("g", 1.0).await.unwrap();
        storage.set_gauge("g", 2.0).await.unwrap();
        storage.set_counter("c", 1).await.unwrap();
        storage.set_counter("c", 1).await.unwrap();

        let all = storage.get_all().await.unwrap();
        assert_eq!(all.gauges["g"], 2.0);
        assert_eq!(all.counters["c"], 2);
        assert_eq!(storage.get_gauge("missing").await.unwrap(), None);
    }
}
