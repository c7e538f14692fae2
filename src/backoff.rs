//! Bounded retry executor with a fixed delay schedule.
//!
//! Shared by the agent's delivery client and the retrying storage decorator.
//! Operations handed to [`Backoff::retry`] may run several times, so they must
//! be idempotent or otherwise safe to repeat. The executor does not undo or
//! deduplicate partial effects of a failed attempt.

use anyhow::Result;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether an error is transient and worth another attempt.
pub type RetryClassifier = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// Marks an error as transient regardless of the configured classifier.
#[derive(Debug, thiserror::Error)]
#[error("retryable error: {0}")]
pub struct RetryableError(#[from] pub anyhow::Error);

impl RetryableError {
    // ---
    pub fn wrap(err: impl Into<anyhow::Error>) -> anyhow::Error {
        anyhow::Error::new(RetryableError(err.into()))
    }
}

/// Context attached to the last error when the caller cancels a retry wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("retry cancelled")]
pub struct Cancelled;

/// Retry schedule plus transient-error classifier.
#[derive(Clone)]
pub struct Backoff {
    // ---
    delays: Vec<Duration>,
    is_retryable: Option<RetryClassifier>,
}

impl Backoff {
    // ---
    /// Builds a schedule that retries only errors wrapped in [`RetryableError`].
    pub fn new(delays: Vec<Duration>) -> Self {
        Self {
            delays,
            is_retryable: None,
        }
    }

    /// The 1s, 3s, 5s schedule used by the client and storage decorator.
    pub fn standard() -> Self {
        Self::new(vec![
            Duration::from_secs(1),
            Duration::from_secs(3),
            Duration::from_secs(5),
        ])
    }

    pub fn with_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    {
        // ---
        self.is_retryable = Some(Arc::new(classifier));
        self
    }

    pub fn is_retryable(&self, err: &anyhow::Error) -> bool {
        // ---
        err.chain().any(|cause| cause.is::<RetryableError>())
            || self.is_retryable.as_ref().is_some_and(|classify| classify(err))
    }

    /// Runs `op` until it succeeds, hits a non-retryable error, or the
    /// schedule is exhausted. The final error is always returned.
    pub async fn retry<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.retry_until(std::future::pending::<()>(), op).await
    }

    /// Same as [`Backoff::retry`] but gives up as soon as `cancel` completes
    /// during a wait. The last operation error is returned with [`Cancelled`]
    /// as context.
    pub async fn retry_until<T, F, Fut, C>(&self, cancel: C, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Future<Output = ()>,
    {
        // ---
        tokio::pin!(cancel);

        for attempt in 0.. {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let Some(delay) = self.delays.get(attempt).copied() else {
                return Err(err);
            };

            if !self.is_retryable(&err) {
                return Err(err);
            }

            tracing::debug!(attempt, ?delay, error = %err, "Transient failure, retrying");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut cancel => return Err(err.context(Cancelled)),
            }
        }

        unreachable!("attempt counter is unbounded")
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backoff")
            .field("delays", &self.delays)
            .field("has_classifier", &self.is_retryable.is_some())
            .finish()
    }
}
