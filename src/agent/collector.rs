use super::client::MetricsClient;
use crate::domain::{Metric, MetricValue, MetricsSnapshot, MetricsStorage};
use crate::infrastructure::MemStorage;
use crate::shutdown::Shutdown;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

/// Counter bumped once per poll; reset after every report.
pub const POLL_COUNT: &str = "PollCount";

/// Source of runtime readings, polled on every poll tick.
pub trait RuntimeSource: Send {
    fn collect(&mut self) -> Vec<Metric>;
}

/// Agent-side metric buffer shared by the poll and report loops.
///
/// Both loops hold `gate` while touching storage, so a report never sees
/// half of a poll.
#[derive(Default)]
pub struct Collector {
    // ---
    storage: MemStorage,
    gate: Mutex<()>,
}

impl Collector {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores one round of readings and bumps [`POLL_COUNT`].
    pub async fn poll(&self, source: &mut dyn RuntimeSource) -> Result<()> {
        // ---
        let readings = source.collect();

        let _gate = self.gate.lock().await;
        for metric in readings {
            match metric.value {
                MetricValue::Gauge(v) => self.storage.set_gauge(&metric.name, v).await?,
                MetricValue::Counter(d) => self.storage.set_counter(&metric.name, d).await?,
            }
        }
        self.storage.set_counter(POLL_COUNT, 1).await
    }

    /// Snapshot for one report; counters restart from zero.
    pub async fn take_report(&self) -> MetricsSnapshot {
        let _gate = self.gate.lock().await;
        self.storage.take_report()
    }

    /// Hands the current snapshot to `client`.
    ///
    /// If the batch cannot be queued its counter deltas are put back, so the
    /// next report still carries them.
    pub async fn report(&self, client: &MetricsClient) -> Result<()> {
        // ---
        let report = self.take_report().await;

        if let Err(err) = client.report_all(&report).await {
            let _gate = self.gate.lock().await;
            for (name, delta) in &report.counters {
                self.storage.set_counter(name, *delta).await?;
            }
            return Err(err);
        }

        Ok(())
    }

    pub async fn snapshot(&self) -> Result<MetricsSnapshot> {
        self.storage.get_all().await
    }
}

/// Polls `source` every `every` until shutdown.
pub async fn run_poll_loop<S: RuntimeSource>(
    collector: Arc<Collector>,
    mut source: S,
    every: Duration,
    shutdown: Shutdown,
) {
    // ---
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = collector.poll(&mut source).await {
                    tracing::warn!("Poll failed: {err:#}");
                }
            }
            _ = shutdown.wait() => break,
        }
    }

    tracing::debug!("Poll loop stopped");
}

/// Reports through `client` every `every` until shutdown. The first report
/// goes out one full interval after start.
pub async fn run_report_loop(
    collector: Arc<Collector>,
    client: &MetricsClient,
    every: Duration,
    shutdown: Shutdown,
) {
    // ---
    let start = tokio::time::Instant::now() + every;
    let mut ticker = tokio::time::interval_at(start, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = collector.report(client).await {
                    tracing::warn!("Report not queued: {err:#}");
                }
            }
            _ = shutdown.wait() => break,
        }
    }

    tracing::debug!("Report loop stopped");
}
