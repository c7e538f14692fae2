use crate::domain::{MetricKeys, MetricsSnapshot, MetricsStorage};
use anyhow::Result;
use parking_lot::RwLock;

/// In-memory backend. One lock guards both maps, so a batch applied with
/// `set_many` is never observed half-written.
#[derive(Debug, Default)]
pub struct MemStorage {
    // ---
    values: RwLock<MetricsSnapshot>,
}

impl MemStorage {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot and zeroes every counter under one lock.
    ///
    /// The agent calls this on each report so counters carry only the
    /// deltas accumulated since the previous report.
    pub fn take_report(&self) -> MetricsSnapshot {
        // ---
        let mut values = self.values.write();
        let report = values.clone();
        for total in values.counters.values_mut() {
            *total = 0;
        }
        report
    }
}

fn add_counter(values: &mut MetricsSnapshot, name: &str, delta: i64) {
    // ---
    match values.counters.get_mut(name) {
        Some(total) => *total = total.wrapping_add(delta),
        None => {
            values.counters.insert(name.to_string(), delta);
        }
    }
}

#[async_trait::async_trait]
impl MetricsStorage for MemStorage {
    // ---
    async fn get_gauge(&self, name: &str) -> Result<Option<f64>> {
        Ok(self.values.read().gauges.get(name).copied())
    }

    async fn get_counter(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.values.read().counters.get(name).copied())
    }

    async fn get_many(&self, keys: &MetricKeys) -> Result<MetricsSnapshot> {
        // ---
        let values = self.values.read();
        let mut found = MetricsSnapshot::new();

        for name in &keys.gauges {
            if let Some(v) = values.gauges.get(name) {
                found.gauges.insert(name.clone(), *v);
            }
        }
        for name in &keys.counters {
            if let Some(d) = values.counters.get(name) {
                found.counters.insert(name.clone(), *d);
            }
        }

        Ok(found)
    }

    async fn get_all(&self) -> Result<MetricsSnapshot> {
        Ok(self.values.read().clone())
    }

    async fn set_gauge(&self, name: &str, value: f64) -> Result<()> {
        // ---
        self.values.write().gauges.insert(name.to_string(), value);
        Ok(())
    }

    async fn set_counter(&self, name: &str, delta: i64) -> Result<()> {
        // ---
        add_counter(&mut self.values.write(), name, delta);
        Ok(())
    }

    async fn set_many(&self, items: &MetricsSnapshot) -> Result<()> {
        // ---
        let mut values = self.values.write();
        for (name, value) in &items.gauges {
            values.gauges.insert(name.clone(), *value);
        }
        for (name, delta) in &items.counters {
            add_counter(&mut values, name, *delta);
        }

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
