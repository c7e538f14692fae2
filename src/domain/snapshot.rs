use super::metric::{Metric, MetricKind, MetricValue, ValidationError, WireMetric};
use std::collections::BTreeMap;

/// Point-in-time copy of gauge and counter values.
///
/// A snapshot owns its maps, so mutating storage after it was taken never
/// affects it. Ordered maps keep serialized output stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    // ---
    pub gauges: BTreeMap<String, f64>,
    pub counters: BTreeMap<String, i64>,
}

impl MetricsSnapshot {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.gauges.len() + self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty() && self.counters.is_empty()
    }

    /// Folds a metric into the batch with storage merge semantics: a repeated
    /// gauge keeps the last value, repeated counter deltas are summed.
    pub fn push(&mut self, metric: Metric) {
        // ---
        match metric.value {
            MetricValue::Gauge(v) => {
                self.gauges.insert(metric.name, v);
            }
            MetricValue::Counter(d) => {
                let total = self.counters.entry(metric.name).or_insert(0);
                *total = total.wrapping_add(d);
            }
        }
    }

    pub fn get(&self, kind: MetricKind, name: &str) -> Option<MetricValue> {
        // ---
        match kind {
            MetricKind::Gauge => self.gauges.get(name).copied().map(MetricValue::Gauge),
            MetricKind::Counter => self.counters.get(name).copied().map(MetricValue::Counter),
        }
    }

    /// Names present in this snapshot, split by kind.
    pub fn keys(&self) -> MetricKeys {
        MetricKeys {
            gauges: self.gauges.keys().cloned().collect(),
            counters: self.counters.keys().cloned().collect(),
        }
    }

    /// All metrics, gauges first, each kind in name order.
    pub fn metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        // ---
        let gauges = self.gauges.iter().map(|(n, v)| Metric::gauge(n.clone(), *v));
        let counters = self
            .counters
            .iter()
            .map(|(n, d)| Metric::counter(n.clone(), *d));

        gauges.chain(counters)
    }

    pub fn to_wire(&self) -> Vec<WireMetric> {
        self.metrics().map(WireMetric::from).collect()
    }

    /// Validates every record and folds them into one batch.
    pub fn from_wire(records: Vec<WireMetric>) -> Result<Self, ValidationError> {
        // ---
        let mut batch = Self::new();
        for record in records {
            batch.push(Metric::try_from(record)?);
        }

        Ok(batch)
    }
}

impl FromIterator<Metric> for MetricsSnapshot {
    fn from_iter<I: IntoIterator<Item = Metric>>(iter: I) -> Self {
        let mut batch = Self::new();
        for metric in iter {
            batch.push(metric);
        }
        batch
    }
}

/// Names to look up with `get_many`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricKeys {
    // ---
    pub gauges: Vec<String>,
    pub counters: Vec<String>,
}
