//! Metric identity, typed values, and the wire record exchanged between agent,
//! server, and the persistence file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two kinds of metric the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    // ---
    Gauge,
    Counter,
}

impl MetricKind {
    // ---
    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// A typed metric value.
///
/// Gauges are overwritten on every write; counters accumulate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    // ---
    Gauge(f64),
    Counter(i64),
}

impl MetricValue {
    // ---
    pub fn kind(&self) -> MetricKind {
        // ---
        match self {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
        }
    }

    /// Parses the textual value of a path-style update for the given kind.
    pub fn parse(kind: MetricKind, raw: &str) -> Result<Self, ValidationError> {
        // ---
        let invalid = || ValidationError::InvalidValue {
            kind,
            raw: raw.to_string(),
        };

        match kind {
            MetricKind::Gauge => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(MetricValue::Gauge)
                .ok_or_else(invalid),
            MetricKind::Counter => raw.parse::<i64>().map(MetricValue::Counter).map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Gauge(v) => write!(f, "{v}"),
            MetricValue::Counter(v) => write!(f, "{v}"),
        }
    }
}

/// A named, typed metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    // ---
    pub name: String,
    pub value: MetricValue,
}

impl Metric {
    // ---
    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Gauge(value),
        }
    }

    pub fn counter(name: impl Into<String>, delta: i64) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Counter(delta),
        }
    }
}

/// Rejections raised while turning untrusted input into a [`Metric`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    // ---
    #[error("metric name is missing")]
    MissingName,

    #[error("unknown metric type: {0:?}")]
    UnknownKind(String),

    #[error("{kind} metric {name:?} has no value")]
    MissingValue { kind: MetricKind, name: String },

    #[error("cannot parse {kind} value {raw:?}")]
    InvalidValue { kind: MetricKind, raw: String },
}

/// Wire Metric Record.
///
/// `value` is populated for gauges and `delta` for counters. Both are absent
/// in a read request (`POST /value`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMetric {
    // ---
    #[serde(default)]
    pub id: String,

    #[serde(rename = "type")]
    pub kind: MetricKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl From<Metric> for WireMetric {
    fn from(metric: Metric) -> Self {
        // ---
        let (delta, value) = match metric.value {
            MetricValue::Gauge(v) => (None, Some(v)),
            MetricValue::Counter(d) => (Some(d), None),
        };

        Self {
            id: metric.name,
            kind: metric.value.kind(),
            delta,
            value,
        }
    }
}

impl TryFrom<WireMetric> for Metric {
    type Error = ValidationError;

    fn try_from(wire: WireMetric) -> Result<Self, Self::Error> {
        // ---
        if wire.id.is_empty() {
            return Err(ValidationError::MissingName);
        }

        let value = match (wire.kind, wire.value, wire.delta) {
            (MetricKind::Gauge, Some(v), _) => MetricValue::Gauge(v),
            (MetricKind::Counter, _, Some(d)) => MetricValue::Counter(d),
            (kind, _, _) => {
                return Err(ValidationError::MissingValue {
                    kind,
                    name: wire.id,
                })
            }
        };

        Ok(Metric {
            name: wire.id,
            value,
        })
    }
}
