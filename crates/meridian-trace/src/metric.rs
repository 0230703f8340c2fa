//! Point-in-time metric observations.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::span::Attributes;
use crate::validate::MetricValidator;

/// The measured value of a metric observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetricValue {
    /// Cumulative count. Callers keep a named series non-decreasing; nothing
    /// here enforces it across observations.
    Counter { value: u64 },
    /// Point value of any sign.
    Gauge { value: f64 },
    /// Bucketed distribution. `counts` has one more entry than `boundaries`:
    /// the final bucket is everything above the last boundary.
    Histogram { boundaries: Vec<f64>, counts: Vec<u64> },
}

impl MetricValue {
    #[must_use]
    pub const fn counter(value: u64) -> Self {
        Self::Counter { value }
    }

    #[must_use]
    pub const fn gauge(value: f64) -> Self {
        Self::Gauge { value }
    }

    #[must_use]
    pub const fn histogram(boundaries: Vec<f64>, counts: Vec<u64>) -> Self {
        Self::Histogram { boundaries, counts }
    }

    /// Short name of the value kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Counter { .. } => "counter",
            Self::Gauge { .. } => "gauge",
            Self::Histogram { .. } => "histogram",
        }
    }
}

/// A single observation. Immutable once built; accumulate by creating new
/// observations that share a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    name: String,
    value: MetricValue,
    timestamp_ms: u64,
    #[serde(default)]
    attributes: Attributes,
}

impl Metric {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: MetricValue,
        timestamp_ms: u64,
        attributes: Attributes,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp_ms,
            attributes,
        }
    }

    /// Run the structural validator against this observation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        MetricValidator::validate(self)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn value(&self) -> &MetricValue {
        &self.value
    }

    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Stable identity for reports: metrics carry no id of their own.
    ///
    /// `name@timestamp`, followed by the attributes sorted by key, so
    /// observations of one series in the same millisecond stay distinct.
    #[must_use]
    pub fn identity(&self) -> String {
        let mut identity = format!("{}@{}", self.name, self.timestamp_ms);
        if self.attributes.is_empty() {
            return identity;
        }
        let mut pairs: Vec<_> = self.attributes.iter().collect();
        pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));
        let rendered: Vec<_> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        identity.push('{');
        identity.push_str(&rendered.join(","));
        identity.push('}');
        identity
    }
}
