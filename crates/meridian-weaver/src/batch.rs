//! Serialised input handed to the validation tool.

use meridian_trace::{Metric, Span};
use serde::Serialize;

/// Borrowed spans and metrics sent to a live check as one JSON document.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TelemetryBatch<'a> {
    pub spans: &'a [Span],
    pub metrics: &'a [Metric],
}

impl<'a> TelemetryBatch<'a> {
    #[must_use]
    pub const fn new(spans: &'a [Span], metrics: &'a [Metric]) -> Self {
        Self { spans, metrics }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.spans.is_empty() && self.metrics.is_empty()
    }

    /// Number of entities in the batch.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.spans.len() + self.metrics.len()
    }
}
