//! Convenience entry points for instrumentation and test code.
//!
//! These wrap the underlying types with wall-clock timestamps so callers do
//! not need to thread times through by hand.
//!
//! ```
//! use meridian_trace::api::{complete_span, new_root_context, open_span, validate_span};
//! use meridian_trace::SpanStatus;
//!
//! let context = new_root_context()?;
//! let mut span = open_span(context, "checkout")?;
//! span.insert_attribute("http.request.method", "POST")?;
//! span.set_status(SpanStatus::Ok)?;
//! complete_span(&mut span)?;
//! validate_span(&span)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::clock::now_ms;
use crate::context::SpanContext;
use crate::error::{ContextError, SpanError, ValidationError};
use crate::metric::{Metric, MetricValue};
use crate::span::{Attributes, Span, SpanStatus};
use crate::validate::{MetricValidator, SpanValidator};

/// Start a new trace.
pub fn new_root_context() -> Result<SpanContext, ContextError> {
    SpanContext::root()
}

/// Open an active span starting now, with no attributes, events or status.
pub fn open_span(context: SpanContext, name: impl Into<String>) -> Result<Span, SpanError> {
    Span::new_active(
        context,
        name,
        now_ms(),
        Attributes::new(),
        Vec::new(),
        SpanStatus::Unset,
    )
}

/// Complete a span at the current time.
pub fn complete_span(span: &mut Span) -> Result<(), SpanError> {
    span.complete(now_ms())
}

/// Run structural validation on a span.
pub fn validate_span(span: &Span) -> Result<(), ValidationError> {
    SpanValidator::validate(span)
}

/// Record a metric observation timestamped now.
#[must_use]
pub fn record_metric(name: impl Into<String>, value: MetricValue, attributes: Attributes) -> Metric {
    Metric::new(name, value, now_ms(), attributes)
}

/// Run structural validation on a metric.
pub fn validate_metric(metric: &Metric) -> Result<(), ValidationError> {
    MetricValidator::validate(metric)
}
