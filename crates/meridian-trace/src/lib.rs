//! Meridian Trace - in-process telemetry data model.
//!
//! Provides the primitives instrumented code records before anything is
//! exported:
//! - [`TraceId`] / [`SpanId`] with a zero-is-invalid sentinel
//! - [`SpanContext`] for root and child causality
//! - [`Span`] with an active → completed lifecycle
//! - [`Metric`] point observations
//! - [`SpanValidator`] / [`MetricValidator`] structural checks
//!
//! Semantic-convention checking lives in `meridian-weaver`.

pub mod api;
pub mod clock;
pub mod context;
pub mod error;
pub mod ids;
pub mod metric;
pub mod span;
pub mod validate;

pub use context::{SpanContext, FLAG_SAMPLED};
pub use error::{ContextError, IdKind, IdParseError, SpanError, ValidationError};
pub use ids::{default_generator, IdGenerator, SpanId, TraceId, UniqueIdGenerator};
pub use metric::{Metric, MetricValue};
pub use span::{Attributes, Event, Span, SpanStatus};
pub use validate::{MetricValidator, SpanValidator};
