//! Spans and span events.
//!
//! A [`Span`] is created active, mutated in place by the code path that owns
//! it, and completed exactly once. After completion every mutator returns
//! [`SpanError::SpanClosed`], so a completed span can be handed to validators
//! and exporters as a plain shared reference.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::context::SpanContext;
use crate::error::{SpanError, ValidationError};
use crate::validate::SpanValidator;

/// Insertion-ordered string attributes. Re-inserting a key overwrites its
/// value in place.
pub type Attributes = IndexMap<String, String>;

/// Final outcome of a span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    /// No status recorded yet.
    #[default]
    Unset,
    /// Operation succeeded.
    Ok,
    /// Operation failed.
    Error,
}

/// A timestamped annotation on a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,
}

impl Event {
    #[must_use]
    pub fn new(name: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            name: name.into(),
            timestamp_ms,
            attributes: Attributes::new(),
        }
    }

    /// Add an attribute to the event.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// One timed unit of work within a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    context: SpanContext,
    name: String,
    start_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_time_ms: Option<u64>,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    events: Vec<Event>,
    #[serde(default)]
    status: SpanStatus,
}

impl Span {
    /// Create an active span with caller-supplied initial state.
    ///
    /// # Errors
    ///
    /// Returns [`SpanError::InvalidSpan`] if `name` is empty.
    pub fn new_active(
        context: SpanContext,
        name: impl Into<String>,
        start_time_ms: u64,
        attributes: Attributes,
        events: Vec<Event>,
        status: SpanStatus,
    ) -> Result<Self, SpanError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SpanError::InvalidSpan("name must not be empty".to_owned()));
        }

        Ok(Self {
            context,
            name,
            start_time_ms,
            end_time_ms: None,
            attributes,
            events,
            status,
        })
    }

    /// Transition to completed.
    ///
    /// On error the span is left untouched and still active (unless it was
    /// already completed).
    pub fn complete(&mut self, end_time_ms: u64) -> Result<(), SpanError> {
        if let Some(existing) = self.end_time_ms {
            return Err(SpanError::AlreadyCompleted {
                name: self.name.clone(),
                end_time_ms: existing,
            });
        }
        if end_time_ms < self.start_time_ms {
            return Err(SpanError::NonMonotonicTime {
                start_time_ms: self.start_time_ms,
                end_time_ms,
            });
        }

        self.end_time_ms = Some(end_time_ms);
        trace!(
            span = %self.name,
            span_id = %self.context.span_id(),
            duration_ms = end_time_ms - self.start_time_ms,
            "span completed"
        );
        Ok(())
    }

    /// Insert or overwrite an attribute.
    pub fn insert_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), SpanError> {
        self.ensure_active()?;
        self.attributes.insert(key.into(), value.into());
        Ok(())
    }

    /// Append an event. Its timestamp is not checked until validation.
    pub fn add_event(&mut self, event: Event) -> Result<(), SpanError> {
        self.ensure_active()?;
        self.events.push(event);
        Ok(())
    }

    /// Record the span's outcome.
    pub fn set_status(&mut self, status: SpanStatus) -> Result<(), SpanError> {
        self.ensure_active()?;
        self.status = status;
        Ok(())
    }

    /// Run the structural validator against this span.
    pub fn validate(&self) -> Result<(), ValidationError> {
        SpanValidator::validate(self)
    }

    #[must_use]
    pub const fn context(&self) -> &SpanContext {
        &self.context
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn start_time_ms(&self) -> u64 {
        self.start_time_ms
    }

    #[must_use]
    pub const fn end_time_ms(&self) -> Option<u64> {
        self.end_time_ms
    }

    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Identity for reports: `trace_id/span_id`, since span ids are only
    /// unique within a trace.
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{}/{}", self.context.trace_id(), self.context.span_id())
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub const fn status(&self) -> SpanStatus {
        self.status
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.end_time_ms.is_some()
    }

    /// Elapsed time, once completed. Saturates for spans deserialised with
    /// an end before their start.
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        self.end_time_ms
            .map(|end| end.saturating_sub(self.start_time_ms))
    }

    fn ensure_active(&self) -> Result<(), SpanError> {
        if self.is_completed() {
            Err(SpanError::SpanClosed {
                name: self.name.clone(),
            })
        } else {
            Ok(())
        }
    }
}
