//! Span context: the immutable causal link between spans.

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, IdKind, IdParseError};
use crate::ids::{default_generator, IdGenerator, SpanId, TraceId};

/// W3C trace flag bit for "sampled".
pub const FLAG_SAMPLED: u8 = 0x01;

/// Identity and parentage of a single span.
///
/// A root context has no parent. A child shares its parent's trace id and
/// flags and points back at the parent's span id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_span_id: Option<SpanId>,
    #[serde(default)]
    trace_flags: u8,
}

impl SpanContext {
    /// Assemble a context from externally supplied identifiers.
    ///
    /// No validity checks are made; use [`SpanContext::is_valid`] when the
    /// identifiers come from an untrusted source.
    #[must_use]
    pub const fn new(
        trace_id: TraceId,
        span_id: SpanId,
        parent_span_id: Option<SpanId>,
        trace_flags: u8,
    ) -> Self {
        Self {
            trace_id,
            span_id,
            parent_span_id,
            trace_flags,
        }
    }

    /// Start a new trace using the process-wide generator.
    pub fn root() -> Result<Self, ContextError> {
        Self::root_with(default_generator())
    }

    /// Start a new trace using the given generator.
    pub fn root_with(generator: &dyn IdGenerator) -> Result<Self, ContextError> {
        let trace_id = generator.new_trace_id();
        if !trace_id.is_valid() {
            return Err(ContextError::InvalidIdentifier {
                kind: IdKind::Trace,
            });
        }
        let span_id = mint_span_id(generator)?;
        Ok(Self::new(trace_id, span_id, None, FLAG_SAMPLED))
    }

    /// Derive a child of `parent` using the process-wide generator.
    pub fn child_of(parent: &Self) -> Result<Self, ContextError> {
        Self::child_of_with(parent, default_generator())
    }

    /// Derive a child of `parent` using the given generator.
    pub fn child_of_with(parent: &Self, generator: &dyn IdGenerator) -> Result<Self, ContextError> {
        let span_id = mint_span_id(generator)?;
        Ok(Self::new(
            parent.trace_id,
            span_id,
            Some(parent.span_id),
            parent.trace_flags,
        ))
    }

    #[must_use]
    pub const fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    #[must_use]
    pub const fn span_id(&self) -> SpanId {
        self.span_id
    }

    #[must_use]
    pub const fn parent_span_id(&self) -> Option<SpanId> {
        self.parent_span_id
    }

    #[must_use]
    pub const fn trace_flags(&self) -> u8 {
        self.trace_flags
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    #[must_use]
    pub const fn is_sampled(&self) -> bool {
        self.trace_flags & FLAG_SAMPLED != 0
    }

    /// Both trace and span identifiers are non-zero.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.trace_id.is_valid() && self.span_id.is_valid()
    }

    /// Render as a W3C `traceparent` header value.
    ///
    /// Format: `00-{trace_id}-{span_id}-{flags}`.
    #[must_use]
    pub fn to_traceparent(&self) -> String {
        format!(
            "00-{}-{}-{:02x}",
            self.trace_id, self.span_id, self.trace_flags
        )
    }

    /// Parse a W3C `traceparent` header value.
    ///
    /// The result describes the *remote* span; derive a local child from it
    /// with [`SpanContext::child_of`].
    pub fn from_traceparent(header: &str) -> Result<Self, IdParseError> {
        let parts: Vec<&str> = header.trim().split('-').collect();
        let [version, trace_id, span_id, flags] = parts.as_slice() else {
            return Err(IdParseError::Traceparent(format!(
                "expected 4 fields, found {}",
                parts.len()
            )));
        };

        if *version != "00" {
            return Err(IdParseError::Traceparent(format!(
                "unsupported version {version}"
            )));
        }

        let trace_id: TraceId = trace_id.parse()?;
        let span_id: SpanId = span_id.parse()?;
        if flags.len() != 2 {
            return Err(IdParseError::Length {
                expected: 2,
                found: flags.len(),
            });
        }
        let mut flag_byte = [0u8; 1];
        hex::decode_to_slice(*flags, &mut flag_byte)?;

        let context = Self::new(trace_id, span_id, None, flag_byte[0]);
        if !context.is_valid() {
            return Err(IdParseError::Traceparent(
                "all-zero trace or span id".to_owned(),
            ));
        }
        Ok(context)
    }
}

fn mint_span_id(generator: &dyn IdGenerator) -> Result<SpanId, ContextError> {
    let span_id = generator.new_span_id();
    if span_id.is_valid() {
        Ok(span_id)
    } else {
        Err(ContextError::InvalidIdentifier { kind: IdKind::Span })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct ZeroGenerator;

    impl IdGenerator for ZeroGenerator {
        fn new_trace_id(&self) -> TraceId {
            TraceId::INVALID
        }

        fn new_span_id(&self) -> SpanId {
            SpanId::INVALID
        }
    }

    #[test]
    fn root_has_no_parent_and_is_sampled() {
        let root = SpanContext::root().unwrap();
        assert!(root.is_root());
        assert!(root.is_valid());
        assert!(root.is_sampled());
    }

    #[test]
    fn child_inherits_trace_and_flags() {
        let parent = SpanContext::new(TraceId::from_u128(7), SpanId::from_u64(9), None, 0);
        let child = SpanContext::child_of(&parent).unwrap();

        assert_eq!(child.trace_id(), parent.trace_id());
        assert_eq!(child.trace_flags(), 0);
        assert_eq!(child.parent_span_id(), Some(parent.span_id()));
        assert_ne!(child.span_id(), parent.span_id());
    }

    #[test]
    fn zero_generator_fails_root() {
        let err = SpanContext::root_with(&ZeroGenerator).unwrap_err();
        assert_eq!(
            err,
            ContextError::InvalidIdentifier {
                kind: IdKind::Trace
            }
        );
    }

    #[test]
    fn zero_generator_fails_child() {
        let parent = SpanContext::root().unwrap();
        let err = SpanContext::child_of_with(&parent, &ZeroGenerator).unwrap_err();
        assert_eq!(err, ContextError::InvalidIdentifier { kind: IdKind::Span });
    }

    #[test]
    fn traceparent_roundtrip() {
        let header = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";
        let context = SpanContext::from_traceparent(header).unwrap();
        assert_eq!(
            context.trace_id().to_hex(),
            "0af7651916cd43dd8448eb211c80319c"
        );
        assert!(context.is_sampled());
        assert_eq!(context.to_traceparent(), header);
    }

    #[test]
    fn traceparent_rejects_zero_trace() {
        let header = "00-00000000000000000000000000000000-b7ad6b7169203331-01";
        assert!(SpanContext::from_traceparent(header).is_err());
    }

    #[test]
    fn traceparent_rejects_wrong_field_count() {
        let err = SpanContext::from_traceparent("00-abc-01").unwrap_err();
        assert!(matches!(err, IdParseError::Traceparent(_)));
    }

    #[test]
    fn traceparent_rejects_unknown_version() {
        let header = "ff-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";
        assert!(SpanContext::from_traceparent(header).is_err());
    }
}
