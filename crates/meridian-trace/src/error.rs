//! Error types for the telemetry data model.

use thiserror::Error;

/// Which identifier a context operation failed to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// 16-byte trace identifier.
    Trace,
    /// 8-byte span identifier.
    Span,
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace id"),
            Self::Span => write!(f, "span id"),
        }
    }
}

/// Errors raised while minting a span context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The identifier source produced the all-zero sentinel.
    ///
    /// Treated as a configuration fault of the generator; never retried.
    #[error("identifier source produced an invalid {kind}")]
    InvalidIdentifier {
        /// The identifier that could not be minted.
        kind: IdKind,
    },
}

/// Errors raised by span lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    /// Span construction input was rejected.
    #[error("invalid span: {0}")]
    InvalidSpan(String),

    /// `complete` was called on a span that has already ended.
    #[error("span {name:?} already completed at {end_time_ms}ms")]
    AlreadyCompleted {
        /// Span name.
        name: String,
        /// The end time recorded by the first completion.
        end_time_ms: u64,
    },

    /// A mutation was attempted after completion.
    #[error("span {name:?} is closed")]
    SpanClosed {
        /// Span name.
        name: String,
    },

    /// The requested end time precedes the start time.
    #[error("end time {end_time_ms}ms precedes start time {start_time_ms}ms")]
    NonMonotonicTime {
        /// Span start time.
        start_time_ms: u64,
        /// Rejected end time.
        end_time_ms: u64,
    },
}

/// Structural findings reported by the span and metric validators.
///
/// These are recoverable: callers decide whether to log, fail a test, or
/// ignore them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Span or metric name is empty.
    #[error("name must not be empty")]
    EmptyName,

    /// A completed span ends before it starts.
    #[error("end time {end_time_ms}ms precedes start time {start_time_ms}ms")]
    NonMonotonicTime {
        /// Span start time.
        start_time_ms: u64,
        /// Span end time.
        end_time_ms: u64,
    },

    /// An event timestamp falls outside the completed span's window.
    #[error("event {event:?} at {timestamp_ms}ms is outside span window [{start_time_ms}, {end_time_ms}]")]
    EventOutsideWindow {
        /// Event name.
        event: String,
        /// Event timestamp.
        timestamp_ms: u64,
        /// Span start time.
        start_time_ms: u64,
        /// Span end time.
        end_time_ms: u64,
    },

    /// A completed span still carries `Unset` status.
    #[error("completed span has unset status")]
    UnsetStatus,

    /// Histogram bucket counts do not match the boundaries.
    #[error("histogram has {counts} bucket counts for {boundaries} boundaries (expected {})", boundaries + 1)]
    HistogramShape {
        /// Number of boundaries.
        boundaries: usize,
        /// Number of bucket counts.
        counts: usize,
    },

    /// Histogram boundaries are not strictly increasing.
    #[error("histogram boundary at index {index} ({value}) is not greater than its predecessor")]
    HistogramBoundaries {
        /// Index of the offending boundary.
        index: usize,
        /// The offending boundary value.
        value: f64,
    },
}

/// Error parsing a hex-encoded identifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IdParseError {
    /// Wrong number of hex characters.
    #[error("expected {expected} hex characters, found {found}")]
    Length {
        /// Required length.
        expected: usize,
        /// Actual length.
        found: usize,
    },

    /// Input is not valid hex.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Malformed `traceparent` header.
    #[error("malformed traceparent: {0}")]
    Traceparent(String),
}
