//! Structural validation of spans and metrics.
//!
//! These checks cover internal consistency only and know nothing about
//! semantic conventions. They are cheap and fail fast: the first violation
//! found is returned.

use std::cmp::Ordering;

use crate::error::ValidationError;
use crate::metric::{Metric, MetricValue};
use crate::span::{Span, SpanStatus};

/// Checks span invariants.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanValidator;

impl SpanValidator {
    /// Validate a span.
    ///
    /// Checks run in order:
    /// 1. name is non-empty
    /// 2. a completed span does not end before it starts
    /// 3. a completed span's events lie within `[start, end]`
    /// 4. a completed span has a status other than `Unset`
    ///
    /// Active spans skip 2-4: events may legitimately be appended before the
    /// end time is known, and status is usually set last.
    pub fn validate(span: &Span) -> Result<(), ValidationError> {
        if span.name().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let Some(end_time_ms) = span.end_time_ms() else {
            return Ok(());
        };
        let start_time_ms = span.start_time_ms();

        if end_time_ms < start_time_ms {
            return Err(ValidationError::NonMonotonicTime {
                start_time_ms,
                end_time_ms,
            });
        }

        if let Some(event) = span
            .events()
            .iter()
            .find(|e| !(start_time_ms..=end_time_ms).contains(&e.timestamp_ms))
        {
            return Err(ValidationError::EventOutsideWindow {
                event: event.name.clone(),
                timestamp_ms: event.timestamp_ms,
                start_time_ms,
                end_time_ms,
            });
        }

        if span.status() == SpanStatus::Unset {
            return Err(ValidationError::UnsetStatus);
        }

        Ok(())
    }
}

/// Checks metric invariants.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricValidator;

impl MetricValidator {
    /// Validate a metric observation: non-empty name, and for histograms the
    /// bucket shape and strictly increasing boundaries.
    pub fn validate(metric: &Metric) -> Result<(), ValidationError> {
        if metric.name().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        if let MetricValue::Histogram { boundaries, counts } = metric.value() {
            if counts.len() != boundaries.len() + 1 {
                return Err(ValidationError::HistogramShape {
                    boundaries: boundaries.len(),
                    counts: counts.len(),
                });
            }

            // Unordered pairs (NaN) count as not increasing.
            if let Some((index, pair)) = boundaries
                .windows(2)
                .enumerate()
                .find(|(_, pair)| pair[1].partial_cmp(&pair[0]) != Some(Ordering::Greater))
            {
                return Err(ValidationError::HistogramBoundaries {
                    index: index + 1,
                    value: pair[1],
                });
            }
        }

        Ok(())
    }
}
