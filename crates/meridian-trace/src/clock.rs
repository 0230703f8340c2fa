//! Wall-clock time in Unix milliseconds.

use chrono::Utc;

/// Milliseconds since the Unix epoch. Clocks set before 1970 read as zero.
#[must_use]
pub fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
