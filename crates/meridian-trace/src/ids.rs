//! Trace and span identifiers.
//!
//! Widths follow W3C Trace Context: 16 bytes for a trace, 8 bytes for a span.
//! The all-zero value of either is the "invalid/unset" sentinel and is never
//! produced by [`UniqueIdGenerator`].

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IdParseError;

/// 128-bit trace identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TraceId([u8; 16]);

/// 64-bit span identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SpanId([u8; 8]);

impl TraceId {
    /// The all-zero sentinel.
    pub const INVALID: Self = Self([0; 16]);

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    /// Whether this is anything other than the all-zero sentinel.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        u128::from_be_bytes(self.0) != 0
    }
}

impl SpanId {
    /// The all-zero sentinel.
    pub const INVALID: Self = Self([0; 8]);

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0
    }

    /// Whether this is anything other than the all-zero sentinel.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        u64::from_be_bytes(self.0) != 0
    }
}

/// Hex text form, serde and formatting shared by both identifier widths.
macro_rules! hex_identifier {
    ($ty:ident, $len:expr) => {
        impl $ty {
            /// Lowercase hex encoding.
            #[must_use]
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl FromStr for $ty {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.len() != $len * 2 {
                    return Err(IdParseError::Length {
                        expected: $len * 2,
                        found: s.len(),
                    });
                }
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(s, &mut bytes)?;
                Ok(Self(bytes))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self.to_hex())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_identifier!(TraceId, 16);
hex_identifier!(SpanId, 8);

/// Source of fresh identifiers.
///
/// Implementations must be safe to call from many threads at once and must
/// never hand the same identifier to two callers.
pub trait IdGenerator: Send + Sync {
    /// Mint a trace identifier.
    fn new_trace_id(&self) -> TraceId;

    /// Mint a span identifier.
    fn new_span_id(&self) -> SpanId;
}

/// Lock-free generator with a process-wide uniqueness guarantee.
///
/// Span ids are an atomic sequence number pushed through the SplitMix64
/// finaliser, which is a bijection on `u64`, so distinct sequence numbers can
/// never collide. Trace ids take a random high half and the same kind of
/// sequence-derived low half.
#[derive(Debug)]
pub struct UniqueIdGenerator {
    seed: u64,
    trace_seq: AtomicU64,
    span_seq: AtomicU64,
}

impl UniqueIdGenerator {
    /// Create a generator with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create a generator with a fixed seed, for reproducible tests.
    #[must_use]
    pub const fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            trace_seq: AtomicU64::new(0),
            span_seq: AtomicU64::new(0),
        }
    }

    fn next_unique(&self, seq: &AtomicU64) -> u64 {
        // Exactly one sequence value maps to zero; skip it.
        loop {
            let n = seq.fetch_add(1, Ordering::Relaxed);
            let mixed = mix64(n.wrapping_add(self.seed));
            if mixed != 0 {
                return mixed;
            }
        }
    }
}

impl Default for UniqueIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for UniqueIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        let high: u64 = rand::random();
        let low = self.next_unique(&self.trace_seq);
        TraceId::from_u128((u128::from(high) << 64) | u128::from(low))
    }

    fn new_span_id(&self) -> SpanId {
        SpanId::from_u64(self.next_unique(&self.span_seq))
    }
}

static DEFAULT_GENERATOR: LazyLock<UniqueIdGenerator> = LazyLock::new(UniqueIdGenerator::new);

/// The process-wide generator used by [`SpanContext::root`](crate::SpanContext::root)
/// and [`SpanContext::child_of`](crate::SpanContext::child_of).
#[must_use]
pub fn default_generator() -> &'static UniqueIdGenerator {
    &DEFAULT_GENERATOR
}

const fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
