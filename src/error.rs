use thiserror::Error;

use crate::tags::TagId;

/// Registry lookup misses. Informational: the caller skips the bit and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryMiss {
    #[error("unknown tag {0}")]
    UnknownTag(TagId),

    #[error("unknown rate {0:#04x}")]
    UnknownRate(u8),
}

/// Problems found while walking the tagged parameters of one frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("element {id} at offset {offset} declares {declared} bytes but only {available} remain")]
    TruncatedElement {
        id: u8,
        offset: usize,
        declared: usize,
        available: usize,
    },

    #[error("element {id} at offset {offset} is malformed: {reason}")]
    MalformedKnownIe {
        id: u8,
        offset: usize,
        reason: String,
    },

    #[error("{remaining} trailing byte(s) at offset {offset}")]
    TrailingGarbage { offset: usize, remaining: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntropyError {
    #[error("population counter overflow")]
    CounterOverflow,
}
