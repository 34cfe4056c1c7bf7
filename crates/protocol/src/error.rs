//! Decoding errors.

/// Errors produced while decoding header fields and control lines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("header too short: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid decimal field: {0:?}")]
    InvalidNumber(String),

    #[error("checksum out of 32-bit range: {0}")]
    ChecksumRange(u64),

    #[error("invalid UTF-8 in name field")]
    InvalidName,

    #[error("empty name field")]
    EmptyName,
}
