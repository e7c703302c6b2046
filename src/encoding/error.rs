//! Decode failures for the ledger wire format

use thiserror::Error;

/// Wire bytes that cannot be turned back into a valid record.
///
/// Every decoder in the crate reports through this type. A decode that
/// fails is always fatal for that call and is never silently recovered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Truncated stream: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("Non-canonical CompactSize encoding of {0}")]
    NonCanonicalCompactSize(u64),
    #[error("Declared length {0} exceeds the maximum sequence size")]
    OversizedLength(u64),
    #[error("Declared length {declared} inconsistent with {remaining} remaining bytes")]
    LengthMismatch { declared: u64, remaining: usize },
    #[error("VarInt overflows 64 bits")]
    VarIntOverflow,
    #[error("Value out of range for {0}")]
    OutOfRange(&'static str),
    #[error("Unexpected {0} trailing bytes after record")]
    TrailingBytes(usize),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
