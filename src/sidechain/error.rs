use crate::sidechain::SidechainId;
use thiserror::Error;

/// A value whose own fields violate its well-formedness rules.
///
/// Raised when cross-chain values are built or validated, and when an
/// undo log under construction would receive a second entry for the same
/// sidechain. Never raised while decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("Custom data is {len} bytes (max: {max})")]
    CustomDataTooLong { len: usize, max: usize },
    #[error("{what} must be {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Withdrawal epoch length must be positive, got {0}")]
    InvalidEpochLength(i32),
    #[error("Mandatory {0} verification key is null")]
    MissingVerificationKey(&'static str),
    #[error("Amount {0} is outside the valid money range")]
    AmountOutOfRange(i64),
    #[error("Cross-chain output is in its null state")]
    NullIntent,
    #[error("Sidechain {0} already has an undo entry in this block")]
    DuplicateSidechainUndo(SidechainId),
}
