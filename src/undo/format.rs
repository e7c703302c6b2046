//! Wire-format generations of the block undo log

use crate::core::block::MAX_BLOCK_TXS;
use crate::encoding::{CompactSize, FormatError};
use serde::Serialize;
use std::fmt;

/// Written where the legacy format kept the transaction count
pub const FORMAT_MARKER: u64 = 0xFEC1;

// A real legacy count must never be mistaken for the marker
const _: () = assert!((MAX_BLOCK_TXS as u64) < FORMAT_MARKER);

/// Which generation a decoded undo log was read from.
///
/// Derived while decoding and never written: encoding always produces
/// `Current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UndoFormat {
    /// Transaction undos and commitment root only
    Legacy,
    /// Marker, transaction undos, commitment root and sidechain entries
    Current,
}

impl UndoFormat {
    /// Classify the leading integer of an undo record
    pub fn from_leading(leading: u64) -> Self {
        if leading == FORMAT_MARKER {
            Self::Current
        } else {
            Self::Legacy
        }
    }

    /// Detect the generation of raw bytes without decoding the body
    pub fn sniff(bytes: &[u8]) -> Result<Self, FormatError> {
        let (leading, _) = CompactSize::peek(bytes)?;
        Ok(Self::from_leading(leading))
    }
}

impl fmt::Display for UndoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Current => f.write_str("current"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_marker() {
        assert_eq!(UndoFormat::sniff(&[0xFD, 0xC1, 0xFE, 0x00]).unwrap(), UndoFormat::Current);
    }

    #[test]
    fn test_sniff_legacy_counts() {
        assert_eq!(UndoFormat::sniff(&[0x02]).unwrap(), UndoFormat::Legacy);
        assert_eq!(UndoFormat::sniff(&[0x00]).unwrap(), UndoFormat::Legacy);
        // 0x8012 transactions, the largest possible legacy count
        assert_eq!(UndoFormat::sniff(&[0xFD, 0x12, 0x80]).unwrap(), UndoFormat::Legacy);
    }

    #[test]
    fn test_sniff_empty() {
        assert!(matches!(UndoFormat::sniff(&[]), Err(FormatError::Truncated { .. })));
    }

    #[test]
    fn test_display() {
        assert_eq!(UndoFormat::Legacy.to_string(), "legacy");
        assert_eq!(
            serde_json::to_string(&UndoFormat::Current).unwrap(),
            "\"current\""
        );
    }
}
