//! VarInt, the MSB base-128 integer used inside undo records
//!
//! Each byte carries 7 bits, most significant group first, with the high
//! bit set on every byte but the last. Every continuation adds one before
//! shifting, so each value has exactly one encoding (201 -> `80 49`).

use super::{ensure_remaining, FormatError};
use bytes::{Buf, BufMut};

/// Ten 7-bit groups cover a u64.
const MAX_VARINT_LEN: usize = 10;

pub struct VarInt;

impl VarInt {
    /// Number of bytes `write` emits for `value`.
    pub fn size(mut value: u64) -> usize {
        let mut len = 1;
        while value > 0x7F {
            value = (value >> 7) - 1;
            len += 1;
        }
        len
    }

    pub fn write<B: BufMut>(buf: &mut B, mut value: u64) {
        let mut tmp = [0u8; MAX_VARINT_LEN];
        let mut len = 0;
        loop {
            tmp[len] = (value & 0x7F) as u8 | if len > 0 { 0x80 } else { 0x00 };
            if value <= 0x7F {
                break;
            }
            value = (value >> 7) - 1;
            len += 1;
        }
        for byte in tmp[..=len].iter().rev() {
            buf.put_u8(*byte);
        }
    }

    pub fn read<B: Buf>(buf: &mut B) -> Result<u64, FormatError> {
        let mut value: u64 = 0;
        loop {
            ensure_remaining(buf, 1)?;
            let byte = buf.get_u8();
            if value > (u64::MAX >> 7) {
                return Err(FormatError::VarIntOverflow);
            }
            value = (value << 7) | (byte & 0x7F) as u64;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            value = value.checked_add(1).ok_or(FormatError::VarIntOverflow)?;
        }
    }

    /// Reads a VarInt that must fit in 32 bits.
    pub fn read_u32<B: Buf>(buf: &mut B) -> Result<u32, FormatError> {
        let value = Self::read(buf)?;
        u32::try_from(value).map_err(|_| FormatError::OutOfRange("u32 varint"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        VarInt::write(&mut out, value);
        out
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(0x7F), vec![0x7F]);
        assert_eq!(encode(0x80), vec![0x80, 0x00]);
        assert_eq!(encode(201), vec![0x80, 0x49]);
        assert_eq!(encode(0x1234), vec![0xA3, 0x34]);
        assert_eq!(encode(0xFFFF), vec![0x82, 0xFE, 0x7F]);
        assert_eq!(encode(0x12_3456), vec![0xC7, 0xE7, 0x56]);
        assert_eq!(encode(0x8012_3456), vec![0x86, 0xFF, 0xC7, 0xE7, 0x56]);
        assert_eq!(encode(0xFFFF_FFFF), vec![0x8E, 0xFE, 0xFE, 0xFE, 0x7F]);
    }

    #[test]
    fn test_size_matches_write() {
        for value in [0, 1, 0x7F, 0x80, 0x407F, 0x4080, 0xFFFF_FFFF, u64::MAX] {
            assert_eq!(VarInt::size(value), encode(value).len(), "value {value}");
        }
    }

    #[test]
    fn test_read_back_extremes() {
        for value in [0, 201, 0x8012_3456, u64::MAX] {
            let bytes = encode(value);
            let mut cursor = bytes.as_slice();
            assert_eq!(VarInt::read(&mut cursor).unwrap(), value);
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn test_overflow_rejected() {
        let bytes = [0xFFu8; 11];
        let mut cursor = &bytes[..];
        assert_eq!(VarInt::read(&mut cursor), Err(FormatError::VarIntOverflow));
    }

    #[test]
    fn test_missing_terminator() {
        let mut cursor: &[u8] = &[0x80, 0x80];
        assert!(matches!(
            VarInt::read(&mut cursor),
            Err(FormatError::Truncated { .. })
        ));
    }

    #[test]
    fn test_read_u32_range() {
        let bytes = encode(u32::MAX as u64 + 1);
        let mut cursor = bytes.as_slice();
        assert!(VarInt::read_u32(&mut cursor).is_err());
    }
}
