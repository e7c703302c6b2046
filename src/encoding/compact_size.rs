//! CompactSize, the prefix-length integer used for every length field
//!
//! ```text
//!   value < 0xFD          -> 1 byte
//!   value <= 0xFFFF       -> 0xFD + u16 LE
//!   value <= 0xFFFF_FFFF  -> 0xFE + u32 LE
//!   otherwise             -> 0xFF + u64 LE
//! ```

use super::{ensure_remaining, FormatError};
use bytes::{Buf, BufMut};

/// The largest sequence length a decoder will accept.
pub const MAX_COMPACT_SIZE: u64 = 0x0200_0000;

/// A zcash/bitcoin CompactSize, a form of variable-length integer
pub struct CompactSize;

impl CompactSize {
    /// Number of bytes `write` emits for `value`.
    pub fn size(value: u64) -> usize {
        match value {
            0..=0xFC => 1,
            0xFD..=0xFFFF => 3,
            0x1_0000..=0xFFFF_FFFF => 5,
            _ => 9,
        }
    }

    /// Writes `value` in its canonical (shortest) form.
    pub fn write<B: BufMut>(buf: &mut B, value: u64) {
        match value {
            0..=0xFC => buf.put_u8(value as u8),
            0xFD..=0xFFFF => {
                buf.put_u8(0xFD);
                buf.put_u16_le(value as u16);
            }
            0x1_0000..=0xFFFF_FFFF => {
                buf.put_u8(0xFE);
                buf.put_u32_le(value as u32);
            }
            _ => {
                buf.put_u8(0xFF);
                buf.put_u64_le(value);
            }
        }
    }

    /// Reads an integer encoded in compact form, rejecting non-canonical widths.
    pub fn read<B: Buf>(buf: &mut B) -> Result<u64, FormatError> {
        ensure_remaining(buf, 1)?;
        let flag = buf.get_u8();
        let value = match flag {
            0..=0xFC => return Ok(flag as u64),
            0xFD => {
                ensure_remaining(buf, 2)?;
                let n = buf.get_u16_le() as u64;
                (n, n < 0xFD)
            }
            0xFE => {
                ensure_remaining(buf, 4)?;
                let n = buf.get_u32_le() as u64;
                (n, n < 0x1_0000)
            }
            0xFF => {
                ensure_remaining(buf, 8)?;
                let n = buf.get_u64_le();
                (n, n < 0x1_0000_0000)
            }
        };
        match value {
            (n, true) => Err(FormatError::NonCanonicalCompactSize(n)),
            (n, false) => Ok(n),
        }
    }

    /// Reads a length prefix and bounds it by [`MAX_COMPACT_SIZE`].
    pub fn read_len<B: Buf>(buf: &mut B) -> Result<u64, FormatError> {
        let len = Self::read(buf)?;
        if len > MAX_COMPACT_SIZE {
            return Err(FormatError::OversizedLength(len));
        }
        Ok(len)
    }

    /// Decodes the leading CompactSize of `bytes` without consuming anything.
    ///
    /// Returns the value and the number of bytes it occupies.
    pub fn peek(bytes: &[u8]) -> Result<(u64, usize), FormatError> {
        let mut cursor = bytes;
        let value = Self::read(&mut cursor)?;
        Ok((value, bytes.len() - cursor.len()))
    }
}
