//! Byte-exact wire encoding for ledger records
//!
//! This module provides:
//! - `CompactSize` length prefixes and `VarInt` packed integers
//! - `Encodable` / `Decodable` traits over `bytes::BufMut` / `bytes::Buf`
//! - Implementations for fixed-width integers, sequences and ordered maps

pub mod compact_size;
pub mod error;
pub mod varint;

pub use compact_size::{CompactSize, MAX_COMPACT_SIZE};
pub use error::FormatError;
pub use varint::VarInt;

use bytes::{Buf, BufMut};
use std::collections::BTreeMap;

// =============================================================================
// Traits
// =============================================================================

/// A value with a single canonical byte representation.
pub trait Encodable {
    /// Appends the encoding of `self` to `buf`.
    fn encode<B: BufMut>(&self, buf: &mut B);

    /// Exact number of bytes `encode` writes.
    fn encoded_len(&self) -> usize;

    /// Encodes into a freshly allocated buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode(&mut out);
        out
    }
}

/// A value that can be read back from its canonical encoding.
pub trait Decodable: Sized {
    /// Reads one value from the front of `buf`.
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, FormatError>;

    /// Decodes a complete record; leftover bytes are an error.
    fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut cursor = bytes;
        let value = Self::decode(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(FormatError::TrailingBytes(cursor.len()));
        }
        Ok(value)
    }
}

/// Fails with `Truncated` unless `needed` bytes are left in `buf`.
pub(crate) fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> Result<(), FormatError> {
    let available = buf.remaining();
    if available < needed {
        return Err(FormatError::Truncated { needed, available });
    }
    Ok(())
}

/// Reads `count` consecutive values whose count was already consumed.
///
/// Every encoded value occupies at least one byte, so a count larger than
/// the remaining input is rejected before anything is allocated.
pub fn decode_entries<T: Decodable, B: Buf>(
    buf: &mut B,
    count: u64,
) -> Result<Vec<T>, FormatError> {
    if count > buf.remaining() as u64 {
        return Err(FormatError::LengthMismatch {
            declared: count,
            remaining: buf.remaining(),
        });
    }
    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        items.push(T::decode(buf)?);
    }
    Ok(items)
}

/// Reads `len` raw bytes.
pub fn read_bytes<B: Buf>(buf: &mut B, len: usize) -> Result<Vec<u8>, FormatError> {
    ensure_remaining(buf, len)?;
    let mut out = vec![0u8; len];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

/// Reads exactly `N` raw bytes.
pub fn read_array<const N: usize, B: Buf>(buf: &mut B) -> Result<[u8; N], FormatError> {
    ensure_remaining(buf, N)?;
    let mut out = [0u8; N];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

// =============================================================================
// Fixed-width integers (little-endian)
// =============================================================================

macro_rules! impl_le_int {
    ($ty:ty, $put:ident, $get:ident) => {
        impl Encodable for $ty {
            fn encode<B: BufMut>(&self, buf: &mut B) {
                buf.$put(*self);
            }

            fn encoded_len(&self) -> usize {
                std::mem::size_of::<$ty>()
            }
        }

        impl Decodable for $ty {
            fn decode<B: Buf>(buf: &mut B) -> Result<Self, FormatError> {
                ensure_remaining(buf, std::mem::size_of::<$ty>())?;
                Ok(buf.$get())
            }
        }
    };
}

impl_le_int!(i32, put_i32_le, get_i32_le);
impl_le_int!(i64, put_i64_le, get_i64_le);
impl_le_int!(u32, put_u32_le, get_u32_le);

impl Encodable for u8 {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(*self);
    }

    fn encoded_len(&self) -> usize {
        1
    }
}

impl Decodable for u8 {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, FormatError> {
        ensure_remaining(buf, 1)?;
        Ok(buf.get_u8())
    }
}

// =============================================================================
// Sequences and maps
// =============================================================================

impl<T: Encodable> Encodable for Vec<T> {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        CompactSize::write(buf, self.len() as u64);
        for item in self {
            item.encode(buf);
        }
    }

    fn encoded_len(&self) -> usize {
        CompactSize::size(self.len() as u64)
            + self.iter().map(Encodable::encoded_len).sum::<usize>()
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, FormatError> {
        let len = CompactSize::read_len(buf)?;
        decode_entries(buf, len)
    }
}

/// Ordered maps encode in ascending key order, which keeps the bytes stable.
impl<K: Encodable + Ord, V: Encodable> Encodable for BTreeMap<K, V> {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        CompactSize::write(buf, self.len() as u64);
        for (key, value) in self {
            key.encode(buf);
            value.encode(buf);
        }
    }

    fn encoded_len(&self) -> usize {
        CompactSize::size(self.len() as u64)
            + self
                .iter()
                .map(|(k, v)| k.encoded_len() + v.encoded_len())
                .sum::<usize>()
    }
}

impl<K: Decodable + Ord, V: Decodable> Decodable for BTreeMap<K, V> {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, FormatError> {
        let len = CompactSize::read_len(buf)?;
        if len > buf.remaining() as u64 {
            return Err(FormatError::LengthMismatch {
                declared: len,
                remaining: buf.remaining(),
            });
        }
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = K::decode(buf)?;
            let value = V::decode(buf)?;
            if map.insert(key, value).is_some() {
                return Err(FormatError::InvalidValue("duplicate map key".to_string()));
            }
        }
        Ok(map)
    }
}
