//! Output compression codec
//!
//! Compact, host-compatible encoding of a `TxOutput`:
//! - the amount is reduced to exponent/mantissa form and written as a VarInt
//! - standard scripts collapse to a one-byte tag plus their payload
//!
//! ```text
//!   tag 0x00 + 20 bytes   P2PKH
//!   tag 0x01 + 20 bytes   P2SH
//!   tag 0x02/0x03 + 32    P2PK, compressed key (tag is the key prefix)
//!   tag 0x04/0x05 + 32    P2PK, uncompressed key (tag = 4 | y parity)
//!   VarInt(len + 6) + raw other scripts
//! ```

use crate::core::amount::Amount;
use crate::core::transaction::{
    TxOutput, OP_CHECKSIG, OP_DUP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160, OP_RETURN,
};
use crate::crypto::decompress_public_key;
use crate::encoding::{ensure_remaining, read_bytes, Decodable, Encodable, FormatError, VarInt};
use bytes::{Buf, BufMut};

/// Number of tags reserved for special script forms
const SPECIAL_SCRIPTS: u64 = 6;

/// Scripts longer than this are not kept verbatim on decode
pub const MAX_SCRIPT_SIZE: usize = 10_000;

// =============================================================================
// Amount compression
// =============================================================================

/// Strip trailing decimal zeros into an exponent (0..=9) stored alongside
/// the remaining digits.
pub fn compress_amount(mut n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut e = 0;
    while n % 10 == 0 && e < 9 {
        n /= 10;
        e += 1;
    }
    if e < 9 {
        let d = n % 10;
        n /= 10;
        n.wrapping_mul(9)
            .wrapping_add(d)
            .wrapping_sub(1)
            .wrapping_mul(10)
            .wrapping_add(e + 1)
    } else {
        (n - 1).wrapping_mul(10).wrapping_add(10)
    }
}

pub fn decompress_amount(mut x: u64) -> u64 {
    if x == 0 {
        return 0;
    }
    x -= 1;
    let mut e = x % 10;
    x /= 10;
    let mut n = if e < 9 {
        let d = (x % 9) + 1;
        x /= 9;
        x.wrapping_mul(10).wrapping_add(d)
    } else {
        x.wrapping_add(1)
    };
    while e > 0 {
        n = n.wrapping_mul(10);
        e -= 1;
    }
    n
}

// =============================================================================
// Script compression
// =============================================================================

enum SpecialScript<'a> {
    PubKeyHash(&'a [u8]),
    ScriptHash(&'a [u8]),
    /// Tag (2..=5) and the 32-byte x coordinate
    PubKey(u8, &'a [u8]),
}

fn classify(script: &[u8]) -> Option<SpecialScript<'_>> {
    match script {
        [OP_DUP, OP_HASH160, 20, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG] if hash.len() == 20 => {
            Some(SpecialScript::PubKeyHash(hash))
        }
        [OP_HASH160, 20, hash @ .., OP_EQUAL] if hash.len() == 20 => {
            Some(SpecialScript::ScriptHash(hash))
        }
        [33, prefix @ (0x02 | 0x03), x @ .., OP_CHECKSIG] if x.len() == 32 => {
            Some(SpecialScript::PubKey(*prefix, x))
        }
        [65, 0x04, point @ .., OP_CHECKSIG] if point.len() == 64 => {
            // Only keys that are actually on the curve can be rebuilt later
            let mut x = [0u8; 32];
            x.copy_from_slice(&point[..32]);
            let odd = point[63] & 1 == 1;
            match decompress_public_key(&x, odd) {
                Ok(full) if full[1..] == *point => {
                    Some(SpecialScript::PubKey(0x04 | odd as u8, &point[..32]))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn special_payload_len(tag: u64) -> usize {
    if tag < 2 {
        20
    } else {
        32
    }
}

fn compressed_script_len(script: &[u8]) -> usize {
    match classify(script) {
        Some(SpecialScript::PubKeyHash(_)) | Some(SpecialScript::ScriptHash(_)) => 21,
        Some(SpecialScript::PubKey(..)) => 33,
        None => VarInt::size(script.len() as u64 + SPECIAL_SCRIPTS) + script.len(),
    }
}

fn write_script<B: BufMut>(buf: &mut B, script: &[u8]) {
    match classify(script) {
        Some(SpecialScript::PubKeyHash(hash)) => {
            buf.put_u8(0x00);
            buf.put_slice(hash);
        }
        Some(SpecialScript::ScriptHash(hash)) => {
            buf.put_u8(0x01);
            buf.put_slice(hash);
        }
        Some(SpecialScript::PubKey(tag, x)) => {
            buf.put_u8(tag);
            buf.put_slice(x);
        }
        None => {
            VarInt::write(buf, script.len() as u64 + SPECIAL_SCRIPTS);
            buf.put_slice(script);
        }
    }
}

fn read_script<B: Buf>(buf: &mut B) -> Result<Vec<u8>, FormatError> {
    let size = VarInt::read(buf)?;
    if size < SPECIAL_SCRIPTS {
        let payload = read_bytes(buf, special_payload_len(size))?;
        return expand_special(size as u8, &payload);
    }

    let len = usize::try_from(size - SPECIAL_SCRIPTS)
        .map_err(|_| FormatError::OutOfRange("script length"))?;
    if len > MAX_SCRIPT_SIZE {
        // Unspendable anyway: skip the body and keep a provably unspendable script
        ensure_remaining(buf, len)?;
        buf.advance(len);
        return Ok(vec![OP_RETURN]);
    }
    read_bytes(buf, len)
}

fn expand_special(tag: u8, payload: &[u8]) -> Result<Vec<u8>, FormatError> {
    let mut script = Vec::with_capacity(67);
    match tag {
        0x00 => {
            script.extend_from_slice(&[OP_DUP, OP_HASH160, 20]);
            script.extend_from_slice(payload);
            script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        }
        0x01 => {
            script.extend_from_slice(&[OP_HASH160, 20]);
            script.extend_from_slice(payload);
            script.push(OP_EQUAL);
        }
        0x02 | 0x03 => {
            script.extend_from_slice(&[33, tag]);
            script.extend_from_slice(payload);
            script.push(OP_CHECKSIG);
        }
        _ => {
            let mut x = [0u8; 32];
            x.copy_from_slice(payload);
            let full = decompress_public_key(&x, tag == 0x05)
                .map_err(|e| FormatError::InvalidValue(format!("compressed pubkey: {e}")))?;
            script.push(65);
            script.extend_from_slice(&full);
            script.push(OP_CHECKSIG);
        }
    }
    Ok(script)
}

// =============================================================================
// CompressedOutput
// =============================================================================

/// A `TxOutput` carried in compressed wire form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompressedOutput(pub TxOutput);

impl CompressedOutput {
    pub fn into_inner(self) -> TxOutput {
        self.0
    }
}

/// Write `output` in compressed form
pub fn write_compressed<B: BufMut>(buf: &mut B, output: &TxOutput) {
    // Negative values never reach an undo record; they wrap like the host does
    VarInt::write(buf, compress_amount(output.value as u64));
    write_script(buf, &output.script_pubkey);
}

/// Exact size of `write_compressed` output
pub fn compressed_len(output: &TxOutput) -> usize {
    VarInt::size(compress_amount(output.value as u64)) + compressed_script_len(&output.script_pubkey)
}

pub fn read_compressed<B: Buf>(buf: &mut B) -> Result<TxOutput, FormatError> {
    let value = decompress_amount(VarInt::read(buf)?) as Amount;
    let script_pubkey = read_script(buf)?;
    Ok(TxOutput::new(value, script_pubkey))
}

impl Encodable for CompressedOutput {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        write_compressed(buf, &self.0);
    }

    fn encoded_len(&self) -> usize {
        compressed_len(&self.0)
    }
}

impl Decodable for CompressedOutput {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, FormatError> {
        read_compressed(buf).map(Self)
    }
}

/// Compress one output
pub fn compress_output(output: &TxOutput) -> Vec<u8> {
    CompressedOutput(output.clone()).to_bytes()
}

/// Decompress one output from its complete encoding
pub fn decompress_output(bytes: &[u8]) -> Result<TxOutput, FormatError> {
    CompressedOutput::from_bytes(bytes).map(CompressedOutput::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::amount::COIN;
    use secp256k1::{PublicKey, Secp256k1, SecretKey};

    #[test]
    fn test_amount_vectors() {
        assert_eq!(compress_amount(0), 0);
        assert_eq!(compress_amount(1), 1);
        assert_eq!(compress_amount(1_000_000), 7);
        assert_eq!(compress_amount(COIN as u64), 9);
        assert_eq!(compress_amount(50 * COIN as u64), 50);
        assert_eq!(compress_amount(21_000_000 * COIN as u64), 21_000_000);
    }

    #[test]
    fn test_amount_round_trip() {
        for n in [0u64, 1, 7, 10, 123_456_789, 100_000_000, 2_100_000_000_000_000] {
            assert_eq!(decompress_amount(compress_amount(n)), n, "amount {n}");
        }
    }

    #[test]
    fn test_p2pkh_compresses_to_21_bytes() {
        let out = TxOutput::pay_to_pubkey_hash(COIN, &[3u8; 20]);
        let bytes = compress_output(&out);
        // amount (1 byte) + tag + hash
        assert_eq!(bytes.len(), 1 + 21);
        assert_eq!(bytes[1], 0x00);
        assert_eq!(decompress_output(&bytes).unwrap(), out);
    }

    #[test]
    fn test_p2sh_tag() {
        let out = TxOutput::pay_to_script_hash(5, &[9u8; 20]);
        let bytes = compress_output(&out);
        assert_eq!(bytes[1], 0x01);
        assert_eq!(decompress_output(&bytes).unwrap(), out);
    }

    #[test]
    fn test_pubkey_forms() {
        let secret = SecretKey::from_slice(&[0x17; 32]).unwrap();
        let key = PublicKey::from_secret_key(&Secp256k1::new(), &secret);

        let compressed = TxOutput::pay_to_pubkey(1, &key.serialize());
        let bytes = compress_output(&compressed);
        assert_eq!(bytes.len(), 1 + 33);
        assert_eq!(decompress_output(&bytes).unwrap(), compressed);

        let uncompressed = TxOutput::pay_to_pubkey(1, &key.serialize_uncompressed());
        let bytes = compress_output(&uncompressed);
        assert_eq!(bytes.len(), 1 + 33);
        assert!(bytes[1] == 0x04 || bytes[1] == 0x05);
        assert_eq!(decompress_output(&bytes).unwrap(), uncompressed);
    }

    #[test]
    fn test_raw_script_fallback() {
        let out = TxOutput::new(1, vec![OP_RETURN, 0x01, 0xff]);
        let bytes = compress_output(&out);
        assert_eq!(bytes[1], 3 + 6);
        assert_eq!(CompressedOutput(out.clone()).encoded_len(), bytes.len());
        assert_eq!(decompress_output(&bytes).unwrap(), out);
    }

    #[test]
    fn test_oversized_script_becomes_op_return() {
        let out = TxOutput::new(1, vec![0x51; MAX_SCRIPT_SIZE + 1]);
        let bytes = compress_output(&out);
        let decoded = decompress_output(&bytes).unwrap();
        assert_eq!(decoded.script_pubkey, vec![OP_RETURN]);
    }

    #[test]
    fn test_truncated_payload() {
        let out = TxOutput::pay_to_pubkey_hash(COIN, &[3u8; 20]);
        let bytes = compress_output(&out);
        assert!(matches!(
            decompress_output(&bytes[..bytes.len() - 1]),
            Err(FormatError::Truncated { .. })
        ));
    }
}
