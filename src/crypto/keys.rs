//! secp256k1 key handling
//!
//! Public key recovery backs the uncompressed P2PK forms of the output
//! codec; base58check renders mainchain addresses.

use secp256k1::PublicKey;
use thiserror::Error;

use super::hash::double_sha256;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid public key")]
    InvalidPublicKey,
}

/// Rebuilds an uncompressed public key from its x coordinate and y parity.
pub fn decompress_public_key(x: &[u8; 32], odd_y: bool) -> Result<[u8; 65], KeyError> {
    let mut compressed = [0u8; 33];
    compressed[0] = if odd_y { 0x03 } else { 0x02 };
    compressed[1..].copy_from_slice(x);
    let key = PublicKey::from_slice(&compressed).map_err(|_| KeyError::InvalidPublicKey)?;
    Ok(key.serialize_uncompressed())
}

/// Base58 with a 4-byte double SHA-256 checksum.
pub fn base58check(prefix: &[u8], payload: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(prefix.len() + payload.len() + 4);
    bytes.extend_from_slice(prefix);
    bytes.extend_from_slice(payload);
    let checksum = double_sha256(&bytes);
    bytes.extend_from_slice(&checksum[..4]);
    bs58::encode(bytes).into_string()
}
