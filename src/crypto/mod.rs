//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing and the `Hash256` identifier
//! - secp256k1 public key recovery and base58check addresses

pub mod hash;
pub mod keys;

pub use hash::{double_sha256, sha256, Hash256};
pub use keys::{base58check, decompress_public_key, KeyError};
