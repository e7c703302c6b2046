//! Transactions, certificates and outputs as seen by the undo layer
//!
//! Only the fields connect/disconnect needs are modelled. Script and
//! transaction serialization belong to the host node and are not
//! reproduced here; ids are supplied by the caller or derived from a
//! digest of the content.

use crate::core::amount::Amount;
use crate::crypto::Hash256;
use crate::sidechain::{CrossChainIntent, SidechainId};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Plain transparent transaction version
pub const TRANSPARENT_TX_VERSION: i32 = 1;

/// Transaction version that may carry cross-chain outputs
pub const SC_TX_VERSION: i32 = -4;

// Script opcodes used by the standard templates
pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_RETURN: u8 = 0x6a;

// =============================================================================
// Transaction Output
// =============================================================================

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxOutput {
    /// Amount in base units
    pub value: Amount,
    /// Locking script
    #[serde(with = "hex_script")]
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    pub fn new(value: Amount, script_pubkey: Vec<u8>) -> Self {
        Self {
            value,
            script_pubkey,
        }
    }

    /// `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn pay_to_pubkey_hash(value: Amount, hash: &[u8; 20]) -> Self {
        let mut script = Vec::with_capacity(25);
        script.extend_from_slice(&[OP_DUP, OP_HASH160, 20]);
        script.extend_from_slice(hash);
        script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Self::new(value, script)
    }

    /// `OP_HASH160 <20> OP_EQUAL`
    pub fn pay_to_script_hash(value: Amount, hash: &[u8; 20]) -> Self {
        let mut script = Vec::with_capacity(23);
        script.extend_from_slice(&[OP_HASH160, 20]);
        script.extend_from_slice(hash);
        script.push(OP_EQUAL);
        Self::new(value, script)
    }

    /// `<pubkey> OP_CHECKSIG`, compressed or uncompressed
    pub fn pay_to_pubkey(value: Amount, pubkey: &[u8]) -> Self {
        let mut script = Vec::with_capacity(pubkey.len() + 2);
        script.push(pubkey.len() as u8);
        script.extend_from_slice(pubkey);
        script.push(OP_CHECKSIG);
        Self::new(value, script)
    }
}

mod hex_script {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(script: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(script))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Outpoints and Transactions
// =============================================================================

/// Reference to one output of a previous transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// A transaction reduced to what the UTXO and sidechain views consume
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub txid: Hash256,
    pub version: i32,
    pub coinbase: bool,
    pub inputs: Vec<OutPoint>,
    pub outputs: Vec<TxOutput>,
    pub cross_chain: Vec<CrossChainIntent>,
}

impl Transaction {
    /// Create a regular transaction; the id is a digest of its content
    pub fn new(version: i32, inputs: Vec<OutPoint>, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            txid: Hash256::ZERO,
            version,
            coinbase: false,
            inputs,
            outputs,
            cross_chain: Vec::new(),
        };
        tx.txid = tx.calculate_hash();
        tx
    }

    /// Create a coinbase transaction for the given height
    pub fn coinbase(height: u32, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            txid: Hash256::ZERO,
            version: TRANSPARENT_TX_VERSION,
            coinbase: true,
            inputs: Vec::new(),
            outputs,
            cross_chain: Vec::new(),
        };
        // Height makes otherwise identical coinbases unique
        tx.txid = Hash256::digest(format!("coinbase{}{:?}", height, tx.outputs).as_bytes());
        tx
    }

    /// Attach cross-chain outputs; switches to the sidechain tx version
    pub fn with_cross_chain(mut self, intents: Vec<CrossChainIntent>) -> Self {
        self.version = SC_TX_VERSION;
        self.cross_chain = intents;
        self.txid = self.calculate_hash();
        self
    }

    pub fn calculate_hash(&self) -> Hash256 {
        let data = format!(
            "{}{}{:?}{:?}{:?}",
            self.version, self.coinbase, self.inputs, self.outputs, self.cross_chain
        );
        Hash256::digest(data.as_bytes())
    }

    pub fn is_coinbase(&self) -> bool {
        self.coinbase
    }
}

/// A sidechain withdrawal certificate, reduced to its ledger effects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub id: Hash256,
    pub sidechain_id: SidechainId,
    pub epoch: i32,
    /// Sum of the backward transfers paid out by this certificate
    pub backward_transfer_total: Amount,
}

impl Certificate {
    pub fn new(sidechain_id: SidechainId, epoch: i32, backward_transfer_total: Amount) -> Self {
        let id = Hash256::digest(
            format!("{}{}{}", sidechain_id, epoch, backward_transfer_total).as_bytes(),
        );
        Self {
            id,
            sidechain_id,
            epoch,
            backward_transfer_total,
        }
    }
}
