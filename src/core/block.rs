//! Blocks as consumed by connect/disconnect
//!
//! A block carries its transactions, the sidechain certificates it
//! includes and the commitment root it installs.

use crate::core::transaction::{Certificate, Transaction};
use crate::crypto::Hash256;

// =============================================================================
// Block Constants
// =============================================================================

/// Maximum block size in bytes
pub const MAX_BLOCK_SIZE: usize = 2_000_000;

/// Smallest possible serialized transaction in bytes
pub const MIN_TX_SIZE: usize = 61;

/// Upper bound on transactions per block (0x8012)
pub const MAX_BLOCK_TXS: usize = MAX_BLOCK_SIZE / MIN_TX_SIZE;

// =============================================================================
// Block
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub hash: Hash256,
    pub height: u32,
    /// Coinbase first, then the rest in block order
    pub transactions: Vec<Transaction>,
    pub certificates: Vec<Certificate>,
    /// Commitment root after this block is applied
    pub commitment_root: Hash256,
}

impl Block {
    /// Create a block; its hash commits to the height, parent and content ids
    pub fn new(
        prev_hash: Hash256,
        height: u32,
        transactions: Vec<Transaction>,
        certificates: Vec<Certificate>,
        commitment_root: Hash256,
    ) -> Self {
        let mut data = format!("{}{}{}", prev_hash, height, commitment_root);
        for tx in &transactions {
            data.push_str(&tx.txid.to_hex());
        }
        for cert in &certificates {
            data.push_str(&cert.id.to_hex());
        }
        Self {
            hash: Hash256::digest(data.as_bytes()),
            height,
            transactions,
            certificates,
            commitment_root,
        }
    }

    /// The genesis block's outputs never become spendable
    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    /// Transactions that spend inputs, in block order
    pub fn non_coinbase(&self) -> impl DoubleEndedIterator<Item = &Transaction> {
        self.transactions.iter().filter(|tx| !tx.is_coinbase())
    }

    pub fn non_coinbase_count(&self) -> usize {
        self.non_coinbase().count()
    }
}
