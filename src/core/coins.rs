//! Unspent outputs grouped by transaction
//!
//! Outputs are kept per creating transaction together with the metadata
//! an undo record needs when the last of them is spent:
//! - whether the transaction was a coinbase
//! - the height it was confirmed at
//! - its version

use crate::core::compressor::MAX_SCRIPT_SIZE;
use crate::core::transaction::{OutPoint, Transaction, TxOutput, OP_RETURN};
use crate::crypto::Hash256;
use crate::undo::OutputUndo;
use std::collections::HashMap;

/// Outputs that can never be spent are not tracked
pub fn is_unspendable(script: &[u8]) -> bool {
    script.first() == Some(&OP_RETURN) || script.len() > MAX_SCRIPT_SIZE
}

// =============================================================================
// Coins
// =============================================================================

/// Remaining outputs of one transaction; spent slots are `None`
#[derive(Debug, Clone, Default, Eq)]
pub struct Coins {
    pub coinbase: bool,
    pub height: u32,
    pub version: i32,
    pub outputs: Vec<Option<TxOutput>>,
}

impl Coins {
    pub fn from_tx(tx: &Transaction, height: u32) -> Self {
        let outputs = tx
            .outputs
            .iter()
            .map(|out| (!is_unspendable(&out.script_pubkey)).then(|| out.clone()))
            .collect();
        let mut coins = Self {
            coinbase: tx.is_coinbase(),
            height,
            version: tx.version,
            outputs,
        };
        coins.cleanup();
        coins
    }

    /// Drop trailing spent slots
    fn cleanup(&mut self) {
        while matches!(self.outputs.last(), Some(None)) {
            self.outputs.pop();
        }
    }

    pub fn is_available(&self, vout: u32) -> bool {
        matches!(self.outputs.get(vout as usize), Some(Some(_)))
    }

    /// No unspent output left
    pub fn is_pruned(&self) -> bool {
        self.outputs.iter().all(Option::is_none)
    }

    pub fn spend(&mut self, vout: u32) -> Option<TxOutput> {
        let output = self.outputs.get_mut(vout as usize)?.take()?;
        self.cleanup();
        Some(output)
    }

    pub fn unspent_count(&self) -> usize {
        self.outputs.iter().filter(|o| o.is_some()).count()
    }
}

impl PartialEq for Coins {
    /// Two fully spent entries are equal whatever their metadata
    fn eq(&self, other: &Self) -> bool {
        if self.is_pruned() && other.is_pruned() {
            return true;
        }
        self.coinbase == other.coinbase
            && self.height == other.height
            && self.version == other.version
            && self.outputs == other.outputs
    }
}

// =============================================================================
// Coins View
// =============================================================================

/// In-memory UTXO set keyed by creating transaction
#[derive(Debug, Clone, Default)]
pub struct CoinsView {
    coins: HashMap<Hash256, Coins>,
}

impl CoinsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, txid: &Hash256) -> Option<&Coins> {
        self.coins.get(txid)
    }

    pub fn output(&self, outpoint: &OutPoint) -> Option<&TxOutput> {
        self.coins
            .get(&outpoint.txid)?
            .outputs
            .get(outpoint.vout as usize)?
            .as_ref()
    }

    pub fn has_unspent(&self, txid: &Hash256) -> bool {
        self.coins.get(txid).is_some_and(|c| !c.is_pruned())
    }

    /// Add the outputs of `tx`. Returns false if the transaction still had
    /// unspent outputs, which are replaced.
    pub fn add_tx(&mut self, tx: &Transaction, height: u32) -> bool {
        let fresh = !self.has_unspent(&tx.txid);
        let coins = Coins::from_tx(tx, height);
        if coins.is_pruned() {
            self.coins.remove(&tx.txid);
        } else {
            self.coins.insert(tx.txid, coins);
        }
        fresh
    }

    /// Spend one output and produce its undo record.
    ///
    /// Parent metadata is recorded only when this spend leaves the parent
    /// with no unspent output.
    pub fn spend(&mut self, outpoint: &OutPoint) -> Option<OutputUndo> {
        let coins = self.coins.get_mut(&outpoint.txid)?;
        let output = coins.spend(outpoint.vout)?;
        if !coins.is_pruned() {
            return Some(OutputUndo::new(output));
        }
        let coins = self.coins.remove(&outpoint.txid)?;
        Some(OutputUndo::with_metadata(
            output,
            coins.coinbase,
            coins.height,
            coins.version,
        ))
    }

    /// Bring back a spent output. Returns false if the undo record did not
    /// fit the current state cleanly; the output is restored regardless.
    pub fn apply_output_undo(&mut self, outpoint: &OutPoint, undo: &OutputUndo) -> bool {
        let mut clean = true;
        let coins = self.coins.entry(outpoint.txid).or_default();
        if undo.has_metadata() {
            if !coins.is_pruned() {
                log::warn!("undo data overwriting existing transaction {}", outpoint.txid);
                clean = false;
            }
            *coins = Coins {
                coinbase: undo.coinbase,
                height: undo.height,
                version: undo.version,
                outputs: Vec::new(),
            };
        } else if coins.is_pruned() {
            log::warn!("undo data adding output to missing transaction {}", outpoint.txid);
            clean = false;
        }
        if coins.is_available(outpoint.vout) {
            log::warn!("undo data overwriting existing output {}", outpoint);
            clean = false;
        }
        let index = outpoint.vout as usize;
        if coins.outputs.len() <= index {
            coins.outputs.resize(index + 1, None);
        }
        coins.outputs[index] = Some(undo.output.clone());
        clean
    }

    /// Remove the outputs `tx` created at `height`. Returns false if what
    /// was stored differs from what the transaction created.
    pub fn remove_tx(&mut self, tx: &Transaction, height: u32) -> bool {
        let expected = Coins::from_tx(tx, height);
        let stored = self.coins.remove(&tx.txid).unwrap_or_default();
        if stored != expected {
            log::warn!("added transaction {} mismatch, outputs differ from block", tx.txid);
            return false;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}
