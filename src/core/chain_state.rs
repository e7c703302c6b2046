//! Chain State: connecting and disconnecting blocks
//!
//! Applies a block's effects to the UTXO set, the sidechain records and
//! the commitment root, producing the undo log that reverses them.
//!
//! Connect order:
//! - spend inputs and add outputs, transaction by transaction
//! - apply cross-chain outputs (new sidechains, immature value)
//! - apply certificates
//! - mature sidechain value due at this height
//!
//! Disconnect runs the same steps backwards. Both operations work on a
//! scratch copy and only replace the live state when they succeed.

use crate::core::amount::{format_money, Amount};
use crate::core::block::Block;
use crate::core::coins::CoinsView;
use crate::core::transaction::{Certificate, OutPoint, Transaction};
use crate::crypto::Hash256;
use crate::sidechain::{
    creation_sidechain_id, CrossChainIntent, Epoch, Sidechain, SidechainId, SidechainView,
    StructuralError,
};
use crate::storage::StorageError;
use crate::undo::{BlockUndo, BlockUndoBuilder, SidechainUndo, TxUndo};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ChainStateError {
    #[error("Missing or spent input {0}")]
    MissingInput(OutPoint),
    #[error("Unknown sidechain {0}")]
    UnknownSidechain(SidechainId),
    #[error("Sidechain {0} already exists")]
    SidechainExists(SidechainId),
    #[error("Undo data has {actual} transaction entries, block needs {expected}")]
    UndoTxCountMismatch { expected: usize, actual: usize },
    #[error("Undo data for {txid} has {actual} inputs, transaction has {expected}")]
    UndoInputCountMismatch {
        txid: Hash256,
        expected: usize,
        actual: usize,
    },
    #[error("Sidechain {id} balance {balance} cannot cover {needed}")]
    InsufficientBalance {
        id: SidechainId,
        balance: Amount,
        needed: Amount,
    },
    #[error("Certificate for sidechain {id} has epoch {got}, expected {expected}")]
    EpochMismatch {
        id: SidechainId,
        expected: Epoch,
        got: Epoch,
    },
    #[error("Sidechain {id} has no immature amount of {amount} at height {height}")]
    ImmatureAmountMissing {
        id: SidechainId,
        height: u32,
        amount: Amount,
    },
    #[error("Sidechain {id} still holds balance {balance}")]
    SidechainNotEmpty { id: SidechainId, balance: Amount },
    #[error("Block {block} at height {got} does not extend the tip (expected height {expected})")]
    NotTip {
        block: Hash256,
        expected: u32,
        got: u32,
    },
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Outcome of a disconnect that did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectStatus {
    Clean,
    /// Undo data did not match the state exactly but was applied anyway
    Unclean,
}

// =============================================================================
// Chain State
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ChainState {
    coins: CoinsView,
    sidechains: SidechainView,
    commitment_root: Hash256,
    /// Blocks before cross-chain value becomes part of a sidechain balance
    sc_coin_maturity: u32,
}

impl ChainState {
    pub fn new(sc_coin_maturity: u32) -> Self {
        Self {
            sc_coin_maturity,
            ..Default::default()
        }
    }

    pub fn coins(&self) -> &CoinsView {
        &self.coins
    }

    pub fn sidechains(&self) -> &SidechainView {
        &self.sidechains
    }

    pub fn sidechain(&self, id: &SidechainId) -> Option<&Sidechain> {
        self.sidechains.get(id)
    }

    pub fn commitment_root(&self) -> &Hash256 {
        &self.commitment_root
    }

    pub fn sc_coin_maturity(&self) -> u32 {
        self.sc_coin_maturity
    }

    /// Apply `block` and return the log that reverses it
    pub fn connect_block(&mut self, block: &Block) -> Result<BlockUndo, ChainStateError> {
        let mut scratch = self.clone();
        let undo = scratch.apply_block(block)?;
        *self = scratch;

        log::debug!(
            "connected block {} at height {}: {} tx undos, {} sidechain entries",
            block.hash,
            block.height,
            undo.tx_undos().len(),
            undo.sidechain_undos().len()
        );
        Ok(undo)
    }

    /// Reverse `block` using the log produced when it was connected
    pub fn disconnect_block(
        &mut self,
        block: &Block,
        undo: &BlockUndo,
    ) -> Result<DisconnectStatus, ChainStateError> {
        check_undo_shape(block, undo)?;

        let mut scratch = self.clone();
        let clean = scratch.revert_block(block, undo)?;
        *self = scratch;

        if clean {
            log::debug!("disconnected block {} at height {}", block.hash, block.height);
            Ok(DisconnectStatus::Clean)
        } else {
            log::warn!(
                "disconnected block {} at height {} with inconsistencies",
                block.hash,
                block.height
            );
            Ok(DisconnectStatus::Unclean)
        }
    }

    // =========================================================================
    // Connect
    // =========================================================================

    fn apply_block(&mut self, block: &Block) -> Result<BlockUndo, ChainStateError> {
        let height = block.height;
        let mut builder = BlockUndoBuilder::new(self.commitment_root);

        for tx in &block.transactions {
            if !tx.is_coinbase() {
                let mut prevouts = Vec::with_capacity(tx.inputs.len());
                for input in &tx.inputs {
                    let record = self
                        .coins
                        .spend(input)
                        .ok_or(ChainStateError::MissingInput(*input))?;
                    prevouts.push(record);
                }
                builder.push_tx_undo(TxUndo::new(prevouts));
            }
            self.apply_cross_chain(tx, height)?;
            if block.is_genesis() {
                continue;
            }
            if !self.coins.add_tx(tx, height) {
                log::warn!("transaction {} overwrites unspent outputs", tx.txid);
            }
        }

        // One rollback entry per touched sidechain, holding its pre-block epoch
        let mut sc_undos: BTreeMap<SidechainId, SidechainUndo> = BTreeMap::new();

        for cert in &block.certificates {
            self.apply_certificate(cert, &mut sc_undos)?;
        }

        for id in self.sidechains.maturing_at(height) {
            let Some(sc) = self.sidechains.get_mut(&id) else {
                continue;
            };
            let prior_epoch = sc.last_certificate_epoch;
            let matured = sc.mature(height).unwrap_or(0);
            sc_undos
                .entry(id)
                .or_insert_with(|| SidechainUndo::new(0, prior_epoch))
                .matured_amount += matured;
        }

        for (id, entry) in sc_undos {
            builder.record_sidechain(id, entry)?;
        }

        self.commitment_root = block.commitment_root;
        Ok(builder.build())
    }

    fn apply_cross_chain(&mut self, tx: &Transaction, height: u32) -> Result<(), ChainStateError> {
        let maturity_height = height + self.sc_coin_maturity;

        for (index, intent) in tx.cross_chain.iter().enumerate() {
            intent.validate()?;
            match intent {
                CrossChainIntent::Creation { value, params, .. } => {
                    let id = creation_sidechain_id(&tx.txid, index as u32);
                    if self.sidechains.contains(&id) {
                        return Err(ChainStateError::SidechainExists(id));
                    }
                    let mut sc = Sidechain::new(height, tx.txid, params.clone());
                    sc.add_immature(maturity_height, *value);
                    self.sidechains.insert(id, sc);
                    log::debug!("sc: created {} with {}", id, format_money(*value));
                }
                CrossChainIntent::ForwardTransfer { sidechain_id, .. }
                | CrossChainIntent::WithdrawalRequest { sidechain_id, .. } => {
                    let sc = self
                        .sidechains
                        .get_mut(sidechain_id)
                        .ok_or(ChainStateError::UnknownSidechain(*sidechain_id))?;
                    sc.accepts(intent)?;
                    sc.add_immature(maturity_height, intent.scoped_value());
                    log::debug!(
                        "sc: {} of {} to {}, matures at {}",
                        intent.kind(),
                        format_money(intent.scoped_value()),
                        sidechain_id,
                        maturity_height
                    );
                }
            }
        }
        Ok(())
    }

    fn apply_certificate(
        &mut self,
        cert: &Certificate,
        sc_undos: &mut BTreeMap<SidechainId, SidechainUndo>,
    ) -> Result<(), ChainStateError> {
        let id = cert.sidechain_id;
        let sc = self
            .sidechains
            .get_mut(&id)
            .ok_or(ChainStateError::UnknownSidechain(id))?;

        let expected = sc.last_certificate_epoch + 1;
        if cert.epoch != expected {
            return Err(ChainStateError::EpochMismatch {
                id,
                expected,
                got: cert.epoch,
            });
        }
        if sc.balance < cert.backward_transfer_total {
            return Err(ChainStateError::InsufficientBalance {
                id,
                balance: sc.balance,
                needed: cert.backward_transfer_total,
            });
        }

        sc_undos
            .entry(id)
            .or_insert_with(|| SidechainUndo::new(0, sc.last_certificate_epoch));
        sc.balance -= cert.backward_transfer_total;
        sc.last_certificate_epoch = cert.epoch;

        log::debug!(
            "cert: {} epoch {} paid out {}, balance now {}",
            id,
            cert.epoch,
            format_money(cert.backward_transfer_total),
            format_money(sc.balance)
        );
        Ok(())
    }

    // =========================================================================
    // Disconnect
    // =========================================================================

    fn revert_block(&mut self, block: &Block, undo: &BlockUndo) -> Result<bool, ChainStateError> {
        let height = block.height;
        let mut clean = true;

        for (id, entry) in undo.sidechain_undos() {
            let sc = self
                .sidechains
                .get_mut(id)
                .ok_or(ChainStateError::UnknownSidechain(*id))?;
            if sc.balance < entry.matured_amount {
                return Err(ChainStateError::InsufficientBalance {
                    id: *id,
                    balance: sc.balance,
                    needed: entry.matured_amount,
                });
            }
            entry.apply_to(sc, height);
        }

        for cert in block.certificates.iter().rev() {
            let sc = self
                .sidechains
                .get_mut(&cert.sidechain_id)
                .ok_or(ChainStateError::UnknownSidechain(cert.sidechain_id))?;
            sc.balance += cert.backward_transfer_total;
        }

        let mut tx_undos = undo.tx_undos().iter().rev();
        for tx in block.transactions.iter().rev() {
            if !block.is_genesis() {
                clean &= self.coins.remove_tx(tx, height);
            }
            self.revert_cross_chain(tx, height)?;

            if tx.is_coinbase() {
                continue;
            }
            let tx_undo = tx_undos.next().ok_or(ChainStateError::UndoTxCountMismatch {
                expected: block.non_coinbase_count(),
                actual: undo.tx_undos().len(),
            })?;
            for (input, record) in tx.inputs.iter().zip(&tx_undo.prevouts).rev() {
                clean &= self.coins.apply_output_undo(input, record);
            }
        }

        self.commitment_root = *undo.prior_commitment_root();
        Ok(clean)
    }

    fn revert_cross_chain(&mut self, tx: &Transaction, height: u32) -> Result<(), ChainStateError> {
        let maturity_height = height + self.sc_coin_maturity;

        for (index, intent) in tx.cross_chain.iter().enumerate().rev() {
            let id = match intent.target_sidechain() {
                Some(id) => id,
                None => creation_sidechain_id(&tx.txid, index as u32),
            };
            let sc = self
                .sidechains
                .get_mut(&id)
                .ok_or(ChainStateError::UnknownSidechain(id))?;

            let amount = intent.scoped_value();
            if !sc.decrement_immature(maturity_height, amount) {
                return Err(ChainStateError::ImmatureAmountMissing {
                    id,
                    height: maturity_height,
                    amount,
                });
            }

            if let CrossChainIntent::Creation { .. } = intent {
                if sc.balance > 0 {
                    return Err(ChainStateError::SidechainNotEmpty {
                        id,
                        balance: sc.balance,
                    });
                }
                self.sidechains.remove(&id);
                log::debug!("sc: removed {}", id);
            }
        }
        Ok(())
    }
}

/// Undo data must line up with the block before anything is touched
fn check_undo_shape(block: &Block, undo: &BlockUndo) -> Result<(), ChainStateError> {
    let expected = block.non_coinbase_count();
    if undo.tx_undos().len() != expected {
        return Err(ChainStateError::UndoTxCountMismatch {
            expected,
            actual: undo.tx_undos().len(),
        });
    }
    for (tx, tx_undo) in block.non_coinbase().zip(undo.tx_undos()) {
        if tx.inputs.len() != tx_undo.len() {
            return Err(ChainStateError::UndoInputCountMismatch {
                txid: tx.txid,
                expected: tx.inputs.len(),
                actual: tx_undo.len(),
            });
        }
    }
    Ok(())
}

/// Every sidechain whose record a block changes
pub fn touched_sidechains(block: &Block, undo: &BlockUndo) -> BTreeSet<SidechainId> {
    let mut ids: BTreeSet<SidechainId> = undo.sidechain_undos().keys().copied().collect();
    ids.extend(block.certificates.iter().map(|c| c.sidechain_id));
    for tx in &block.transactions {
        for (index, intent) in tx.cross_chain.iter().enumerate() {
            ids.insert(
                intent
                    .target_sidechain()
                    .unwrap_or_else(|| creation_sidechain_id(&tx.txid, index as u32)),
            );
        }
    }
    ids
}
