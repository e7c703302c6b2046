//! Sidechain records as tracked by the mainchain
//!
//! Each sidechain keeps a mature balance that certificates pay out from,
//! the epoch of the last accepted certificate, and the value still waiting
//! to mature, keyed by the height at which it becomes part of the balance.

use crate::core::amount::{format_money, Amount};
use crate::crypto::Hash256;
use crate::sidechain::intent::CrossChainIntent;
use crate::sidechain::params::CreationParameters;
use crate::sidechain::types::{Epoch, SidechainId, EPOCH_NULL};
use crate::sidechain::StructuralError;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sidechain {
    pub creation_height: u32,
    pub creation_tx: Hash256,
    pub params: CreationParameters,
    /// Mature balance available to certificates
    pub balance: Amount,
    pub last_certificate_epoch: Epoch,
    /// Maturity height -> amount
    pub immature_amounts: BTreeMap<u32, Amount>,
}

impl Sidechain {
    pub fn new(creation_height: u32, creation_tx: Hash256, params: CreationParameters) -> Self {
        Self {
            creation_height,
            creation_tx,
            params,
            balance: 0,
            last_certificate_epoch: EPOCH_NULL,
            immature_amounts: BTreeMap::new(),
        }
    }

    /// Zero amounts leave no entry behind
    pub fn add_immature(&mut self, maturity_height: u32, amount: Amount) {
        if amount == 0 {
            return;
        }
        *self.immature_amounts.entry(maturity_height).or_insert(0) += amount;
    }

    /// Remove `amount` from the entry at `maturity_height`, dropping the
    /// entry once it reaches zero. Returns false if the entry cannot cover it.
    pub fn decrement_immature(&mut self, maturity_height: u32, amount: Amount) -> bool {
        if amount == 0 {
            return true;
        }
        let Some(current) = self.immature_amounts.get_mut(&maturity_height) else {
            return false;
        };
        if *current < amount {
            return false;
        }
        *current -= amount;
        if *current == 0 {
            self.immature_amounts.remove(&maturity_height);
        }
        true
    }

    /// Move whatever matures at `height` into the balance
    pub fn mature(&mut self, height: u32) -> Option<Amount> {
        let amount = self.immature_amounts.remove(&height)?;
        self.balance += amount;
        log::debug!(
            "sc: matured {} at height {}, balance now {}",
            format_money(amount),
            height,
            format_money(self.balance)
        );
        Some(amount)
    }

    pub fn immature_total(&self) -> Amount {
        self.immature_amounts.values().sum()
    }

    /// Capability check for outputs targeting this sidechain
    pub fn accepts(&self, intent: &CrossChainIntent) -> Result<(), StructuralError> {
        match intent {
            CrossChainIntent::WithdrawalRequest { .. }
                if !self.params.supports_withdrawal_requests() =>
            {
                Err(StructuralError::MissingVerificationKey("mbtr"))
            }
            _ => Ok(()),
        }
    }
}

/// All known sidechains, ordered by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidechainView {
    sidechains: BTreeMap<SidechainId, Sidechain>,
}

impl SidechainView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &SidechainId) -> Option<&Sidechain> {
        self.sidechains.get(id)
    }

    pub fn get_mut(&mut self, id: &SidechainId) -> Option<&mut Sidechain> {
        self.sidechains.get_mut(id)
    }

    pub fn contains(&self, id: &SidechainId) -> bool {
        self.sidechains.contains_key(id)
    }

    pub fn insert(&mut self, id: SidechainId, sidechain: Sidechain) -> Option<Sidechain> {
        self.sidechains.insert(id, sidechain)
    }

    pub fn remove(&mut self, id: &SidechainId) -> Option<Sidechain> {
        self.sidechains.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sidechains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sidechains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SidechainId, &Sidechain)> {
        self.sidechains.iter()
    }

    /// Sidechains with value maturing at `height`
    pub fn maturing_at(&self, height: u32) -> Vec<SidechainId> {
        self.sidechains
            .iter()
            .filter(|(_, sc)| sc.immature_amounts.contains_key(&height))
            .map(|(id, _)| *id)
            .collect()
    }
}
