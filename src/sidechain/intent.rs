//! Cross-chain outputs a transaction can carry
//!
//! Three shapes move value across the mainchain/sidechain boundary:
//! - `Creation`: opens a new sidechain and seeds it with a value
//! - `ForwardTransfer`: sends value to an existing sidechain
//! - `WithdrawalRequest`: asks a sidechain to pay out to a mainchain
//!   address; the fee is the only value it moves

use crate::core::amount::{money_range, Amount};
use crate::crypto::Hash256;
use crate::sidechain::params::{BwtRequestParameters, CreationParameters};
use crate::sidechain::types::{McAddress, SidechainId};
use crate::sidechain::StructuralError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrossChainIntent {
    Creation {
        /// Sidechain-side receiver of the initial value
        destination: Hash256,
        value: Amount,
        params: CreationParameters,
    },
    ForwardTransfer {
        destination: Hash256,
        value: Amount,
        sidechain_id: SidechainId,
    },
    WithdrawalRequest {
        sidechain_id: SidechainId,
        mc_destination: McAddress,
        params: BwtRequestParameters,
    },
}

impl CrossChainIntent {
    pub fn creation(destination: Hash256, value: Amount, params: CreationParameters) -> Self {
        Self::Creation {
            destination,
            value,
            params,
        }
    }

    pub fn forward_transfer(destination: Hash256, value: Amount, sidechain_id: SidechainId) -> Self {
        Self::ForwardTransfer {
            destination,
            value,
            sidechain_id,
        }
    }

    pub fn withdrawal_request(
        sidechain_id: SidechainId,
        mc_destination: McAddress,
        params: BwtRequestParameters,
    ) -> Self {
        Self::WithdrawalRequest {
            sidechain_id,
            mc_destination,
            params,
        }
    }

    /// Value this output moves into the target sidechain
    pub fn scoped_value(&self) -> Amount {
        match self {
            Self::Creation { value, .. } | Self::ForwardTransfer { value, .. } => *value,
            Self::WithdrawalRequest { params, .. } => params.fee,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Self::Creation {
                destination,
                value,
                params,
            } => destination.is_null() && *value == 0 && params.is_null(),
            Self::ForwardTransfer {
                destination,
                value,
                sidechain_id,
            } => destination.is_null() && *value == 0 && sidechain_id.is_null(),
            Self::WithdrawalRequest {
                sidechain_id,
                mc_destination,
                params,
            } => sidechain_id.is_null() && mc_destination.is_null() && params.is_null(),
        }
    }

    /// Sidechain an existing-chain intent targets.
    ///
    /// A creation has no target yet; its id is assigned from the creating
    /// transaction and output position (see `creation_sidechain_id`).
    pub fn target_sidechain(&self) -> Option<SidechainId> {
        match self {
            Self::Creation { .. } => None,
            Self::ForwardTransfer { sidechain_id, .. }
            | Self::WithdrawalRequest { sidechain_id, .. } => Some(*sidechain_id),
        }
    }

    /// Well-formedness of the output on its own
    pub fn validate(&self) -> Result<(), StructuralError> {
        if self.is_null() {
            return Err(StructuralError::NullIntent);
        }
        match self {
            Self::Creation { value, params, .. } => {
                check_positive(*value)?;
                params.validate()
            }
            Self::ForwardTransfer { value, .. } => check_positive(*value),
            Self::WithdrawalRequest { params, .. } => params.validate(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Creation { .. } => "creation",
            Self::ForwardTransfer { .. } => "forward transfer",
            Self::WithdrawalRequest { .. } => "withdrawal request",
        }
    }
}

fn check_positive(value: Amount) -> Result<(), StructuralError> {
    if value <= 0 || !money_range(value) {
        return Err(StructuralError::AmountOutOfRange(value));
    }
    Ok(())
}

/// Id of the sidechain opened by the `index`-th cross-chain output of `txid`
pub fn creation_sidechain_id(txid: &Hash256, index: u32) -> SidechainId {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(txid.as_bytes());
    data.extend_from_slice(&index.to_le_bytes());
    Hash256::digest(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::amount::COIN;
    use crate::sidechain::types::{VerifyingKey, SC_VK_SIZE};

    fn sc_id() -> SidechainId {
        Hash256::digest(b"sidechain")
    }

    fn creation_params() -> CreationParameters {
        let vk = VerifyingKey::from_bytes(vec![1u8; SC_VK_SIZE]).unwrap();
        CreationParameters::new(10, vk)
    }

    #[test]
    fn test_scoped_value() {
        let cr = CrossChainIntent::creation(Hash256::digest(b"a"), 5 * COIN, creation_params());
        let ft = CrossChainIntent::forward_transfer(Hash256::digest(b"b"), 3 * COIN, sc_id());
        let mut bwt = BwtRequestParameters::default();
        bwt.fee = 42;
        let req = CrossChainIntent::withdrawal_request(sc_id(), McAddress([1; 20]), bwt);

        assert_eq!(cr.scoped_value(), 5 * COIN);
        assert_eq!(ft.scoped_value(), 3 * COIN);
        assert_eq!(req.scoped_value(), 42);
    }

    #[test]
    fn test_null_variants() {
        let cr = CrossChainIntent::creation(Hash256::ZERO, 0, CreationParameters::default());
        let ft = CrossChainIntent::forward_transfer(Hash256::ZERO, 0, Hash256::ZERO);
        let req = CrossChainIntent::withdrawal_request(
            Hash256::ZERO,
            McAddress::default(),
            BwtRequestParameters::default(),
        );
        assert!(cr.is_null());
        assert!(ft.is_null());
        assert!(req.is_null());
        assert_eq!(ft.validate(), Err(StructuralError::NullIntent));

        let ft = CrossChainIntent::forward_transfer(Hash256::ZERO, 1, Hash256::ZERO);
        assert!(!ft.is_null());
    }

    #[test]
    fn test_target_sidechain() {
        let cr = CrossChainIntent::creation(Hash256::digest(b"a"), 1, creation_params());
        let ft = CrossChainIntent::forward_transfer(Hash256::digest(b"b"), 1, sc_id());
        assert_eq!(cr.target_sidechain(), None);
        assert_eq!(ft.target_sidechain(), Some(sc_id()));
    }

    #[test]
    fn test_validate_checks_params_and_value() {
        let mut params = creation_params();
        params.custom_data = vec![0; 2000];
        let cr = CrossChainIntent::creation(Hash256::digest(b"a"), COIN, params);
        assert!(matches!(
            cr.validate(),
            Err(StructuralError::CustomDataTooLong { len: 2000, .. })
        ));

        let ft = CrossChainIntent::forward_transfer(Hash256::digest(b"b"), -5, sc_id());
        assert_eq!(ft.validate(), Err(StructuralError::AmountOutOfRange(-5)));

        let ft = CrossChainIntent::forward_transfer(Hash256::digest(b"b"), COIN, sc_id());
        assert!(ft.validate().is_ok());
    }

    #[test]
    fn test_creation_ids_differ_by_position() {
        let txid = Hash256::digest(b"tx");
        assert_ne!(creation_sidechain_id(&txid, 0), creation_sidechain_id(&txid, 1));
    }
}
