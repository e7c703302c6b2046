//! Parameter bundles carried by cross-chain outputs

use crate::core::amount::{money_range, Amount};
use crate::sidechain::types::{FieldElement, ScConstant, ScProof, VerifyingKey, MAX_SC_DATA_LEN};
use crate::sidechain::StructuralError;

// =============================================================================
// Creation Parameters
// =============================================================================

/// Everything a sidechain declares about itself at creation.
///
/// Equality compares every field, including
/// `ceased_sidechain_verification_key`: two creations that differ only in
/// their ceased-sidechain key describe different sidechains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationParameters {
    /// Blocks per withdrawal epoch; -1 when unset
    pub withdrawal_epoch_length: i32,
    pub custom_data: Vec<u8>,
    pub constant: ScConstant,
    pub certificate_verification_key: VerifyingKey,
    /// Present iff the sidechain accepts mainchain withdrawal requests
    pub mbtr_verification_key: Option<VerifyingKey>,
    /// Present iff the sidechain accepts ceased-sidechain withdrawals
    pub ceased_sidechain_verification_key: Option<VerifyingKey>,
}

impl Default for CreationParameters {
    fn default() -> Self {
        Self {
            withdrawal_epoch_length: -1,
            custom_data: Vec::new(),
            constant: ScConstant::default(),
            certificate_verification_key: VerifyingKey::default(),
            mbtr_verification_key: None,
            ceased_sidechain_verification_key: None,
        }
    }
}

impl CreationParameters {
    /// Parameters with the mandatory certificate key and epoch length set
    pub fn new(withdrawal_epoch_length: i32, certificate_verification_key: VerifyingKey) -> Self {
        Self {
            withdrawal_epoch_length,
            certificate_verification_key,
            ..Default::default()
        }
    }

    pub fn is_null(&self) -> bool {
        self.withdrawal_epoch_length == -1
            && self.custom_data.is_empty()
            && self.constant.is_empty()
            && self.certificate_verification_key.is_null()
            && self.mbtr_verification_key.is_none()
            && self.ceased_sidechain_verification_key.is_none()
    }

    pub fn supports_withdrawal_requests(&self) -> bool {
        self.mbtr_verification_key.is_some()
    }

    /// Well-formedness only; proof-system validity is not checked here.
    pub fn validate(&self) -> Result<(), StructuralError> {
        if self.custom_data.len() > MAX_SC_DATA_LEN {
            return Err(StructuralError::CustomDataTooLong {
                len: self.custom_data.len(),
                max: MAX_SC_DATA_LEN,
            });
        }
        if self.withdrawal_epoch_length <= 0 {
            return Err(StructuralError::InvalidEpochLength(
                self.withdrawal_epoch_length,
            ));
        }
        if self.certificate_verification_key.is_null() {
            return Err(StructuralError::MissingVerificationKey("certificate"));
        }
        if matches!(&self.mbtr_verification_key, Some(vk) if vk.is_null()) {
            return Err(StructuralError::MissingVerificationKey("mbtr"));
        }
        if matches!(&self.ceased_sidechain_verification_key, Some(vk) if vk.is_null()) {
            return Err(StructuralError::MissingVerificationKey("ceased sidechain"));
        }
        Ok(())
    }
}

// =============================================================================
// Withdrawal Request Parameters
// =============================================================================

/// Proof-carrying part of a mainchain backward-transfer request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BwtRequestParameters {
    /// Fee paid to the sidechain for processing the request
    pub fee: Amount,
    pub sidechain_utxo_id: FieldElement,
    pub proof: ScProof,
}

impl BwtRequestParameters {
    pub fn new(fee: Amount, sidechain_utxo_id: FieldElement, proof: ScProof) -> Self {
        Self {
            fee,
            sidechain_utxo_id,
            proof,
        }
    }

    pub fn is_null(&self) -> bool {
        self.fee == 0 && self.sidechain_utxo_id.is_null() && self.proof.is_null()
    }

    pub fn validate(&self) -> Result<(), StructuralError> {
        if !money_range(self.fee) {
            return Err(StructuralError::AmountOutOfRange(self.fee));
        }
        Ok(())
    }
}
