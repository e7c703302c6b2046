use crate::core::amount::Amount;
use crate::encoding::{Decodable, Encodable, FormatError};
use crate::sidechain::{Epoch, Sidechain, EPOCH_NOT_INITIALIZED};
use bytes::{Buf, BufMut};
use serde::Serialize;

/// Rollback data for one sidechain touched by a block.
///
/// `matured_amount` is what became part of the balance in this block;
/// `prior_certificate_epoch` is the epoch the sidechain held before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SidechainUndo {
    pub matured_amount: Amount,
    pub prior_certificate_epoch: Epoch,
}

impl Default for SidechainUndo {
    fn default() -> Self {
        Self {
            matured_amount: 0,
            prior_certificate_epoch: EPOCH_NOT_INITIALIZED,
        }
    }
}

impl SidechainUndo {
    pub fn new(matured_amount: Amount, prior_certificate_epoch: Epoch) -> Self {
        Self {
            matured_amount,
            prior_certificate_epoch,
        }
    }

    /// Roll `sidechain` back across the block at `height`.
    ///
    /// The matured amount leaves the balance and goes back to the immature
    /// entry it came from; the epoch is restored verbatim.
    pub fn apply_to(&self, sidechain: &mut Sidechain, height: u32) {
        sidechain.balance -= self.matured_amount;
        if self.matured_amount > 0 {
            sidechain.add_immature(height, self.matured_amount);
        }
        sidechain.last_certificate_epoch = self.prior_certificate_epoch;
    }
}

impl Encodable for SidechainUndo {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.matured_amount.encode(buf);
        self.prior_certificate_epoch.encode(buf);
    }

    fn encoded_len(&self) -> usize {
        12
    }
}

impl Decodable for SidechainUndo {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, FormatError> {
        Ok(Self {
            matured_amount: Amount::decode(buf)?,
            prior_certificate_epoch: Epoch::decode(buf)?,
        })
    }
}
