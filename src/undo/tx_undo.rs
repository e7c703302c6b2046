use crate::encoding::{Decodable, Encodable, FormatError};
use crate::undo::OutputUndo;
use bytes::{Buf, BufMut};
use serde::Serialize;

/// Undo records for every input of one non-coinbase transaction, in input order.
///
/// The record count must match the transaction's input count; that is
/// checked by whoever applies the undo, not here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TxUndo {
    pub prevouts: Vec<OutputUndo>,
}

impl TxUndo {
    pub fn new(prevouts: Vec<OutputUndo>) -> Self {
        Self { prevouts }
    }

    pub fn len(&self) -> usize {
        self.prevouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prevouts.is_empty()
    }
}

impl Encodable for TxUndo {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.prevouts.encode(buf);
    }

    fn encoded_len(&self) -> usize {
        self.prevouts.encoded_len()
    }
}

impl Decodable for TxUndo {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, FormatError> {
        Ok(Self::new(Vec::decode(buf)?))
    }
}
