//! Block undo log and its two wire generations
//!
//! ```text
//!   legacy:  CompactSize(n)  TxUndo * n  root
//!   current: CompactSize(0xFEC1)  Vec<TxUndo>  root  Map<SidechainId, SidechainUndo>
//! ```
//!
//! Decoding reads the leading integer once. The marker selects the current
//! layout; anything else is the legacy transaction count and is used as
//! such without reading it again.

use crate::crypto::Hash256;
use crate::encoding::{decode_entries, CompactSize, Decodable, Encodable, FormatError};
use crate::sidechain::{SidechainId, StructuralError};
use crate::undo::{SidechainUndo, TxUndo, UndoFormat, FORMAT_MARKER};
use bytes::{Buf, BufMut};
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// Block Undo
// =============================================================================

/// Everything needed to disconnect one block.
///
/// Instances are only produced whole, by [`BlockUndoBuilder::build`] or by
/// decoding, and are immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockUndo {
    /// One entry per non-coinbase transaction, in block order
    tx_undos: Vec<TxUndo>,
    prior_commitment_root: Hash256,
    sidechain_undos: BTreeMap<SidechainId, SidechainUndo>,
    format: UndoFormat,
}

impl BlockUndo {
    pub fn tx_undos(&self) -> &[TxUndo] {
        &self.tx_undos
    }

    pub fn prior_commitment_root(&self) -> &Hash256 {
        &self.prior_commitment_root
    }

    pub fn sidechain_undos(&self) -> &BTreeMap<SidechainId, SidechainUndo> {
        &self.sidechain_undos
    }

    pub fn sidechain_undo(&self, id: &SidechainId) -> Option<&SidechainUndo> {
        self.sidechain_undos.get(id)
    }

    /// Generation the log was decoded from; `Current` for built logs
    pub fn format(&self) -> UndoFormat {
        self.format
    }

    pub fn is_legacy(&self) -> bool {
        self.format == UndoFormat::Legacy
    }

    /// Number of spent outputs recorded across all transactions
    pub fn input_count(&self) -> usize {
        self.tx_undos.iter().map(TxUndo::len).sum()
    }

    fn decode_current<B: Buf>(buf: &mut B) -> Result<Self, FormatError> {
        Ok(Self {
            tx_undos: Vec::decode(buf)?,
            prior_commitment_root: Hash256::decode(buf)?,
            sidechain_undos: BTreeMap::decode(buf)?,
            format: UndoFormat::Current,
        })
    }

    fn decode_legacy<B: Buf>(buf: &mut B, tx_count: u64) -> Result<Self, FormatError> {
        Ok(Self {
            tx_undos: decode_entries(buf, tx_count)?,
            prior_commitment_root: Hash256::decode(buf)?,
            sidechain_undos: BTreeMap::new(),
            format: UndoFormat::Legacy,
        })
    }
}

impl Encodable for BlockUndo {
    /// Always the current layout, whatever the log was read from
    fn encode<B: BufMut>(&self, buf: &mut B) {
        CompactSize::write(buf, FORMAT_MARKER);
        self.tx_undos.encode(buf);
        self.prior_commitment_root.encode(buf);
        self.sidechain_undos.encode(buf);
    }

    fn encoded_len(&self) -> usize {
        CompactSize::size(FORMAT_MARKER)
            + self.tx_undos.encoded_len()
            + self.prior_commitment_root.encoded_len()
            + self.sidechain_undos.encoded_len()
    }
}

impl Decodable for BlockUndo {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, FormatError> {
        let leading = CompactSize::read_len(buf)?;
        match UndoFormat::from_leading(leading) {
            UndoFormat::Current => Self::decode_current(buf),
            UndoFormat::Legacy => Self::decode_legacy(buf, leading),
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Accumulates a block's undo data while it is being connected.
#[derive(Debug, Default)]
pub struct BlockUndoBuilder {
    tx_undos: Vec<TxUndo>,
    prior_commitment_root: Hash256,
    sidechain_undos: BTreeMap<SidechainId, SidechainUndo>,
}

impl BlockUndoBuilder {
    pub fn new(prior_commitment_root: Hash256) -> Self {
        Self {
            prior_commitment_root,
            ..Default::default()
        }
    }

    pub fn push_tx_undo(&mut self, tx_undo: TxUndo) {
        self.tx_undos.push(tx_undo);
    }

    /// Add the single rollback entry for `id`; a second one is rejected.
    pub fn record_sidechain(
        &mut self,
        id: SidechainId,
        undo: SidechainUndo,
    ) -> Result<(), StructuralError> {
        if self.sidechain_undos.contains_key(&id) {
            return Err(StructuralError::DuplicateSidechainUndo(id));
        }
        self.sidechain_undos.insert(id, undo);
        Ok(())
    }

    pub fn has_sidechain(&self, id: &SidechainId) -> bool {
        self.sidechain_undos.contains_key(id)
    }

    pub fn build(self) -> BlockUndo {
        BlockUndo {
            tx_undos: self.tx_undos,
            prior_commitment_root: self.prior_commitment_root,
            sidechain_undos: self.sidechain_undos,
            format: UndoFormat::Current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::amount::COIN;
    use crate::core::block::MAX_BLOCK_TXS;
    use crate::core::transaction::TxOutput;
    use crate::undo::OutputUndo;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn tx_undo(seed: u8, inputs: usize) -> TxUndo {
        TxUndo::new(
            (0..inputs)
                .map(|i| {
                    let output = TxOutput::pay_to_pubkey_hash(COIN + i as i64, &[seed; 20]);
                    if i == 0 {
                        OutputUndo::with_metadata(output, seed % 2 == 0, 100 + seed as u32, 1)
                    } else {
                        OutputUndo::new(output)
                    }
                })
                .collect(),
        )
    }

    fn legacy_bytes(tx_undos: &[TxUndo], root: &Hash256) -> Vec<u8> {
        let mut out = Vec::new();
        CompactSize::write(&mut out, tx_undos.len() as u64);
        for undo in tx_undos {
            undo.encode(&mut out);
        }
        root.encode(&mut out);
        out
    }

    #[test]
    fn test_legacy_fallback() {
        let tx_undos = vec![tx_undo(1, 2), tx_undo(2, 1)];
        let root = Hash256::digest(b"root");
        let bytes = legacy_bytes(&tx_undos, &root);

        let decoded = BlockUndo::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.format(), UndoFormat::Legacy);
        assert!(decoded.sidechain_undos().is_empty());
        assert_eq!(decoded.tx_undos().len(), 2);
        assert_eq!(decoded.tx_undos(), tx_undos.as_slice());
        assert_eq!(decoded.prior_commitment_root(), &root);
    }

    #[test]
    fn test_legacy_consumes_exact_bytes() {
        let root = Hash256::digest(b"root");
        let mut bytes = legacy_bytes(&[tx_undo(3, 1)], &root);
        let record_len = bytes.len();
        bytes.extend_from_slice(&[0xAA, 0xBB]);

        let mut cursor = bytes.as_slice();
        BlockUndo::decode(&mut cursor).unwrap();
        assert_eq!(cursor, &[0xAA, 0xBB]);
        assert_eq!(bytes.len() - cursor.len(), record_len);
    }

    #[test]
    fn test_legacy_empty_block() {
        let root = Hash256::digest(b"empty");
        let decoded = BlockUndo::from_bytes(&legacy_bytes(&[], &root)).unwrap();
        assert!(decoded.is_legacy());
        assert!(decoded.tx_undos().is_empty());
    }

    #[test]
    fn test_current_round_trip() {
        let sc_id = Hash256::digest(b"sidechain");
        let mut builder = BlockUndoBuilder::new(Hash256::digest(b"anchor"));
        builder.push_tx_undo(tx_undo(1, 3));
        builder.push_tx_undo(tx_undo(2, 1));
        builder
            .record_sidechain(sc_id, SidechainUndo::new(7 * COIN, 4))
            .unwrap();
        let undo = builder.build();

        let bytes = undo.to_bytes();
        assert_eq!(&bytes[..3], &[0xFD, 0xC1, 0xFE]);
        assert_eq!(bytes.len(), undo.encoded_len());

        let decoded = BlockUndo::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.format(), UndoFormat::Current);
        assert_eq!(decoded.tx_undos(), undo.tx_undos());
        assert_eq!(decoded.prior_commitment_root(), &Hash256::digest(b"anchor"));
        assert_eq!(
            decoded.sidechain_undo(&sc_id),
            Some(&SidechainUndo::new(7 * COIN, 4))
        );
        assert_eq!(decoded, undo);
        assert_eq!(decoded.input_count(), 4);
    }

    #[test]
    fn test_legacy_reencodes_as_current() {
        let tx_undos = vec![tx_undo(5, 1)];
        let root = Hash256::digest(b"old");
        let legacy = BlockUndo::from_bytes(&legacy_bytes(&tx_undos, &root)).unwrap();

        let upgraded = BlockUndo::from_bytes(&legacy.to_bytes()).unwrap();
        assert_eq!(upgraded.format(), UndoFormat::Current);
        assert_eq!(upgraded.tx_undos(), legacy.tx_undos());
        assert_eq!(upgraded.prior_commitment_root(), legacy.prior_commitment_root());
        assert_eq!(legacy.encoded_len(), legacy.to_bytes().len());
    }

    #[test]
    fn test_marker_never_a_legacy_count() {
        assert!((MAX_BLOCK_TXS as u64) < FORMAT_MARKER);

        let mut rng = StdRng::seed_from_u64(0xFEC1);
        let root = Hash256::digest(b"r");
        let mut counts: Vec<usize> = (0..24).map(|_| rng.gen_range(0..=MAX_BLOCK_TXS)).collect();
        counts.push(MAX_BLOCK_TXS);

        for count in counts {
            assert!((count as u64) < FORMAT_MARKER);
            let tx_undos = vec![TxUndo::default(); count];
            let bytes = legacy_bytes(&tx_undos, &root);
            assert_eq!(UndoFormat::sniff(&bytes).unwrap(), UndoFormat::Legacy);

            let decoded = BlockUndo::from_bytes(&bytes).unwrap();
            assert!(decoded.is_legacy());
            assert_eq!(decoded.tx_undos().len(), count);
        }
    }

    #[test]
    fn test_random_current_round_trip() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let mut builder = BlockUndoBuilder::new(Hash256(rng.gen()));
            for seed in 0..rng.gen_range(0..6u8) {
                builder.push_tx_undo(tx_undo(seed, rng.gen_range(0..4)));
            }
            for _ in 0..rng.gen_range(0..4) {
                let id = Hash256(rng.gen());
                let entry = SidechainUndo::new(rng.gen_range(0..COIN), rng.gen_range(-2..100));
                builder.record_sidechain(id, entry).unwrap();
            }
            let undo = builder.build();
            let bytes = undo.to_bytes();
            assert_eq!(bytes.len(), undo.encoded_len());
            assert_eq!(BlockUndo::from_bytes(&bytes).unwrap(), undo);
        }
    }

    #[test]
    fn test_sidechain_entries_sorted_on_wire() {
        let low = Hash256([0x01; 32]);
        let high = Hash256([0xF0; 32]);
        let mut builder = BlockUndoBuilder::new(Hash256::ZERO);
        builder.record_sidechain(high, SidechainUndo::new(2, 0)).unwrap();
        builder.record_sidechain(low, SidechainUndo::new(1, 0)).unwrap();
        let bytes = builder.build().to_bytes();

        // marker(3) + empty tx list(1) + root(32) + map count(1)
        let first_key = &bytes[37..69];
        assert_eq!(first_key, low.as_bytes());
    }

    #[test]
    fn test_duplicate_sidechain_rejected() {
        let id = Hash256::digest(b"sc");
        let mut builder = BlockUndoBuilder::new(Hash256::ZERO);
        builder.record_sidechain(id, SidechainUndo::new(1, 0)).unwrap();
        assert_eq!(
            builder.record_sidechain(id, SidechainUndo::new(2, 0)),
            Err(StructuralError::DuplicateSidechainUndo(id))
        );
        assert_eq!(builder.build().sidechain_undo(&id).unwrap().matured_amount, 1);
    }

    #[test]
    fn test_truncated_current() {
        let mut builder = BlockUndoBuilder::new(Hash256::digest(b"x"));
        builder.push_tx_undo(tx_undo(1, 1));
        let bytes = builder.build().to_bytes();
        assert!(matches!(
            BlockUndo::from_bytes(&bytes[..bytes.len() - 1]),
            Err(FormatError::Truncated { .. })
        ));
    }

    #[test]
    fn test_legacy_count_exceeding_input() {
        // Claims 200 transactions but carries none
        let mut bytes = vec![200];
        bytes.extend_from_slice(&[0u8; 32]);
        assert!(BlockUndo::from_bytes(&bytes[..10]).is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = BlockUndoBuilder::new(Hash256::ZERO).build().to_bytes();
        bytes.push(0);
        assert_eq!(BlockUndo::from_bytes(&bytes), Err(FormatError::TrailingBytes(1)));
    }

    #[test]
    fn test_json_export_shape() {
        let mut builder = BlockUndoBuilder::new(Hash256::ZERO);
        builder.push_tx_undo(tx_undo(1, 1));
        let json = serde_json::to_value(builder.build()).unwrap();
        assert_eq!(json["format"], "current");
        assert_eq!(json["tx_undos"][0]["prevouts"][0]["height"], 101);
    }
}
