//! Ledger implementation
//!
//! The ledger owns the active chain, its chain state and the undo store.
//! Every connected block has its undo log persisted before the block
//! becomes the tip, and disconnecting the tip consumes that log.
//! Changes are announced on the validation bus.

use crate::core::block::Block;
use crate::core::chain_state::{touched_sidechains, ChainState, ChainStateError, DisconnectStatus};
use crate::crypto::Hash256;
use crate::encoding::Encodable;
use crate::notify::{ValidationBus, ValidationEvent};
use crate::sidechain::EPOCH_NULL;
use crate::storage::{StorageError, UndoStore};
use crate::undo::BlockUndo;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// Configuration
// =============================================================================

/// Network the ledger follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Main,
    Test,
    Regtest,
}

impl Network {
    /// Blocks before cross-chain value joins a sidechain balance
    pub fn sc_coin_maturity(&self) -> u32 {
        match self {
            Network::Main | Network::Test => 10,
            Network::Regtest => 2,
        }
    }
}

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maturity override, honoured on regtest only
    pub sc_coin_maturity: Option<u32>,
    pub network: Network,
}

impl LedgerConfig {
    pub fn regtest(sc_coin_maturity: u32) -> Self {
        Self {
            sc_coin_maturity: Some(sc_coin_maturity),
            network: Network::Regtest,
        }
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn effective_maturity(&self) -> u32 {
        match (self.network, self.sc_coin_maturity) {
            (Network::Regtest, Some(maturity)) => maturity,
            (network, _) => network.sc_coin_maturity(),
        }
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Active chain with persisted undo logs
pub struct Ledger<S: UndoStore> {
    blocks: Vec<Block>,
    state: ChainState,
    store: S,
    bus: Arc<ValidationBus>,
}

impl<S: UndoStore> Ledger<S> {
    pub fn new(config: &LedgerConfig, store: S) -> Self {
        let maturity = config.effective_maturity();
        log::info!(
            "ledger on {:?} network, sidechain coin maturity {}",
            config.network,
            maturity
        );
        Self {
            blocks: Vec::new(),
            state: ChainState::new(maturity),
            store,
            bus: Arc::new(ValidationBus::new()),
        }
    }

    pub fn bus(&self) -> &Arc<ValidationBus> {
        &self.bus
    }

    pub fn state(&self) -> &ChainState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Height the next block must have
    pub fn next_height(&self) -> u32 {
        self.tip().map_or(0, |b| b.height + 1)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Connect `block` on top of the tip and store its undo log
    pub fn connect(&mut self, block: Block) -> Result<(), ChainStateError> {
        let expected = self.next_height();
        if block.height != expected {
            return Err(ChainStateError::NotTip {
                block: block.hash,
                expected,
                got: block.height,
            });
        }

        let mut next = self.state.clone();
        let undo = next.connect_block(&block)?;
        self.store.put(&block.hash, &undo)?;
        self.state = next;

        log::info!(
            "connected block {} at height {} ({} txs)",
            block.hash,
            block.height,
            block.transactions.len()
        );
        self.bus.publish(&ValidationEvent::BlockConnected {
            block: block.hash,
            height: block.height,
            tx_count: block.transactions.len(),
            undo_size: undo.encoded_len(),
        });
        self.publish_sidechains(&block, &undo);
        self.blocks.push(block);
        Ok(())
    }

    /// Disconnect the tip. Returns `None` when the chain is empty.
    ///
    /// A missing or unreadable undo log aborts with the storage error and
    /// leaves the chain as it was.
    pub fn disconnect_tip(&mut self) -> Result<Option<DisconnectStatus>, ChainStateError> {
        let Some(block) = self.blocks.last() else {
            return Ok(None);
        };
        let undo = self.store.get(&block.hash)?;
        let status = self.state.disconnect_block(block, &undo)?;

        if let Some(block) = self.blocks.pop() {
            log::info!(
                "disconnected block {} at height {} ({:?})",
                block.hash,
                block.height,
                status
            );
            self.bus.publish(&ValidationEvent::BlockDisconnected {
                block: block.hash,
                height: block.height,
                clean: status == DisconnectStatus::Clean,
            });
            self.publish_sidechains(&block, &undo);
        }
        Ok(Some(status))
    }

    /// Block ids of the active chain, genesis first
    pub fn block_ids(&self) -> Vec<Hash256> {
        self.blocks.iter().map(|b| b.hash).collect()
    }

    fn publish_sidechains(&self, block: &Block, undo: &BlockUndo) {
        for id in touched_sidechains(block, undo) {
            let event = match self.state.sidechain(&id) {
                Some(sc) => ValidationEvent::SidechainUpdated {
                    sidechain: id,
                    block: block.hash,
                    exists: true,
                    balance: sc.balance,
                    last_certificate_epoch: sc.last_certificate_epoch,
                },
                None => ValidationEvent::SidechainUpdated {
                    sidechain: id,
                    block: block.hash,
                    exists: false,
                    balance: 0,
                    last_certificate_epoch: EPOCH_NULL,
                },
            };
            self.bus.publish(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::amount::COIN;
    use crate::core::transaction::{
        Certificate, OutPoint, Transaction, TxOutput, TRANSPARENT_TX_VERSION,
    };
    use crate::notify::{EventKind, ValidationSubscriber};
    use crate::sidechain::{
        creation_sidechain_id, CreationParameters, CrossChainIntent, VerifyingKey, SC_VK_SIZE,
    };
    use crate::storage::{FileUndoStore, MemoryUndoStore, StorageConfig};
    use crate::undo::UndoFormat;
    use std::sync::Mutex;

    fn ledger() -> Ledger<MemoryUndoStore> {
        Ledger::new(&LedgerConfig::regtest(2), MemoryUndoStore::new())
    }

    fn next_block<S: UndoStore>(
        ledger: &Ledger<S>,
        txs: Vec<Transaction>,
        certs: Vec<Certificate>,
    ) -> Block {
        let height = ledger.next_height();
        let prev = ledger.tip().map_or(Hash256::ZERO, |b| b.hash);
        let coinbase = Transaction::coinbase(
            height,
            vec![TxOutput::pay_to_pubkey_hash(50 * COIN, &[height as u8; 20])],
        );
        let mut transactions = vec![coinbase];
        transactions.extend(txs);
        let root = Hash256::digest(&height.to_le_bytes());
        Block::new(prev, height, transactions, certs, root)
    }

    fn creation_tx(funding: &Transaction) -> Transaction {
        let vk = VerifyingKey::from_bytes(vec![3u8; SC_VK_SIZE]).unwrap();
        Transaction::new(
            TRANSPARENT_TX_VERSION,
            vec![OutPoint::new(funding.txid, 0)],
            vec![TxOutput::pay_to_pubkey_hash(40 * COIN, &[9; 20])],
        )
        .with_cross_chain(vec![CrossChainIntent::creation(
            Hash256::digest(b"dest"),
            10 * COIN,
            CreationParameters::new(5, vk),
        )])
    }

    fn recorder(bus: &ValidationBus) -> Arc<Mutex<Vec<ValidationEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        for kind in EventKind::ALL {
            let sink = Arc::clone(&events);
            let subscriber: Arc<dyn ValidationSubscriber> =
                Arc::new(move |e: &ValidationEvent| sink.lock().unwrap().push(e.clone()));
            bus.subscribe(kind, subscriber);
        }
        events
    }

    #[test]
    fn test_config_maturity() {
        assert_eq!(LedgerConfig::default().effective_maturity(), 10);
        assert_eq!(LedgerConfig::regtest(4).effective_maturity(), 4);

        let ignored = LedgerConfig {
            sc_coin_maturity: Some(1),
            network: Network::Main,
        };
        assert_eq!(ignored.effective_maturity(), 10);
    }

    #[test]
    fn test_config_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("ledger.json");
        fs::write(&path, r#"{"network":"regtest","sc_coin_maturity":3}"#).unwrap();
        assert_eq!(LedgerConfig::load(&path).unwrap(), LedgerConfig::regtest(3));

        fs::write(&path, "{}").unwrap();
        assert_eq!(LedgerConfig::load(&path).unwrap(), LedgerConfig::default());

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            LedgerConfig::load(&path),
            Err(StorageError::SerializationError(_))
        ));
    }

    #[test]
    fn test_connect_stores_undo() {
        let mut ledger = ledger();
        let genesis = next_block(&ledger, vec![], vec![]);
        ledger.connect(genesis.clone()).unwrap();

        assert_eq!(ledger.len(), 1);
        assert!(ledger.store().contains(&genesis.hash));
        let undo = ledger.store().get(&genesis.hash).unwrap();
        assert_eq!(undo.format(), UndoFormat::Current);
        assert_eq!(undo.prior_commitment_root(), &Hash256::ZERO);
    }

    #[test]
    fn test_connect_rejects_wrong_height() {
        let mut ledger = ledger();
        ledger.connect(next_block(&ledger, vec![], vec![])).unwrap();

        let stale = Block::new(Hash256::ZERO, 0, vec![], vec![], Hash256::ZERO);
        let err = ledger.connect(stale).unwrap_err();
        assert!(matches!(err, ChainStateError::NotTip { expected: 1, got: 0, .. }));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_sidechain_events_round_trip() {
        let mut ledger = ledger();
        ledger.connect(next_block(&ledger, vec![], vec![])).unwrap();
        let funding = next_block(&ledger, vec![], vec![]);
        ledger.connect(funding.clone()).unwrap();

        let events = recorder(ledger.bus());
        let tx = creation_tx(&funding.transactions[0]);
        let sc_id = creation_sidechain_id(&tx.txid, 0);
        let block = next_block(&ledger, vec![tx], vec![]);
        ledger.connect(block.clone()).unwrap();
        assert!(ledger.state().sidechain(&sc_id).is_some());

        assert_eq!(ledger.disconnect_tip().unwrap(), Some(DisconnectStatus::Clean));
        assert!(ledger.state().sidechain(&sc_id).is_none());

        let events = events.lock().unwrap();
        let kinds: Vec<EventKind> = events.iter().map(ValidationEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::BlockConnected,
                EventKind::SidechainUpdated,
                EventKind::BlockDisconnected,
                EventKind::SidechainUpdated,
            ]
        );
        assert!(matches!(events[1], ValidationEvent::SidechainUpdated { exists: true, .. }));
        assert!(matches!(
            events[3],
            ValidationEvent::SidechainUpdated { exists: false, sidechain, .. } if sidechain == sc_id
        ));
    }

    fn spend_tx(funding: &Transaction) -> Transaction {
        Transaction::new(
            TRANSPARENT_TX_VERSION,
            vec![OutPoint::new(funding.txid, 0)],
            vec![TxOutput::pay_to_pubkey_hash(49 * COIN, &[7; 20])],
        )
    }

    #[test]
    fn test_genesis_coinbase_unspendable() {
        let mut ledger = ledger();
        let genesis = next_block(&ledger, vec![], vec![]);
        ledger.connect(genesis.clone()).unwrap();
        assert!(ledger.state().coins().is_empty());

        let spend = spend_tx(&genesis.transactions[0]);
        let block = next_block(&ledger, vec![spend], vec![]);
        let err = ledger.connect(block.clone()).unwrap_err();
        assert!(matches!(
            err,
            ChainStateError::MissingInput(outpoint) if outpoint.txid == genesis.transactions[0].txid
        ));
        assert_eq!(ledger.len(), 1);
        assert!(!ledger.store().contains(&block.hash));

        assert_eq!(ledger.disconnect_tip().unwrap(), Some(DisconnectStatus::Clean));
        assert!(ledger.is_empty());
        assert!(ledger.state().coins().is_empty());
    }

    #[test]
    fn test_spend_and_disconnect_restores_coins() {
        let mut ledger = ledger();
        ledger.connect(next_block(&ledger, vec![], vec![])).unwrap();
        let funding = next_block(&ledger, vec![], vec![]);
        ledger.connect(funding.clone()).unwrap();

        let coinbase = &funding.transactions[0];
        let before = ledger.state().coins().get(&coinbase.txid).cloned().unwrap();
        assert!(before.coinbase);
        assert_eq!(before.height, 1);
        assert_eq!(before.version, TRANSPARENT_TX_VERSION);

        let spend = spend_tx(coinbase);
        ledger.connect(next_block(&ledger, vec![spend], vec![])).unwrap();
        assert!(ledger.state().coins().get(&coinbase.txid).is_none());

        assert_eq!(ledger.disconnect_tip().unwrap(), Some(DisconnectStatus::Clean));
        assert_eq!(ledger.state().coins().get(&coinbase.txid), Some(&before));
    }

    #[test]
    fn test_disconnect_empty_chain() {
        let mut ledger = ledger();
        assert_eq!(ledger.disconnect_tip().unwrap(), None);
    }

    #[test]
    fn test_missing_undo_aborts_disconnect() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::with_data_dir(temp_dir.path());
        let store = FileUndoStore::open(&config).unwrap();
        let mut ledger = Ledger::new(&LedgerConfig::regtest(2), store);

        let genesis = next_block(&ledger, vec![], vec![]);
        ledger.connect(genesis.clone()).unwrap();
        let block = next_block(&ledger, vec![], vec![]);
        ledger.connect(block.clone()).unwrap();
        let root = *ledger.state().commitment_root();

        fs::remove_file(config.undo_path().join(format!("{}.undo", block.hash.to_hex()))).unwrap();
        let err = ledger.disconnect_tip().unwrap_err();
        assert!(matches!(err, ChainStateError::Storage(StorageError::NotFound(h)) if h == block.hash));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.state().commitment_root(), &root);
    }

    #[test]
    fn test_corrupt_undo_aborts_disconnect() {
        let mut ledger = ledger();
        ledger.connect(next_block(&ledger, vec![], vec![])).unwrap();
        let tip = ledger.tip().unwrap().hash;

        let mut store = MemoryUndoStore::new();
        store.put_raw(&tip, &[0xFD, 0xC1, 0xFE]).unwrap();
        ledger.store = store;

        let err = ledger.disconnect_tip().unwrap_err();
        assert!(matches!(
            err,
            ChainStateError::Storage(StorageError::Corruption { .. })
        ));
        assert_eq!(ledger.len(), 1);
    }
}
