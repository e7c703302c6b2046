//! Ledger Undo: block undo logs for a UTXO ledger with sidechains
//!
//! This crate provides everything needed to reverse a connected block:
//! - Host-compatible wire primitives (CompactSize, VarInt, output compression)
//! - A versioned block undo log that still reads the legacy layout
//! - Sidechain maturation rollback entries and the cross-chain output model
//! - Connect/disconnect over an in-memory UTXO and sidechain view
//! - Checksummed undo persistence with a validation event bus
//!
//! # Example
//!
//! ```rust
//! use ledger_undo::core::{Block, ChainState, Transaction, TxOutput};
//! use ledger_undo::crypto::Hash256;
//! use ledger_undo::encoding::{Decodable, Encodable};
//! use ledger_undo::undo::BlockUndo;
//!
//! let mut state = ChainState::new(2);
//! let coinbase = Transaction::coinbase(1, vec![TxOutput::pay_to_pubkey_hash(50, &[1; 20])]);
//! let block = Block::new(Hash256::ZERO, 1, vec![coinbase], vec![], Hash256::digest(b"root"));
//!
//! // Connect, store the log, read it back and disconnect
//! let undo = state.connect_block(&block).unwrap();
//! let bytes = undo.to_bytes();
//! let undo = BlockUndo::from_bytes(&bytes).unwrap();
//! state.disconnect_block(&block, &undo).unwrap();
//! assert!(state.coins().is_empty());
//! ```

pub mod cli;
pub mod core;
pub mod crypto;
pub mod encoding;
pub mod notify;
pub mod sidechain;
pub mod storage;
pub mod undo;

// Re-export commonly used types
pub use self::core::{Block, ChainState, ChainStateError, Ledger, LedgerConfig, Transaction};
pub use crypto::Hash256;
pub use encoding::{Decodable, Encodable, FormatError};
pub use notify::{EventKind, ValidationBus, ValidationEvent};
pub use sidechain::{CrossChainIntent, Sidechain, StructuralError};
pub use storage::{FileUndoStore, MemoryUndoStore, StorageConfig, StorageError, UndoStore};
pub use undo::{BlockUndo, UndoFormat};
