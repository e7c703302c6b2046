//! Block undo log
//!
//! This module contains:
//! - Output undo records (one per spent input)
//! - Per-transaction undo lists
//! - Per-sidechain maturation rollback entries
//! - The block undo log with legacy/current format detection

pub mod block_undo;
pub mod format;
pub mod output_undo;
pub mod sidechain_undo;
pub mod tx_undo;

pub use block_undo::{BlockUndo, BlockUndoBuilder};
pub use format::{UndoFormat, FORMAT_MARKER};
pub use output_undo::OutputUndo;
pub use sidechain_undo::SidechainUndo;
pub use tx_undo::TxUndo;
