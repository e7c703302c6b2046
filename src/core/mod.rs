//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Amounts and money range checks
//! - Transactions, outpoints and sidechain certificates
//! - Blocks and their size bounds
//! - The host output compressor used inside undo records
//! - The UTXO view and chain state (connect/disconnect)
//! - The ledger (active chain, undo persistence, notifications)

pub mod amount;
pub mod block;
pub mod blockchain;
pub mod chain_state;
pub mod coins;
pub mod compressor;
pub mod transaction;

pub use amount::{format_money, money_range, Amount, COIN, MAX_MONEY};
pub use block::{Block, MAX_BLOCK_SIZE, MAX_BLOCK_TXS, MIN_TX_SIZE};
pub use blockchain::{Ledger, LedgerConfig, Network};
pub use chain_state::{touched_sidechains, ChainState, ChainStateError, DisconnectStatus};
pub use coins::{is_unspendable, Coins, CoinsView};
pub use compressor::{
    compress_amount, compress_output, decompress_amount, decompress_output, CompressedOutput,
    MAX_SCRIPT_SIZE,
};
pub use transaction::{
    Certificate, OutPoint, Transaction, TxOutput, SC_TX_VERSION, TRANSPARENT_TX_VERSION,
};
