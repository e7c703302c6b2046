//! Storage module for undo log persistence

pub mod persistence;

pub use persistence::{
    undo_checksum, FileUndoStore, MemoryUndoStore, StorageConfig, StorageError, StorageStats,
    UndoStore, CHECKSUM_SIZE,
};
