//! Undo log persistence
//!
//! Block undo logs are stored keyed by block id. On disk each record is
//! one file under `<data_dir>/<undo_dir>/`:
//!
//! ```text
//!   payload (encoded BlockUndo) || double_sha256(block id || payload)
//! ```
//!
//! Files are written to a temporary path and renamed into place, so a
//! reader never sees a partially written record.

use crate::crypto::{double_sha256, Hash256};
use crate::encoding::{Decodable, Encodable, FormatError};
use crate::undo::BlockUndo;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bytes of checksum appended to every stored record
pub const CHECKSUM_SIZE: usize = 32;

const UNDO_EXTENSION: &str = "undo";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("No undo data stored for block {0}")]
    NotFound(Hash256),
    #[error("Undo data for block {block} is unreadable: {source}")]
    Corruption { block: Hash256, source: FormatError },
    #[error("Checksum mismatch in undo data for block {0}")]
    ChecksumMismatch(Hash256),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Subdirectory of `data_dir` holding undo records
    pub undo_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".ledger_data"),
            undo_dir: "undo".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn undo_path(&self) -> PathBuf {
        self.data_dir.join(&self.undo_dir)
    }
}

/// Checksum binding a payload to the block it belongs to
pub fn undo_checksum(block: &Hash256, payload: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let mut data = Vec::with_capacity(32 + payload.len());
    data.extend_from_slice(block.as_bytes());
    data.extend_from_slice(payload);
    let mut out = [0u8; CHECKSUM_SIZE];
    out.copy_from_slice(&double_sha256(&data));
    out
}

// =============================================================================
// Undo Store
// =============================================================================

/// Synchronous blob store for block undo logs.
///
/// Failures are returned to the caller as they happen; nothing is retried.
pub trait UndoStore {
    /// Store an already encoded record as is
    fn put_raw(&mut self, block: &Hash256, payload: &[u8]) -> Result<(), StorageError>;

    /// Encoded record for `block`, checksum verified
    fn get_raw(&self, block: &Hash256) -> Result<Vec<u8>, StorageError>;

    fn contains(&self, block: &Hash256) -> bool;

    /// Ids of all stored records, ascending
    fn list(&self) -> Result<Vec<Hash256>, StorageError>;

    /// Store `undo`, always in the current format
    fn put(&mut self, block: &Hash256, undo: &BlockUndo) -> Result<(), StorageError> {
        let payload = undo.to_bytes();
        log::debug!("storing undo for block {} ({} bytes)", block, payload.len());
        self.put_raw(block, &payload)
    }

    /// Decode the record for `block`. Bytes that do not decode are
    /// reported as corruption, distinct from a missing record.
    fn get(&self, block: &Hash256) -> Result<BlockUndo, StorageError> {
        let payload = self.get_raw(block)?;
        BlockUndo::from_bytes(&payload).map_err(|source| StorageError::Corruption {
            block: *block,
            source,
        })
    }
}

// =============================================================================
// File Store
// =============================================================================

/// One checksummed file per block
#[derive(Debug, Clone)]
pub struct FileUndoStore {
    dir: PathBuf,
}

impl FileUndoStore {
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let dir = config.undo_path();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, block: &Hash256) -> PathBuf {
        self.dir.join(format!("{}.{}", block.to_hex(), UNDO_EXTENSION))
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let mut stats = StorageStats {
            record_count: 0,
            total_bytes: 0,
            undo_dir: self.dir.clone(),
        };
        for block in self.list()? {
            stats.record_count += 1;
            stats.total_bytes += fs::metadata(self.record_path(&block))?.len();
        }
        Ok(stats)
    }
}

impl UndoStore for FileUndoStore {
    fn put_raw(&mut self, block: &Hash256, payload: &[u8]) -> Result<(), StorageError> {
        let path = self.record_path(block);
        let temp_path = path.with_extension("tmp");

        // Write to temporary file first
        {
            let file = fs::File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(payload)?;
            writer.write_all(&undo_checksum(block, payload))?;
            writer.flush()?;
        }

        // Atomic rename
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn get_raw(&self, block: &Hash256) -> Result<Vec<u8>, StorageError> {
        let mut bytes = match fs::read(self.record_path(block)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(*block))
            }
            Err(e) => return Err(e.into()),
        };
        if bytes.len() < CHECKSUM_SIZE {
            return Err(StorageError::ChecksumMismatch(*block));
        }
        let stored = bytes.split_off(bytes.len() - CHECKSUM_SIZE);
        if stored[..] != undo_checksum(block, &bytes) {
            log::warn!("undo record for block {} failed its checksum", block);
            return Err(StorageError::ChecksumMismatch(*block));
        }
        Ok(bytes)
    }

    fn contains(&self, block: &Hash256) -> bool {
        self.record_path(block).exists()
    }

    fn list(&self) -> Result<Vec<Hash256>, StorageError> {
        let mut blocks = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(UNDO_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match Hash256::from_hex(stem) {
                Ok(block) => blocks.push(block),
                Err(_) => log::warn!("ignoring stray file {}", path.display()),
            }
        }
        blocks.sort();
        Ok(blocks)
    }
}

/// Storage statistics
#[derive(Debug)]
pub struct StorageStats {
    pub record_count: usize,
    pub total_bytes: u64,
    pub undo_dir: PathBuf,
}

// =============================================================================
// Memory Store
// =============================================================================

/// Encoded records kept in memory; same codec path as the file store
#[derive(Debug, Clone, Default)]
pub struct MemoryUndoStore {
    records: BTreeMap<Hash256, Vec<u8>>,
}

impl MemoryUndoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl UndoStore for MemoryUndoStore {
    fn put_raw(&mut self, block: &Hash256, payload: &[u8]) -> Result<(), StorageError> {
        self.records.insert(*block, payload.to_vec());
        Ok(())
    }

    fn get_raw(&self, block: &Hash256) -> Result<Vec<u8>, StorageError> {
        self.records
            .get(block)
            .cloned()
            .ok_or(StorageError::NotFound(*block))
    }

    fn contains(&self, block: &Hash256) -> bool {
        self.records.contains_key(block)
    }

    fn list(&self) -> Result<Vec<Hash256>, StorageError> {
        Ok(self.records.keys().copied().collect())
    }
}
