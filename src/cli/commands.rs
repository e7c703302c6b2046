//! CLI commands for the undo tool
//!
//! Read-only audit and export of stored undo logs, plus the one write
//! operation: migrating legacy records to the current format.

use crate::core::amount::format_money;
use crate::crypto::Hash256;
use crate::encoding::Encodable;
use crate::storage::{StorageError, UndoStore};
use crate::undo::{BlockUndo, UndoFormat};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// JSON export of one undo log
#[derive(Debug, Serialize)]
pub struct UndoReport<'a> {
    pub block: Hash256,
    pub format: UndoFormat,
    pub encoded_size: usize,
    pub tx_count: usize,
    pub input_count: usize,
    pub undo: &'a BlockUndo,
}

impl<'a> UndoReport<'a> {
    pub fn new(block: Hash256, undo: &'a BlockUndo) -> Self {
        Self {
            block,
            format: undo.format(),
            encoded_size: undo.encoded_len(),
            tx_count: undo.tx_undos().len(),
            input_count: undo.input_count(),
            undo,
        }
    }
}

/// Parse a block id given in display hex
pub fn parse_block_id(s: &str) -> CliResult<Hash256> {
    Hash256::from_hex(s).map_err(|e| format!("invalid block id '{}': {}", s, e).into())
}

/// List stored undo records
pub fn cmd_list<S: UndoStore>(store: &S) -> CliResult<Vec<Hash256>> {
    let blocks = store.list()?;
    if blocks.is_empty() {
        println!("📭 No undo records stored");
        return Ok(blocks);
    }

    println!("📚 {} undo record(s):", blocks.len());
    for block in &blocks {
        match store.get_raw(block) {
            Ok(raw) => {
                let format = UndoFormat::sniff(&raw)
                    .map(|f| f.to_string())
                    .unwrap_or_else(|_| "unreadable".to_string());
                println!("   {} {:>8} bytes  {}", block, raw.len(), format);
            }
            Err(e) => println!("   {} ❌ {}", block, e),
        }
    }
    Ok(blocks)
}

/// Show the contents of one undo record
pub fn cmd_inspect<S: UndoStore>(store: &S, block: &Hash256) -> CliResult<()> {
    let undo = store.get(block)?;
    let report = UndoReport::new(*block, &undo);

    println!("🔎 Undo record for block {}", block);
    println!("   ├─ Format: {}", report.format);
    println!("   ├─ Encoded size: {} bytes", report.encoded_size);
    println!("   ├─ Transactions: {}", report.tx_count);
    println!("   ├─ Inputs: {}", report.input_count);
    println!("   ├─ Prior commitment root: {}", undo.prior_commitment_root());
    println!("   └─ Sidechain entries: {}", undo.sidechain_undos().len());
    for (id, entry) in undo.sidechain_undos() {
        println!(
            "      {} matured {} prior epoch {}",
            id,
            format_money(entry.matured_amount),
            entry.prior_certificate_epoch
        );
    }
    Ok(())
}

/// Write one undo record as JSON
pub fn cmd_export<S: UndoStore>(store: &S, block: &Hash256, output: &Path) -> CliResult<()> {
    let undo = store.get(block)?;
    let json = serde_json::to_string_pretty(&UndoReport::new(*block, &undo))
        .map_err(StorageError::from)?;
    fs::write(output, json)?;

    println!("✅ Exported undo record for block {} to {:?}", block, output);
    Ok(())
}

/// Detect the format of a raw undo file from its leading integer
pub fn cmd_sniff(file: &Path) -> CliResult<UndoFormat> {
    let bytes = fs::read(file)?;
    let format = UndoFormat::sniff(&bytes)?;
    println!("📄 {:?}: {} format", file, format);
    Ok(format)
}

/// Decode every stored record; returns the ids that failed
pub fn cmd_verify<S: UndoStore>(store: &S) -> CliResult<Vec<Hash256>> {
    let blocks = store.list()?;
    let mut failed = Vec::new();
    let mut legacy = 0;

    println!("🔍 Verifying {} undo record(s)...", blocks.len());
    for block in blocks.iter() {
        match store.get(block) {
            Ok(undo) => {
                if undo.is_legacy() {
                    legacy += 1;
                }
            }
            Err(e) => {
                println!("   ❌ {}: {}", block, e);
                failed.push(*block);
            }
        }
    }

    if failed.is_empty() {
        println!("✅ All records decode ({} legacy)", legacy);
    } else {
        println!("⚠️  {} of {} records are damaged", failed.len(), blocks.len());
    }
    Ok(failed)
}

/// Rewrite legacy records in the current format; returns how many changed.
///
/// Records that fail to load are reported and left untouched.
pub fn cmd_migrate<S: UndoStore>(store: &mut S, dry_run: bool) -> CliResult<usize> {
    let mut migrated = 0;
    let mut skipped = 0;
    for block in store.list()? {
        let undo = match store.get(&block) {
            Ok(undo) => undo,
            Err(e) => {
                println!("   ❌ {}: {}", block, e);
                skipped += 1;
                continue;
            }
        };
        if !undo.is_legacy() {
            continue;
        }
        if !dry_run {
            store.put(&block, &undo)?;
            log::info!("migrated undo record for block {}", block);
        }
        migrated += 1;
    }

    if dry_run {
        println!("📝 {} legacy record(s) would be migrated", migrated);
    } else {
        println!("✅ Migrated {} legacy record(s)", migrated);
    }
    if skipped > 0 {
        println!("⚠️  {} damaged record(s) skipped", skipped);
    }
    Ok(migrated)
}
