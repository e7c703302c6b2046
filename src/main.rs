//! Undo Tool CLI Application
//!
//! A command-line interface for auditing stored block undo logs.

use clap::{Parser, Subcommand};
use ledger_undo::cli;
use ledger_undo::storage::{FileUndoStore, StorageConfig, StorageError};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "undo-tool")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Audit, export and migrate block undo logs", long_about = None)]
struct Cli {
    /// Data directory holding the undo store
    #[arg(short, long, default_value = ".ledger_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored undo records
    List,

    /// Show the contents of one undo record
    Inspect {
        /// Block id (hex)
        block: String,
    },

    /// Export one undo record as JSON
    Export {
        /// Block id (hex)
        block: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Detect the format of a raw undo file
    Sniff {
        /// File to read
        file: PathBuf,
    },

    /// Decode every stored record and report damaged ones
    Verify,

    /// Rewrite legacy records in the current format
    Migrate {
        /// Only report what would change
        #[arg(long)]
        dry_run: bool,
    },
}

fn open_store(data_dir: &Path) -> Result<FileUndoStore, StorageError> {
    FileUndoStore::open(&StorageConfig::with_data_dir(data_dir))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        // Reads a loose file, no store needed
        Commands::Sniff { file } => {
            cli::cmd_sniff(&file)?;
        }

        Commands::List => {
            cli::cmd_list(&open_store(&cli.data_dir)?)?;
        }

        Commands::Inspect { block } => {
            let block = cli::parse_block_id(&block)?;
            cli::cmd_inspect(&open_store(&cli.data_dir)?, &block)?;
        }

        Commands::Export { block, output } => {
            let block = cli::parse_block_id(&block)?;
            cli::cmd_export(&open_store(&cli.data_dir)?, &block, &output)?;
        }

        Commands::Verify => {
            let failed = cli::cmd_verify(&open_store(&cli.data_dir)?)?;
            if !failed.is_empty() {
                return Err(format!("{} damaged undo record(s)", failed.len()).into());
            }
        }

        Commands::Migrate { dry_run } => {
            let mut store = open_store(&cli.data_dir)?;
            cli::cmd_migrate(&mut store, dry_run)?;
            if let Ok(stats) = store.stats() {
                log::info!(
                    "{} records, {} bytes in {:?}",
                    stats.record_count,
                    stats.total_bytes,
                    stats.undo_dir
                );
            }
        }
    }

    Ok(())
}
