//! Command-line interface for the undo tool

pub mod commands;

pub use commands::{
    cmd_export, cmd_inspect, cmd_list, cmd_migrate, cmd_sniff, cmd_verify, parse_block_id,
    CliResult, UndoReport,
};
