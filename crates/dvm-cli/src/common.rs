//! Common types and utilities shared across commands

use crate::errors::CliError;
use clap::Parser;
use dvm_config::Config;
use dvm_manifest::{DecodeMode, ResourceKind};
use dvm_store::SqliteStore;
use std::path::PathBuf;

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Decrease verbosity")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "SQLite store to use instead of the configured one"
    )]
    pub store: Option<PathBuf>,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

/// Clap value parser accepting kind names (`NvimPlugin`, `nvim-plugin`, `plugin`, ...)
pub fn parse_kind(value: &str) -> Result<ResourceKind, String> {
    value.parse::<ResourceKind>().map_err(|e| e.to_string())
}

/// Open the store named by `--store`, falling back to the configured path
pub fn open_store(opts: &GlobalOpts, config: &Config) -> Result<SqliteStore, CliError> {
    let path = match opts.store {
        Some(ref path) => path.clone(),
        None => config.get_store_path()?,
    };
    tracing::debug!("Using store at {:?}", path);
    Ok(SqliteStore::new(path)?)
}

/// Configured decode mode, upgraded to strict when requested on the command line
pub fn decode_mode(config: &Config, strict: bool) -> Result<DecodeMode, CliError> {
    if strict {
        return Ok(DecodeMode::Strict);
    }
    config
        .get_decode_mode()
        .parse()
        .map_err(CliError::InvalidArgument)
}
