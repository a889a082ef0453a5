//! Centralized error type for the dvm CLI
//!
//! Each library crate keeps its own error enum; commands return `CliError`
//! so `main` can report any of them the same way.

use dvm_codegen::{CompileError, GenerateError};
use dvm_config::ConfigError;
use dvm_manifest::{AttributeError, ManifestError};
use dvm_store::StoreError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Attribute error: {0}")]
    Attribute(#[from] AttributeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Generate error: {0}")]
    Generate(#[from] GenerateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{failed} of {total} file(s) could not be generated")]
    GenerationFailed { failed: usize, total: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
