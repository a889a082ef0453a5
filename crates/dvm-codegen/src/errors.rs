use dvm_manifest::{AttributeError, ResourceKind};
use dvm_store::StoreError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning one resource into generated source
#[derive(Error, Debug)]
pub enum CompileError {
    /// The record lacks its positional identifier. Records that passed
    /// through the manifest codec always carry one, so this points at a bug
    /// upstream rather than at user input.
    #[error("{kind} '{name}' has no source reference")]
    MissingSource { kind: ResourceKind, name: String },

    #[error("Attribute error: {0}")]
    Attribute(#[from] AttributeError),

    #[error("{kind} '{name}' referenced by '{referrer}' not found")]
    Unresolved {
        kind: ResourceKind,
        name: String,
        referrer: String,
    },

    #[error("Reference cycle: {}", .chain.join(" -> "))]
    ReferenceCycle { chain: Vec<String> },

    #[error("Name '{0}' does not produce a usable file name")]
    InvalidSlug(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CompileError {
    /// True for errors that indicate corrupt stored data rather than bad input
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, CompileError::MissingSource { .. })
    }
}

/// Errors raised while writing a batch of generated files
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("'{first}' and '{second}' both generate {}", .path.display())]
    DuplicateFilename {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to compile '{name}': {source}")]
    Compile {
        name: String,
        #[source]
        source: CompileError,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use crate::errors::*;

    #[test]
    fn test_cycle_display() {
        let err = CompileError::ReferenceCycle {
            chain: vec!["base".to_string(), "full".to_string(), "base".to_string()],
        };
        assert_eq!(err.to_string(), "Reference cycle: base -> full -> base");
    }

    #[test]
    fn test_precondition_violation() {
        let err = CompileError::MissingSource {
            kind: ResourceKind::NvimPlugin,
            name: "broken".to_string(),
        };
        assert!(err.is_precondition_violation());
        assert!(!CompileError::InvalidSlug("..".to_string()).is_precondition_violation());
    }

    #[test]
    fn test_duplicate_filename_names_both() {
        let err = GenerateError::DuplicateFilename {
            path: PathBuf::from("out/nvim/plugins/my-plugin.lua"),
            first: "My Plugin".to_string(),
            second: "my-plugin".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("My Plugin") && message.contains("my-plugin"));
    }
}
