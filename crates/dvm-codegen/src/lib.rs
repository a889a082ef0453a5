//! DVM Code Generation
//!
//! Turns stored resources into files consumed by other tools: lazy.nvim
//! plugin specs for editor kinds and zsh fragments for terminal kinds.
//!
//! - `compiler`: one record (plus resolved members) -> artifact text
//! - `members`: weak-reference resolution through a `ResourceStore`
//! - `batch`: path reservation and atomic writes for a set of units

pub mod batch;
pub mod compiler;
pub mod errors;
pub mod lua;
pub mod members;
pub mod plan;
pub mod shell;
pub mod slug;

pub use batch::{artifact_location, artifact_path, generate, FailurePolicy, GenerateReport};
pub use compiler::{CompileOptions, CompileUnit, ConfigCompiler, DEFAULT_INDENT_WIDTH, DEFAULT_PLUGIN_DIR};
pub use errors::{CompileError, GenerateError};
pub use members::{resolve_each, resolve_unit};
pub use slug::slugify;
