//! dvm library - expose command handlers for the binary and for testing

pub mod commands;
pub mod common;
pub mod errors;

pub use common::GlobalOpts;
pub use errors::CliError;
