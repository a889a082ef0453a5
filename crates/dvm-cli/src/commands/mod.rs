pub mod apply;
pub mod config;
pub mod delete;
pub mod generate;
pub mod get;
