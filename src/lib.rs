//! pageflow library
//!
//! Exposes the CLI and configuration modules for integration testing

pub mod cli;
pub mod config;
pub mod errors;

pub use config::Config;
pub use errors::CliError;
