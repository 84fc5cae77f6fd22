//! CLI command handlers for keymapgen.
//!
//! Each subcommand is a clap `Args` struct with an `execute` method; errors
//! carry the exit code the process should report.

pub mod common;
pub mod config;
pub mod generate;
pub mod validate;

// Re-export types used by main.rs and tests
pub use common::{CliError, CliResult, ExitCode};
pub use config::ConfigArgs;
pub use generate::GenerateArgs;
pub use validate::ValidateArgs;
