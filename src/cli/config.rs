//! Configuration management CLI commands.

use crate::cli::common::{CliError, CliResult};
use crate::config::Config;
use crate::constants::{APP_BINARY_NAME, APP_NAME};
use clap::{Args, Subcommand};

/// Manage the saved tool configuration
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Display the current configuration
    Show,
    /// Write a default configuration file
    Init,
    /// Print the configuration file path
    Path,
}

impl ConfigArgs {
    /// Execute config subcommand
    pub fn execute(&self) -> CliResult<()> {
        match &self.command {
            ConfigCommand::Show => show(),
            ConfigCommand::Init => init(),
            ConfigCommand::Path => path(),
        }
    }
}

fn show() -> CliResult<()> {
    let config = Config::load()
        .map_err(|e| CliError::validation(format!("Failed to load configuration: {e}")))?;

    println!("{APP_NAME} configuration");
    println!();
    println!("  Config dir: {}", config.paths.config_dir.display());
    println!("  Output dir: {}", config.paths.output_dir.display());
    if !Config::exists() {
        println!();
        println!("  (defaults; run `{APP_BINARY_NAME} config init` to save a config file)");
    }

    Ok(())
}

fn init() -> CliResult<()> {
    let config_path = Config::config_file_path()
        .map_err(|e| CliError::io(format!("Failed to resolve config path: {e}")))?;

    if config_path.exists() {
        return Err(CliError::validation(format!(
            "Configuration already exists at {}",
            config_path.display()
        )));
    }

    Config::default()
        .save()
        .map_err(|e| CliError::io(format!("Failed to save configuration: {e}")))?;

    println!("✓ Wrote default configuration to {}", config_path.display());
    Ok(())
}

fn path() -> CliResult<()> {
    let config_path = Config::config_file_path()
        .map_err(|e| CliError::io(format!("Failed to resolve config path: {e}")))?;
    println!("{}", config_path.display());
    Ok(())
}
