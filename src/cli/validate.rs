//! Validate command: runs the full compilation pipeline without writing
//! anything.

use crate::cli::common::{CliError, CliResult, RunResponse};
use crate::config::Config;
use crate::parser::{parse_bundle, ConfigSources};
use crate::runner::{self, BoardStatus, RunReport};
use clap::Args;
use std::path::PathBuf;

/// Check the configuration compiles for every board, writing nothing
#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Directory containing keymap.yaml, boards.yaml, and aliases.yaml
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Validate only the board with this id
    #[arg(long, value_name = "ID")]
    pub board: Option<String>,

    /// Treat warnings as failures (exit non-zero)
    #[arg(long)]
    pub strict: bool,

    /// Output the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl ValidateArgs {
    /// Execute the validate command
    pub fn execute(&self) -> CliResult<()> {
        let config = Config::load()
            .map_err(|e| CliError::io(format!("Failed to load configuration: {e}")))?;
        let config_dir = config.resolve_config_dir(self.config_dir.as_deref());

        let sources = ConfigSources::read(&config_dir).map_err(|e| CliError::io(format!("{e:#}")))?;
        let bundle = parse_bundle(&sources).map_err(|e| CliError::validation(e.to_string()))?;
        let report = runner::run(&bundle, self.board.as_deref())
            .map_err(|e| CliError::validation(e.to_string()))?;

        if self.json {
            let mut response = RunResponse::from_report(&report);
            if self.strict {
                response.success = report.clean();
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&response)
                    .map_err(|e| CliError::io(format!("Failed to serialize JSON: {e}")))?
            );
        } else {
            print_outcomes(&report);
        }

        if !report.all_succeeded() {
            return Err(CliError::validation("Validation failed"));
        }
        if self.strict && !report.clean() {
            return Err(CliError::validation("Warnings found in strict mode"));
        }

        Ok(())
    }
}

fn print_outcomes(report: &RunReport) {
    for outcome in &report.outcomes {
        match &outcome.error {
            Some(err) => println!("✗ {} ({}): {err}", outcome.id, outcome.name),
            None => println!("✓ {} ({})", outcome.id, outcome.name),
        }
        for warning in &outcome.warnings {
            println!("  ⚠ {warning}");
        }
    }

    println!();
    let failed = report
        .outcomes
        .iter()
        .filter(|o| o.status() == BoardStatus::Failed)
        .count();
    if failed == 0 {
        println!("✓ All {} boards valid", report.outcomes.len());
    } else {
        println!("✗ {failed} of {} boards failed", report.outcomes.len());
    }
}
