//! Generate command: compiles the board inventory and writes the firmware
//! trees.

use crate::cli::common::{CliError, CliResult, RunResponse};
use crate::config::Config;
use crate::firmware;
use crate::parser::{parse_bundle, ConfigSources};
use crate::runner::{self, BoardOutcome, RunReport};
use clap::Args;
use std::path::PathBuf;

/// Generate QMK and ZMK keymaps from the YAML configuration
#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Directory containing keymap.yaml, boards.yaml, and aliases.yaml
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Directory the generated firmware trees are written under
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Compile only the board with this id
    #[arg(long, value_name = "ID")]
    pub board: Option<String>,

    /// List every generated file
    #[arg(short, long)]
    pub verbose: bool,

    /// Output the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl GenerateArgs {
    /// Execute the generate command
    pub fn execute(&self) -> CliResult<()> {
        let config = Config::load()
            .map_err(|e| CliError::io(format!("Failed to load configuration: {e}")))?;
        let config_dir = config.resolve_config_dir(self.config_dir.as_deref());
        let output_dir = config.resolve_output_dir(self.output_dir.as_deref());

        let sources = ConfigSources::read(&config_dir).map_err(|e| CliError::io(format!("{e:#}")))?;
        let bundle = parse_bundle(&sources).map_err(|e| CliError::validation(e.to_string()))?;
        let report = runner::run(&bundle, self.board.as_deref())
            .map_err(|e| CliError::validation(e.to_string()))?;

        // Failed boards have no files; successful ones write their whole
        // tree even when another board failed.
        for outcome in &report.outcomes {
            firmware::write_files(&output_dir, &outcome.files)
                .map_err(|e| CliError::io(format!("{e:#}")))?;
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&RunResponse::from_report(&report))
                    .map_err(|e| CliError::io(format!("Failed to serialize JSON: {e}")))?
            );
        } else {
            print_outcomes(&report, self.verbose);
            println!();
            println!(
                "Generated {} files under {}",
                report.total_files(),
                output_dir.display()
            );
        }

        if !report.all_succeeded() {
            return Err(CliError::validation("Generation failed for at least one board"));
        }

        Ok(())
    }
}

fn print_outcomes(report: &RunReport, verbose: bool) {
    for outcome in &report.outcomes {
        print_board_line(outcome);
        if verbose {
            for file in &outcome.files {
                println!("    {}", file.relative_path.display());
            }
        }
        for warning in &outcome.warnings {
            println!("  ⚠ {warning}");
        }
    }
}

fn print_board_line(outcome: &BoardOutcome) {
    match &outcome.error {
        Some(err) => println!("✗ {} ({}): {err}", outcome.id, outcome.name),
        None => println!(
            "✓ {} ({}): {} files",
            outcome.id,
            outcome.name,
            outcome.files.len()
        ),
    }
}
