//! keymapgen - unified keymap compiler.
//!
//! Compiles one firmware-agnostic YAML keymap configuration into QMK keymap
//! sources and ZMK devicetree keymaps for a whole board inventory.

use clap::{Parser, Subcommand};

use keymapgen::cli::{ConfigArgs, GenerateArgs, ValidateArgs};

/// Unified keymap compiler producing QMK and ZMK keymaps
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile every board's keymap and write the firmware trees
    Generate(GenerateArgs),
    /// Check the configuration compiles, writing nothing
    Validate(ValidateArgs),
    /// Manage the saved tool configuration
    Config(ConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Generate(args) => args.execute(),
        Command::Validate(args) => args.execute(),
        Command::Config(args) => args.execute(),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code.code());
    }
}
