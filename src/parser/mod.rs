//! Configuration loading: reads the YAML trio and builds the immutable
//! per-run bundle consumed by the compiler.
//!
//! File reads and YAML/semantic validation are split so I/O failures and
//! configuration errors surface through different exit codes.

pub mod aliases;
pub mod boards;
pub mod keymap;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::constants::{ALIASES_FILE, BOARDS_FILE, KEYMAP_FILE};
use crate::error::{CompileError, CompileResult};
use crate::models::{AbstractLayer, BoardDescriptor, ComboSpec, MagicTable};
use crate::registry::AliasRegistry;

/// Raw file contents of one configuration directory.
#[derive(Debug, Clone)]
pub struct ConfigSources {
    /// Directory the sources were read from.
    pub dir: PathBuf,
    /// Contents of `keymap.yaml`.
    pub keymap: String,
    /// Contents of `boards.yaml`.
    pub boards: String,
    /// Contents of `aliases.yaml`.
    pub aliases: String,
}

impl ConfigSources {
    /// Reads the three configuration files from `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory or any of the files cannot be
    /// read. These are I/O failures, not configuration errors.
    pub fn read(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            bail!(
                "Configuration directory {} does not exist",
                dir.display()
            );
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            keymap: read_file(dir, KEYMAP_FILE)?,
            boards: read_file(dir, BOARDS_FILE)?,
            aliases: read_file(dir, ALIASES_FILE)?,
        })
    }
}

fn read_file(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Everything one run needs, loaded once and read-only thereafter.
#[derive(Debug)]
pub struct KeymapBundle {
    /// Layers in configuration order.
    pub layers: Vec<AbstractLayer>,
    /// Board inventory in configuration order.
    pub boards: Vec<BoardDescriptor>,
    /// Combo definitions.
    pub combos: Vec<ComboSpec>,
    /// Magic tables keyed by base layer.
    pub magic: Vec<MagicTable>,
    /// Behavior aliases and the merged keycode table.
    pub registry: AliasRegistry,
}

/// Parses and cross-validates the configuration trio.
///
/// # Errors
///
/// Returns a configuration error for structural problems: malformed YAML,
/// bad tokens, shape violations, or dangling layer references in combos and
/// magic tables.
pub fn parse_bundle(sources: &ConfigSources) -> CompileResult<KeymapBundle> {
    let (alias_list, overrides) = aliases::parse(&sources.aliases)?;
    let registry = AliasRegistry::new(alias_list, overrides)?;

    let (layers, combos, magic) = keymap::parse(&sources.keymap)?;
    let boards = boards::parse(&sources.boards)?;

    let layer_names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
    for combo in &combos {
        for filter in &combo.layers {
            if !layer_names.contains(&filter.as_str()) {
                return Err(CompileError::config(format!(
                    "combo '{}' filters on unknown layer '{filter}'",
                    combo.name
                ))
                .with_suggestion(format!("known layers: {}", layer_names.join(", "))));
            }
        }
    }
    for table in &magic {
        if !layer_names.contains(&table.base_layer.as_str()) {
            return Err(CompileError::config(format!(
                "magic table '{}' does not match any layer",
                table.base_layer
            ))
            .with_layer(&table.base_layer)
            .with_suggestion(format!("known layers: {}", layer_names.join(", "))));
        }
    }

    Ok(KeymapBundle {
        layers,
        boards,
        combos,
        magic,
        registry,
    })
}
