//! Firmware file generation.
//!
//! Each target module turns one board's compiled layers plus the auxiliary
//! structures (combos, magic tables, shift-morphs) into a set of generated
//! source documents. Generators only assemble strings; writing happens in
//! [`write_files`] so `validate` can run the same path without touching disk.

pub mod qmk;
pub mod zmk;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::compiler::CompiledLayer;
use crate::constants::GENERATED_MARKER;
use crate::error::{CompileError, CompileResult};
use crate::models::{AbstractLayer, BoardDescriptor, ComboSpec, Firmware, MagicTable};
use crate::registry::AliasRegistry;
use crate::translate::KeyTranslator;

/// One generated source document, addressed relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path under the output directory, including the per-board prefix.
    pub relative_path: PathBuf,
    /// Complete file content.
    pub content: String,
}

impl GeneratedFile {
    /// Creates a document from its relative path and content.
    pub fn new(relative_path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
        }
    }
}

/// Generator output for one board: the documents plus any degrade warnings
/// raised during assembly (translation warnings live on the translator).
#[derive(Debug, Default)]
pub struct GeneratedBoard {
    /// Generated documents in output order.
    pub files: Vec<GeneratedFile>,
    /// Warnings raised while assembling auxiliary structures.
    pub warnings: Vec<String>,
}

/// Auxiliary structures shared by both target generators.
pub struct AuxStructures<'a> {
    /// Combos from the keymap configuration.
    pub combos: &'a [ComboSpec],
    /// Magic tables from the keymap configuration.
    pub magic: &'a [MagicTable],
    /// Alias registry for translating combo actions and magic outputs.
    pub registry: &'a AliasRegistry,
}

/// Generates every output document for one board.
///
/// `raw_layers` is the same selection, in the same order, that produced
/// `compiled`; QMK combo triggers are looked up from its core tokens. The
/// translator must be the one the layers were compiled with so shift-morph
/// pairs and degrade warnings keep accumulating across combo actions.
pub fn generate(
    board: &BoardDescriptor,
    compiled: &[CompiledLayer],
    raw_layers: &[&AbstractLayer],
    aux: &AuxStructures<'_>,
    translator: &mut dyn KeyTranslator,
) -> CompileResult<GeneratedBoard> {
    match board.firmware {
        Firmware::Qmk => qmk::generate(board, compiled, raw_layers, aux, translator),
        Firmware::Zmk => zmk::generate(board, compiled, raw_layers, aux, translator),
    }
}

/// Writes generated documents under the output root, atomically per file
/// (temp file + rename). Returns the absolute paths written.
pub fn write_files(output_dir: &Path, files: &[GeneratedFile]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());

    for file in files {
        let path = output_dir.join(&file.relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("generated");
        let tmp = path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&tmp, &file.content)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move {} into place", path.display()))?;
        written.push(path);
    }

    Ok(written)
}

/// Marker header shared by generated C and devicetree files.
pub(crate) fn marker_header(board: &BoardDescriptor, linkage: &str) -> String {
    format!(
        "// {GENERATED_MARKER}\n// Generated from keymap.yaml\n// Board: {} ({} {linkage})\n",
        board.name, board.firmware
    )
}

/// Groups a compiled layer's emissions into physical rows.
///
/// Full-layout layers carry their own row structure; canonical layers are
/// woven through the size class's slot map.
pub(crate) fn physical_rows<'a>(
    layer: &'a CompiledLayer,
    board: &BoardDescriptor,
) -> Vec<Vec<&'a str>> {
    if let Some(lengths) = &layer.row_lengths {
        let mut rows = Vec::with_capacity(lengths.len());
        let mut offset = 0;
        for &len in lengths {
            rows.push(
                layer.keys[offset..offset + len]
                    .iter()
                    .map(String::as_str)
                    .collect(),
            );
            offset += len;
        }
        return rows;
    }

    board
        .layout_size
        .physical_rows()
        .into_iter()
        .map(|slots| slots.into_iter().map(|s| layer.keys[s].as_str()).collect())
        .collect()
}

/// True when the combo is active on this board: either it has no layer
/// filter, or at least one filtered layer is compiled here.
pub(crate) fn combo_applies(combo: &ComboSpec, compiled: &[CompiledLayer]) -> bool {
    combo.layers.is_empty()
        || combo
            .layers
            .iter()
            .any(|name| compiled.iter().any(|l| l.name == *name))
}

/// Indices of the combo's filter layers within the compiled layer order.
pub(crate) fn combo_layer_indices(combo: &ComboSpec, compiled: &[CompiledLayer]) -> Vec<usize> {
    combo
        .layers
        .iter()
        .filter_map(|name| compiled.iter().position(|l| l.name == *name))
        .collect()
}

/// The raw layer a combo's trigger keys are read from: the first filter
/// layer present in the board's selection, otherwise the first selected
/// layer that has a core.
pub(crate) fn combo_source_layer<'a>(
    combo: &ComboSpec,
    raw_layers: &[&'a AbstractLayer],
) -> CompileResult<&'a AbstractLayer> {
    if !combo.layers.is_empty() {
        return combo
            .layers
            .iter()
            .find_map(|name| raw_layers.iter().find(|l| l.name == *name))
            .copied()
            .ok_or_else(|| {
                CompileError::reference(format!(
                    "combo '{}' filters on layers not compiled for this board",
                    combo.name
                ))
            });
    }

    raw_layers
        .iter()
        .find(|l| l.has_core())
        .copied()
        .ok_or_else(|| {
            CompileError::reference(format!(
                "combo '{}' needs a layer with a core to resolve its trigger keys",
                combo.name
            ))
            .with_suggestion("define a core for one layer or filter the combo to a layer that has one")
        })
}
