//! Run orchestration: the one-shot-layer shadow pass, then an isolated
//! compile-and-generate per board.
//!
//! The runner never touches the filesystem. Each outcome carries the board's
//! generated documents; callers decide whether to write them, which keeps
//! `generate` and `validate` on the same compilation path.

use std::collections::HashMap;
use std::fmt;

use crate::compiler::{board_layers, compile_board};
use crate::error::{CompileError, CompileResult};
use crate::firmware::{self, AuxStructures, GeneratedFile};
use crate::models::{AbstractLayer, BoardDescriptor, KeyToken, LayoutCell};
use crate::parser::KeymapBundle;
use crate::translate::translator_for;

/// How one board's compilation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardStatus {
    /// Compiled with no warnings.
    Ok,
    /// Compiled, but some emissions degraded.
    Warnings,
    /// Aborted by an error; no files were produced.
    Failed,
}

impl fmt::Display for BoardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "ok",
            Self::Warnings => "warnings",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Result of compiling one board.
#[derive(Debug)]
pub struct BoardOutcome {
    /// Board id from the inventory.
    pub id: String,
    /// Human-readable board name.
    pub name: String,
    /// Generated documents, empty when compilation failed.
    pub files: Vec<GeneratedFile>,
    /// Translator and generator warnings, in emission order.
    pub warnings: Vec<String>,
    /// The error that aborted this board, if any.
    pub error: Option<CompileError>,
}

impl BoardOutcome {
    /// Status derived from the error and warning fields.
    #[must_use]
    pub fn status(&self) -> BoardStatus {
        if self.error.is_some() {
            BoardStatus::Failed
        } else if self.warnings.is_empty() {
            BoardStatus::Ok
        } else {
            BoardStatus::Warnings
        }
    }
}

/// Per-board outcomes for a whole run, in inventory order.
#[derive(Debug, Default)]
pub struct RunReport {
    /// One outcome per selected board.
    pub outcomes: Vec<BoardOutcome>,
}

impl RunReport {
    /// True when every selected board compiled.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.status() != BoardStatus::Failed)
    }

    /// True when every selected board compiled without warnings.
    #[must_use]
    pub fn clean(&self) -> bool {
        self.outcomes.iter().all(|o| o.status() == BoardStatus::Ok)
    }

    /// Total number of generated documents across all boards.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.outcomes.iter().map(|o| o.files.len()).sum()
    }
}

/// Compiles every board in the bundle, or just `filter` when given.
///
/// Boards fail independently: an error in one board is recorded in its
/// outcome and the remaining boards still compile.
///
/// # Errors
///
/// Returns an error only for problems that invalidate the whole run: an
/// unknown `filter` id, or a shadow-layer name collision.
pub fn run(bundle: &KeymapBundle, filter: Option<&str>) -> CompileResult<RunReport> {
    let boards: Vec<&BoardDescriptor> = match filter {
        Some(id) => {
            let board = bundle.boards.iter().find(|b| b.id == id).ok_or_else(|| {
                CompileError::config(format!("board '{id}' is not in the inventory"))
                    .with_suggestion(format!(
                        "known boards: {}",
                        bundle
                            .boards
                            .iter()
                            .map(|b| b.id.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
            })?;
            vec![board]
        }
        None => bundle.boards.iter().collect(),
    };

    // The one global preprocessing step. Runs before any board so the layer
    // list, and with it every layer index, is identical across boards.
    let layers = expand_osl_shadows(&bundle.layers)?;

    let mut report = RunReport::default();
    for board in boards {
        report.outcomes.push(compile_one(bundle, &layers, board));
    }
    Ok(report)
}

fn compile_one(
    bundle: &KeymapBundle,
    layers: &[AbstractLayer],
    board: &BoardDescriptor,
) -> BoardOutcome {
    let mut outcome = BoardOutcome {
        id: board.id.clone(),
        name: board.name.clone(),
        files: Vec::new(),
        warnings: Vec::new(),
        error: None,
    };

    let mut translator = translator_for(board.firmware, &bundle.registry, &bundle.magic);
    let aux = AuxStructures {
        combos: &bundle.combos,
        magic: &bundle.magic,
        registry: &bundle.registry,
    };

    let result = board_layers(layers, board).and_then(|selected| {
        let compiled = compile_board(layers, board, translator.as_mut())?;
        firmware::generate(board, &compiled, &selected, &aux, translator.as_mut())
    });

    outcome.warnings.extend_from_slice(translator.warnings());
    match result {
        Ok(generated) => {
            outcome.files = generated.files;
            outcome.warnings.extend(generated.warnings);
        }
        Err(err) => outcome.error = Some(err),
    }
    outcome
}

/// Appends a `<LAYER>_SHADOW` copy for every one-shot-layer target whose
/// index does not exceed its referencing layer's, and rewrites those
/// references to the shadow. A one-shot layer at or below the active layer
/// in the stack would otherwise be unreachable.
fn expand_osl_shadows(layers: &[AbstractLayer]) -> CompileResult<Vec<AbstractLayer>> {
    let index_of: HashMap<&str, usize> = layers
        .iter()
        .enumerate()
        .map(|(idx, layer)| (layer.name.as_str(), idx))
        .collect();

    // Shadow targets in first-reference order.
    let mut targets: Vec<String> = Vec::new();
    for (idx, layer) in layers.iter().enumerate() {
        visit_tokens(layer, &mut |token| {
            if let Some(target) = osl_target(token) {
                if index_of.get(target).is_some_and(|&t| t <= idx) && !targets.iter().any(|t| t == target) {
                    targets.push(target.to_string());
                }
            }
        });
    }
    if targets.is_empty() {
        return Ok(layers.to_vec());
    }

    for target in &targets {
        let shadow = format!("{target}_SHADOW");
        if index_of.contains_key(shadow.as_str()) {
            return Err(CompileError::config(format!(
                "one-shot layer '{target}' needs a shadow layer, but '{shadow}' is already defined"
            ))
            .with_layer(target)
            .with_suggestion(format!("rename the '{shadow}' layer")));
        }
    }

    let mut expanded = layers.to_vec();
    for (idx, layer) in expanded.iter_mut().enumerate() {
        rewrite_tokens(layer, &mut |token| {
            if let KeyToken::Behavior { id, args } = token {
                if id == "osl" {
                    if let Some(arg) = args.first_mut() {
                        if index_of.get(arg.as_str()).is_some_and(|&t| t <= idx) {
                            arg.push_str("_SHADOW");
                        }
                    }
                }
            }
        });
    }

    // Copies are taken after the rewrite so a shadow carries the same
    // emissions as its rewritten source layer.
    for target in &targets {
        let source = expanded
            .iter()
            .find(|l| l.name == *target)
            .cloned()
            .unwrap_or_else(|| AbstractLayer::new(target.clone()));
        let mut shadow = source;
        shadow.name = format!("{target}_SHADOW");
        expanded.push(shadow);
    }

    Ok(expanded)
}

fn osl_target(token: &KeyToken) -> Option<&str> {
    match token {
        KeyToken::Behavior { id, args } if id == "osl" => args.first().map(String::as_str),
        _ => None,
    }
}

fn visit_tokens(layer: &AbstractLayer, visit: &mut impl FnMut(&KeyToken)) {
    if let Some(core) = &layer.core {
        core.iter().for_each(&mut *visit);
    }
    for tokens in layer.extensions.values() {
        tokens.iter().for_each(&mut *visit);
    }
    if let Some(rows) = &layer.full_layout {
        for cell in rows.iter().flatten() {
            if let LayoutCell::Token(token) = cell {
                visit(token);
            }
        }
    }
}

fn rewrite_tokens(layer: &mut AbstractLayer, rewrite: &mut impl FnMut(&mut KeyToken)) {
    if let Some(core) = &mut layer.core {
        core.iter_mut().for_each(&mut *rewrite);
    }
    for tokens in layer.extensions.values_mut() {
        tokens.iter_mut().for_each(&mut *rewrite);
    }
    if let Some(rows) = &mut layer.full_layout {
        for cell in rows.iter_mut().flatten() {
            if let LayoutCell::Token(token) = cell {
                rewrite(token);
            }
        }
    }
}
