//! Combo definitions: multi-key chords on canonical core positions.

use crate::constants::CORE_KEY_COUNT;
use crate::error::{CompileError, CompileResult};
use crate::models::token::KeyToken;

/// One combo from the keymap configuration.
///
/// Positions refer to the canonical 36-key core; each target translates them
/// to physical positions (ZMK) or trigger keycodes (QMK) per board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboSpec {
    /// Combo name, used for generated identifiers.
    pub name: String,
    /// Canonical core positions that trigger the combo.
    pub keys: Vec<usize>,
    /// Key action emitted when the combo fires, parsed like any layer cell.
    /// Mutually exclusive with `macro_text`.
    pub action: Option<KeyToken>,
    /// Text expansion emitted when the combo fires.
    pub macro_text: Option<String>,
    /// Layer names the combo is active on; empty means all layers.
    pub layers: Vec<String>,
    /// Chord detection window in milliseconds.
    pub timeout_ms: u32,
    /// Minimum idle time before the combo may fire (ZMK only).
    pub require_prior_idle_ms: Option<u32>,
    /// Hold the combo until all keys release (ZMK only).
    pub slow_release: bool,
}

impl ComboSpec {
    /// True when the combo emits a text expansion rather than a key action.
    #[must_use]
    pub const fn is_macro(&self) -> bool {
        self.macro_text.is_some()
    }

    /// Checks structural invariants after parsing.
    pub fn validate(&self) -> CompileResult<()> {
        if !is_combo_ident(&self.name) {
            return Err(CompileError::config(format!(
                "combo name '{}' is not a valid identifier (lowercase letters, digits, underscores)",
                self.name
            )));
        }

        if self.keys.len() < 2 {
            return Err(CompileError::config(format!(
                "combo '{}' needs at least two key positions",
                self.name
            )));
        }

        for &pos in &self.keys {
            if pos >= CORE_KEY_COUNT {
                return Err(CompileError::config(format!(
                    "combo '{}' references position {pos}, but core positions are 0-{}",
                    self.name,
                    CORE_KEY_COUNT - 1
                ))
                .with_position(pos));
            }
        }

        match (&self.action, &self.macro_text) {
            (Some(_), Some(_)) => Err(CompileError::config(format!(
                "combo '{}' defines both an action and a macro; pick one",
                self.name
            ))),
            (None, None) => Err(CompileError::config(format!(
                "combo '{}' defines neither an action nor a macro",
                self.name
            ))),
            _ => Ok(()),
        }
    }
}

/// Combo names become C identifiers and devicetree node names, so keep them
/// to the common subset.
fn is_combo_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            first.is_ascii_lowercase()
                && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        None => false,
    }
}
