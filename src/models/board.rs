//! Board inventory: the physical keyboards the keymap compiles for.

use std::fmt;

use crate::error::{CompileError, CompileResult};
use crate::models::size_class::SizeClass;

/// Firmware family a board runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Firmware {
    /// QMK, compiled to C keymap sources
    Qmk,
    /// ZMK, compiled to a devicetree keymap
    Zmk,
}

impl Firmware {
    /// Parses a `firmware` string from the board inventory.
    pub fn parse(raw: &str) -> CompileResult<Self> {
        match raw {
            "qmk" => Ok(Self::Qmk),
            "zmk" => Ok(Self::Zmk),
            _ => Err(CompileError::config(format!(
                "unknown firmware '{raw}' (expected qmk or zmk)"
            ))),
        }
    }
}

impl fmt::Display for Firmware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qmk => write!(f, "qmk"),
            Self::Zmk => write!(f, "zmk"),
        }
    }
}

/// One board in the inventory.
///
/// Immutable once loaded. The linkage field matching the declared firmware
/// (`qmk_keyboard` for QMK, `zmk_shield` or `zmk_board` for ZMK) must be
/// present; [`BoardDescriptor::validate`] enforces this at load.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardDescriptor {
    /// Unique board id (the key in `boards.yaml`).
    pub id: String,
    /// Display name for reports.
    pub name: String,
    /// Target firmware family.
    pub firmware: Firmware,
    /// Physical size class.
    pub layout_size: SizeClass,
    /// QMK keyboard path under `keyboards/` (e.g. `bastardkb/skeletyl`).
    pub qmk_keyboard: Option<String>,
    /// QMK keymap directory name; defaults to `generated`.
    pub keymap_name: Option<String>,
    /// ZMK shield name, when the board is a shield.
    pub zmk_shield: Option<String>,
    /// ZMK board name, when the board is standalone.
    pub zmk_board: Option<String>,
    /// Full-layout-only layers compiled for this board in addition to the
    /// shared core layers.
    pub extra_layers: Vec<String>,
}

impl BoardDescriptor {
    /// Checks the firmware linkage invariant.
    pub fn validate(&self) -> CompileResult<()> {
        match self.firmware {
            Firmware::Qmk => {
                if self.qmk_keyboard.as_deref().unwrap_or("").is_empty() {
                    return Err(CompileError::config(format!(
                        "board '{}' targets qmk but has no qmk_keyboard",
                        self.id
                    ))
                    .with_suggestion("set qmk_keyboard to the keyboard path, e.g. bastardkb/skeletyl"));
                }
            }
            Firmware::Zmk => {
                let shield = self.zmk_shield.as_deref().unwrap_or("");
                let board = self.zmk_board.as_deref().unwrap_or("");
                if shield.is_empty() && board.is_empty() {
                    return Err(CompileError::config(format!(
                        "board '{}' targets zmk but has neither zmk_shield nor zmk_board",
                        self.id
                    ))
                    .with_suggestion("set zmk_shield (e.g. corne) or zmk_board (e.g. totem)"));
                }
            }
        }
        Ok(())
    }

    /// QMK keymap directory name, defaulting to `generated`.
    #[must_use]
    pub fn keymap_name(&self) -> &str {
        self.keymap_name.as_deref().unwrap_or("generated")
    }

    /// Name used for ZMK output files: the shield if set, otherwise the
    /// board.
    #[must_use]
    pub fn zmk_output_name(&self) -> Option<&str> {
        self.zmk_shield
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.zmk_board.as_deref().filter(|s| !s.is_empty()))
    }
}
