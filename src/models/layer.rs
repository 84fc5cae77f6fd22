//! Abstract layers: the firmware-agnostic description of one keymap layer.

use std::collections::HashMap;

use crate::constants::CORE_KEY_COUNT;
use crate::error::{CompileError, CompileResult};
use crate::models::token::KeyToken;

/// One cell of a `full_layout` grid.
///
/// Cells either carry a key token directly or reference a position in the
/// layer's own 36-key core (`L36_<n>`), so custom boards can reuse the core
/// without restating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutCell {
    /// Reference to core position `n`.
    CoreRef(usize),
    /// Direct key token.
    Token(KeyToken),
}

/// A named layer: a 36-token core, optional fixed-length extensions, and an
/// optional bespoke full layout for custom-matrix boards.
///
/// Layers are immutable after load; the compiler only reads them.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractLayer {
    /// Layer name, used for enumeration order and cross-references.
    pub name: String,
    /// Exactly 36 tokens in canonical order when present. Layers that only
    /// define `full_layout` have no core.
    pub core: Option<Vec<KeyToken>>,
    /// Extension identifier to its ordered token list.
    pub extensions: HashMap<String, Vec<KeyToken>>,
    /// Bespoke layout rows for custom boards, row structure preserved.
    pub full_layout: Option<Vec<Vec<LayoutCell>>>,
}

impl AbstractLayer {
    /// Creates an empty layer with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            core: None,
            extensions: HashMap::new(),
            full_layout: None,
        }
    }

    /// Sets the 36-token core.
    #[must_use]
    pub fn with_core(mut self, core: Vec<KeyToken>) -> Self {
        self.core = Some(core);
        self
    }

    /// Adds an extension token list.
    #[must_use]
    pub fn with_extension(mut self, id: impl Into<String>, tokens: Vec<KeyToken>) -> Self {
        self.extensions.insert(id.into(), tokens);
        self
    }

    /// Sets the full layout rows.
    #[must_use]
    pub fn with_full_layout(mut self, rows: Vec<Vec<LayoutCell>>) -> Self {
        self.full_layout = Some(rows);
        self
    }

    /// True when the layer defines a core and can compile for standard
    /// size classes.
    #[must_use]
    pub const fn has_core(&self) -> bool {
        self.core.is_some()
    }

    /// True when the layer defines a full layout and can compile for custom
    /// size classes.
    #[must_use]
    pub const fn has_full_layout(&self) -> bool {
        self.full_layout.is_some()
    }

    /// Validates a layer name: must be usable as a C enum constant and a
    /// devicetree node name.
    pub fn validate_name(name: &str) -> CompileResult<()> {
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };

        if valid {
            Ok(())
        } else {
            Err(CompileError::config(format!(
                "invalid layer name '{name}' (must start with a letter and use only letters, digits, or underscores)"
            ))
            .with_suggestion("rename the layer, e.g. NAV or BASE_GR"))
        }
    }
}

/// Flattens an 8-row core grid into canonical position order.
///
/// The grid stores the three left-hand rows, the three right-hand rows, then
/// the left and right thumb rows. Canonical order interleaves them so
/// positions 0-9 are the top row across both halves, 10-19 the home row,
/// 20-29 the bottom row, and 30-35 the thumbs.
pub fn flatten_core(name: &str, rows: &[Vec<KeyToken>]) -> CompileResult<Vec<KeyToken>> {
    if rows.len() != 8 {
        return Err(CompileError::config(format!(
            "layer '{name}' core must have 8 rows (3 left, 3 right, left thumbs, right thumbs), got {}",
            rows.len()
        ))
        .with_layer(name));
    }

    for (idx, row) in rows.iter().enumerate() {
        let expected = if idx < 6 { 5 } else { 3 };
        if row.len() != expected {
            return Err(CompileError::config(format!(
                "layer '{name}' core row {idx} has {} keys, expected {expected}",
                row.len()
            ))
            .with_layer(name));
        }
    }

    let mut flat = Vec::with_capacity(CORE_KEY_COUNT);
    for line in 0..3 {
        flat.extend(rows[line].iter().cloned());
        flat.extend(rows[line + 3].iter().cloned());
    }
    flat.extend(rows[6].iter().cloned());
    flat.extend(rows[7].iter().cloned());

    Ok(flat)
}
