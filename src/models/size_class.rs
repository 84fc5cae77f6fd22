//! Physical size classes and board geometry.
//!
//! A size class fixes everything geometric about a board: its key count, the
//! extensions it requires beyond the 36-key core, the weave from canonical
//! key order into physical rows, and the canonical-position to
//! physical-position mapping used by combos.

use std::fmt;

use crate::constants::CORE_KEY_COUNT;
use crate::error::{CompileError, CompileResult};

/// Which half of a split board a key sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    /// Left half.
    Left,
    /// Right half.
    Right,
}

/// A named block of keys a size class adds beyond the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionSpec {
    /// Extension identifier as written in layer configuration.
    pub id: &'static str,
    /// Fixed number of keys in the extension.
    pub len: usize,
    /// Half of the board the extension sits on.
    pub hand: Hand,
}

const OUTER_PINKY: [ExtensionSpec; 2] = [
    ExtensionSpec {
        id: "outer_pinky_left",
        len: 3,
        hand: Hand::Left,
    },
    ExtensionSpec {
        id: "outer_pinky_right",
        len: 3,
        hand: Hand::Right,
    },
];

const BOTTOM_PINKY: [ExtensionSpec; 2] = [
    ExtensionSpec {
        id: "bottom_pinky_left",
        len: 1,
        hand: Hand::Left,
    },
    ExtensionSpec {
        id: "bottom_pinky_right",
        len: 1,
        hand: Hand::Right,
    },
];

/// Declared physical geometry of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    /// 36 keys, the bare core (`3x5_3`).
    Split3x5,
    /// 42 keys, core plus outer pinky columns (`3x6_3`).
    Split3x6,
    /// 38 keys, core plus one extra bottom pinky key per half (`totem_38`).
    Totem38,
    /// Bespoke matrix of `n` keys, laid out via `full_layout` (`custom_<n>`).
    Custom(usize),
}

impl SizeClass {
    /// Parses a `layout_size` string from the board inventory.
    pub fn parse(raw: &str) -> CompileResult<Self> {
        match raw {
            "3x5_3" => Ok(Self::Split3x5),
            "3x6_3" => Ok(Self::Split3x6),
            "totem_38" => Ok(Self::Totem38),
            _ => {
                if let Some(count) = raw.strip_prefix("custom_") {
                    let count: usize = count.parse().map_err(|_| {
                        CompileError::config(format!(
                            "invalid custom size class '{raw}' (expected custom_<key count>)"
                        ))
                    })?;
                    if count == 0 {
                        return Err(CompileError::config(format!(
                            "custom size class '{raw}' must have at least one key"
                        )));
                    }
                    Ok(Self::Custom(count))
                } else {
                    Err(CompileError::config(format!(
                        "unknown layout size '{raw}' (expected 3x5_3, 3x6_3, totem_38, or custom_<n>)"
                    )))
                }
            }
        }
    }

    /// Total key count for the class.
    #[must_use]
    pub fn key_count(&self) -> usize {
        match self {
            Self::Custom(count) => *count,
            _ => {
                CORE_KEY_COUNT
                    + self
                        .required_extensions()
                        .iter()
                        .map(|e| e.len)
                        .sum::<usize>()
            }
        }
    }

    /// True when layers are resolved through `full_layout` instead of
    /// core-plus-extensions.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// Extensions the class requires, in fixed application order.
    #[must_use]
    pub const fn required_extensions(&self) -> &'static [ExtensionSpec] {
        match self {
            Self::Split3x6 => &OUTER_PINKY,
            Self::Totem38 => &BOTTOM_PINKY,
            Self::Split3x5 | Self::Custom(_) => &[],
        }
    }

    /// Looks up an extension identifier across every standard size class.
    #[must_use]
    pub fn known_extension(id: &str) -> Option<&'static ExtensionSpec> {
        OUTER_PINKY
            .iter()
            .chain(BOTTOM_PINKY.iter())
            .find(|spec| spec.id == id)
    }

    /// Hand of a compiled key slot in canonical order (core first, then
    /// required extensions in declared order).
    #[must_use]
    pub fn hand_of(&self, slot: usize) -> Hand {
        if slot < CORE_KEY_COUNT {
            return core_hand(slot);
        }

        let mut next = CORE_KEY_COUNT;
        for spec in self.required_extensions() {
            if slot < next + spec.len {
                return spec.hand;
            }
            next += spec.len;
        }

        Hand::Right
    }

    /// Maps a canonical core position (0-35) to the physical key position
    /// used by combo definitions on this class. Returns `None` for custom
    /// classes, which have no canonical-to-physical mapping.
    #[must_use]
    pub fn combo_position(&self, canonical: usize) -> Option<usize> {
        if canonical >= CORE_KEY_COUNT {
            return None;
        }
        match self {
            Self::Split3x5 => Some(canonical),
            Self::Split3x6 => {
                if canonical >= 30 {
                    // Thumbs sit after three rows of twelve.
                    Some(canonical + 6)
                } else {
                    let row = canonical / 10;
                    let col = canonical % 10;
                    Some(row * 12 + col + 1)
                }
            }
            Self::Totem38 => {
                if canonical >= 30 {
                    Some(canonical + 2)
                } else if canonical >= 20 {
                    // Bottom row gains a pinky key on each end.
                    Some(canonical + 1)
                } else {
                    Some(canonical)
                }
            }
            Self::Custom(_) => None,
        }
    }

    /// Canonical slot indices grouped into physical rows, in output order.
    ///
    /// Custom classes return no rows; their layers carry their own row
    /// structure from `full_layout`.
    #[must_use]
    pub fn physical_rows(&self) -> Vec<Vec<usize>> {
        match self {
            Self::Split3x5 => vec![
                (0..10).collect(),
                (10..20).collect(),
                (20..30).collect(),
                (30..36).collect(),
            ],
            Self::Split3x6 => {
                // Extensions land at slots 36-38 (left column, top to
                // bottom) and 39-41 (right column).
                let mut rows = Vec::with_capacity(4);
                for line in 0..3 {
                    let mut row = Vec::with_capacity(12);
                    row.push(36 + line);
                    row.extend(line * 10..(line + 1) * 10);
                    row.push(39 + line);
                    rows.push(row);
                }
                rows.push((30..36).collect());
                rows
            }
            Self::Totem38 => {
                let mut bottom = Vec::with_capacity(12);
                bottom.push(36);
                bottom.extend(20..30);
                bottom.push(37);
                vec![
                    (0..10).collect(),
                    (10..20).collect(),
                    bottom,
                    (30..36).collect(),
                ]
            }
            Self::Custom(_) => Vec::new(),
        }
    }

    /// QMK layout macro invoked in the generated keymap.
    #[must_use]
    pub const fn qmk_layout_macro(&self) -> &'static str {
        match self {
            Self::Split3x5 => "LAYOUT_split_3x5_3",
            Self::Split3x6 => "LAYOUT_split_3x6_3",
            Self::Totem38 | Self::Custom(_) => "LAYOUT",
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Split3x5 => write!(f, "3x5_3"),
            Self::Split3x6 => write!(f, "3x6_3"),
            Self::Totem38 => write!(f, "totem_38"),
            Self::Custom(count) => write!(f, "custom_{count}"),
        }
    }
}

/// Hand of a canonical core position: rows of ten split down the middle,
/// thumbs split three and three.
#[must_use]
pub fn core_hand(slot: usize) -> Hand {
    if slot >= 30 {
        if slot < 33 {
            Hand::Left
        } else {
            Hand::Right
        }
    } else if slot % 10 < 5 {
        Hand::Left
    } else {
        Hand::Right
    }
}
