//! Application-wide constants.
//!
//! This module defines constants used throughout the application,
//! including the canonical layout geometry and fixed firmware emissions.

/// The display name of the application (human-readable).
pub const APP_NAME: &str = "keymapgen";

/// The binary name of the application (used in command examples).
pub const APP_BINARY_NAME: &str = "keymapgen";

/// Number of keys in the canonical core layout shared by every board.
pub const CORE_KEY_COUNT: usize = 36;

/// Layer, combo, and magic configuration file name.
pub const KEYMAP_FILE: &str = "keymap.yaml";

/// Board inventory file name.
pub const BOARDS_FILE: &str = "boards.yaml";

/// Behavior alias dictionary file name.
pub const ALIASES_FILE: &str = "aliases.yaml";

/// Combo trigger window when the configuration omits one.
pub const DEFAULT_COMBO_TIMEOUT_MS: u32 = 50;

/// Marker comment line leading every generated file.
pub const GENERATED_MARKER: &str = "AUTO-GENERATED - DO NOT EDIT";

/// QMK emission for a position with no key.
pub const QMK_NO_KEY: &str = "KC_NO";

/// QMK emission for a transparent position.
pub const QMK_TRANSPARENT: &str = "KC_TRNS";

/// ZMK emission for a position with no key.
pub const ZMK_NO_KEY: &str = "&none";

/// ZMK emission for a transparent position.
pub const ZMK_TRANSPARENT: &str = "&trans";
