//! Shared YAML fixtures for E2E CLI tests.
#![allow(dead_code)] // Not every test file uses every fixture

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Alias dictionary shared by every fixture keymap: the hold-tap family,
/// one-shot and default layer switches, shift-morphs, a ZMK-only bluetooth
/// behavior, and one keycode override that QMK cannot emit.
pub fn aliases_standard() -> String {
    r#"
aliases:
  hrm: { params: [mod, key], qmk: "{mod}_T({key})", zmk: "&hm {mod} {key}" }
  lt:  { params: [layer, key], qmk: "LT({layer}, {key})", zmk: "&lt {layer} {key}" }
  mt:  { params: [mod, key], qmk: "{mod}_T({key})", zmk: "&mt {mod} {key}" }
  osl: { params: [layer], qmk: "OSL({layer})", zmk: "&sl {layer}" }
  df:  { params: [layer], qmk: "DF({layer})", zmk: "&to {layer}" }
  sm:  { params: [base, shifted], qmk: "{base}", zmk: "&sm_{base}_{shifted}" }
  bt:  { params: [action], qmk: "", zmk: "&bt BT_{action}", firmware: [zmk] }
special_keycodes:
  EUR: { qmk: "", zmk: "&kp RA(N5)" }
"#
    .to_string()
}

/// Two-layer Colemak-DH keymap exercising home-row mods, shift-morphs, a
/// layer-tap, the magic key, an action combo, a macro combo, and one magic
/// table with a key output and a text output.
pub fn keymap_basic() -> String {
    r#"
layers:
  BASE:
    core:
      - [Q, W, F, P, B]
      - ["hrm:LGUI:A", "hrm:LALT:R", "hrm:LCTL:S", "hrm:LSFT:T", G]
      - [Z, X, C, D, V]
      - [J, L, U, Y, QUOT]
      - [M, "hrm:RSFT:N", "hrm:RCTL:E", "hrm:RALT:I", "hrm:RGUI:O"]
      - [K, H, "sm:COMM:SCLN", "sm:DOT:COLN", SLSH]
      - [ESC, "lt:NAV:SPC", TAB]
      - [ENT, BSPC, MAGIC]
  NAV:
    core:
      - [NONE, NONE, NONE, NONE, NONE]
      - [LGUI, LALT, LCTL, LSFT, NONE]
      - [NONE, NONE, NONE, NONE, NONE]
      - [NONE, HOME, UP, END, PGUP]
      - [NONE, LEFT, DOWN, RGHT, PGDN]
      - [NONE, NONE, NONE, NONE, NONE]
      - [TRNS, TRNS, TRNS]
      - [TRNS, TRNS, TRNS]
combos:
  - name: esc
    keys: [3, 4]
    action: ESC
    layers: [BASE]
  - name: wq
    keys: [1, 2]
    macro: ":wq\n"
    timeout_ms: 35
magic:
  BASE:
    default: REPEAT
    timeout_ms: 250
    mappings:
      A: O
      T: { text: "ment" }
"#
    .to_string()
}

/// Single-layer keymap with plain letters only.
pub fn keymap_minimal() -> String {
    r#"
layers:
  BASE:
    core:
      - [Q, W, F, P, B]
      - [A, R, S, T, G]
      - [Z, X, C, D, V]
      - [J, L, U, Y, QUOT]
      - [M, N, E, I, O]
      - [K, H, COMM, DOT, SLSH]
      - [ESC, SPC, TAB]
      - [ENT, BSPC, DEL]
"#
    .to_string()
}

/// `keymap_basic` with one key QMK cannot emit (EUR only has a ZMK
/// override), so QMK boards compile with a degrade warning.
pub fn keymap_with_warnings() -> String {
    keymap_basic().replace("[NONE, HOME, UP, END, PGUP]", "[EUR, HOME, UP, END, PGUP]")
}

/// Three-layer keymap where NUM references the earlier SYM layer through a
/// one-shot, forcing a SYM_SHADOW copy. The forward reference in BASE stays
/// untouched.
pub fn keymap_with_osl() -> String {
    r#"
layers:
  BASE:
    core:
      - [Q, W, F, P, B]
      - [A, R, S, T, G]
      - [Z, X, C, D, V]
      - [J, L, U, Y, QUOT]
      - [M, N, E, I, O]
      - [K, H, COMM, DOT, SLSH]
      - [ESC, "osl:SYM", TAB]
      - [ENT, BSPC, DEL]
  SYM:
    core:
      - [EXLM, AT, HASH, DLR, PERC]
      - [NONE, NONE, NONE, NONE, NONE]
      - [NONE, NONE, NONE, NONE, NONE]
      - [CIRC, AMPR, ASTR, LPRN, RPRN]
      - [NONE, NONE, NONE, NONE, NONE]
      - [NONE, NONE, NONE, NONE, NONE]
      - [TRNS, TRNS, TRNS]
      - [TRNS, TRNS, TRNS]
  NUM:
    core:
      - [N1, N2, N3, N4, N5]
      - [NONE, NONE, NONE, NONE, NONE]
      - [NONE, NONE, NONE, NONE, NONE]
      - [N6, N7, N8, N9, N0]
      - [NONE, NONE, NONE, NONE, NONE]
      - [NONE, NONE, NONE, NONE, NONE]
      - ["osl:SYM", TRNS, TRNS]
      - [TRNS, TRNS, TRNS]
"#
    .to_string()
}

/// One QMK board.
pub fn boards_qmk() -> String {
    r#"
boards:
  skeletyl:
    name: "BastardKB Skeletyl"
    firmware: qmk
    layout_size: 3x5_3
    qmk_keyboard: bastardkb/skeletyl
"#
    .to_string()
}

/// One QMK board and one ZMK shield.
pub fn boards_dual() -> String {
    r#"
boards:
  skeletyl:
    name: "BastardKB Skeletyl"
    firmware: qmk
    layout_size: 3x5_3
    qmk_keyboard: bastardkb/skeletyl
  corne:
    name: "Corne"
    firmware: zmk
    layout_size: 3x6_3
    zmk_shield: corne
    zmk_board: nice_nano_v2
"#
    .to_string()
}

/// `boards_dual` plus a custom-size board no fixture layer fits, which
/// fails to compile while the other two succeed.
pub fn boards_with_broken() -> String {
    format!(
        "{}  boaty:\n    firmware: qmk\n    layout_size: custom_9\n    qmk_keyboard: jels/boaty\n",
        boards_dual()
    )
}

/// Writes the configuration trio into `dir`.
pub fn write_config(dir: &Path, keymap: &str, boards: &str, aliases: &str) {
    fs::write(dir.join("keymap.yaml"), keymap).expect("Failed to write keymap.yaml");
    fs::write(dir.join("boards.yaml"), boards).expect("Failed to write boards.yaml");
    fs::write(dir.join("aliases.yaml"), aliases).expect("Failed to write aliases.yaml");
}

/// Creates a temp directory holding the trio and returns it with the config
/// and output directory paths. The output directory is not created; the
/// generator is expected to do that itself.
pub fn setup_config(keymap: &str, boards: &str) -> (TempDir, PathBuf, PathBuf) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config_dir = temp.path().join("config");
    fs::create_dir_all(&config_dir).expect("Failed to create config dir");
    write_config(&config_dir, keymap, boards, &aliases_standard());
    let output_dir = temp.path().join("out");
    (temp, config_dir, output_dir)
}
