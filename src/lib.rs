//! Unified keymap compiler.
//!
//! One firmware-agnostic YAML configuration describes layers, boards,
//! combos, magic keys, and behavior aliases; compilation produces
//! ready-to-build QMK keymap sources and ZMK devicetree keymaps for every
//! board in the inventory.

// Module declarations
pub mod cli;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod error;
pub mod firmware;
pub mod models;
pub mod parser;
pub mod registry;
pub mod runner;
pub mod translate;
