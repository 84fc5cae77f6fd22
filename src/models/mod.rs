//! Data models for layers, boards, behaviors, and auxiliary structures.
//!
//! Everything here is created once by the configuration loader and read-only
//! afterwards; compilation state lives in the per-board pipeline instead.

pub mod alias;
pub mod board;
pub mod combo;
pub mod layer;
pub mod magic;
pub mod size_class;
pub mod token;

// Re-export all model types
pub use alias::BehaviorAlias;
pub use board::{BoardDescriptor, Firmware};
pub use combo::ComboSpec;
pub use layer::{flatten_core, AbstractLayer, LayoutCell};
pub use magic::{resolve_family, MagicDefault, MagicMapping, MagicOutput, MagicTable};
pub use size_class::{core_hand, ExtensionSpec, Hand, SizeClass};
pub use token::KeyToken;
