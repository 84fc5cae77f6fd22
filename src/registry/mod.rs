//! Behavior alias registry and literal keycode table.
//!
//! The registry is built once per run from the alias dictionary plus any
//! user keycode overrides, and is shared read-only by both translators.

use std::collections::HashMap;

use regex::Regex;
use serde::Deserialize;

use crate::error::{CompileError, CompileResult};
use crate::models::{BehaviorAlias, Firmware};

/// Firmware emissions for one unified key name.
///
/// A `None` field means the name follows the prefix convention for that
/// firmware; `Some("")` marks it unsupported (the translator degrades the
/// key); any other string is emitted verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KeycodeMapping {
    /// QMK keycode expression.
    #[serde(default)]
    pub qmk: Option<String>,
    /// ZMK binding.
    #[serde(default)]
    pub zmk: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedTable {
    keycodes: HashMap<String, KeycodeMapping>,
}

/// Lookup service for behavior aliases and literal keycodes.
#[derive(Debug)]
pub struct AliasRegistry {
    aliases: HashMap<String, BehaviorAlias>,
    keycodes: HashMap<String, KeycodeMapping>,
    name_pattern: Regex,
}

impl AliasRegistry {
    /// Builds the registry from parsed aliases and user keycode overrides.
    ///
    /// The embedded default table is merged field-wise under the overrides,
    /// so a user entry that only sets one firmware keeps the default for the
    /// other.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for duplicate alias ids or if the
    /// embedded table fails to parse.
    pub fn new(
        aliases: Vec<BehaviorAlias>,
        overrides: HashMap<String, KeycodeMapping>,
    ) -> CompileResult<Self> {
        let mut alias_map = HashMap::new();
        for alias in aliases {
            let id = alias.id.clone();
            if alias_map.insert(id.clone(), alias).is_some() {
                return Err(CompileError::config(format!(
                    "duplicate behavior alias '{id}'"
                ))
                .with_suggestion("each alias id may be defined only once"));
            }
        }

        let embedded: EmbeddedTable = serde_yml::from_str(include_str!("keycodes.yaml"))
            .map_err(|e| {
                CompileError::config(format!("embedded keycode table is invalid: {e}"))
            })?;

        let mut keycodes = embedded.keycodes;
        for (name, over) in overrides {
            let entry = keycodes.entry(name).or_default();
            if over.qmk.is_some() {
                entry.qmk = over.qmk;
            }
            if over.zmk.is_some() {
                entry.zmk = over.zmk;
            }
        }

        let name_pattern = Regex::new(r"^[A-Z][A-Z0-9_]*$").map_err(|e| {
            CompileError::config(format!("keycode name pattern is invalid: {e}"))
        })?;

        Ok(Self {
            aliases: alias_map,
            keycodes,
            name_pattern,
        })
    }

    /// Looks up a behavior alias by id.
    ///
    /// # Errors
    ///
    /// Returns an unknown-behavior error naming the known ids when the id
    /// is not defined.
    pub fn resolve(&self, id: &str) -> CompileResult<&BehaviorAlias> {
        self.aliases.get(id).ok_or_else(|| {
            CompileError::unknown_behavior(format!("behavior '{id}' is not defined"))
                .with_suggestion(format!("known behaviors: {}", self.alias_ids().join(", ")))
        })
    }

    /// Returns true when the alias exists and carries a non-empty template
    /// for the firmware.
    #[must_use]
    pub fn supports(&self, id: &str, firmware: Firmware) -> bool {
        self.aliases
            .get(id)
            .is_some_and(|alias| alias.supports(firmware))
    }

    /// Translates a literal key name for one firmware.
    ///
    /// Returns `None` when the name is unsupported on that firmware, either
    /// through an empty table entry or because the name cannot follow the
    /// prefix convention.
    #[must_use]
    pub fn literal(&self, name: &str, firmware: Firmware) -> Option<String> {
        if let Some(mapping) = self.keycodes.get(name) {
            let field = match firmware {
                Firmware::Qmk => &mapping.qmk,
                Firmware::Zmk => &mapping.zmk,
            };
            match field {
                Some(code) if code.is_empty() => return None,
                Some(code) => return Some(code.clone()),
                None => {}
            }
        }
        if !self.name_pattern.is_match(name) {
            return None;
        }
        Some(match firmware {
            Firmware::Qmk => format!("KC_{name}"),
            Firmware::Zmk => format!("&kp {name}"),
        })
    }

    /// All defined alias ids, sorted.
    #[must_use]
    pub fn alias_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.aliases.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_alias(id: &str, firmware: Vec<Firmware>) -> BehaviorAlias {
        BehaviorAlias {
            id: id.to_string(),
            params: vec!["mod".to_string(), "key".to_string()],
            qmk: "{mod}_T({key})".to_string(),
            zmk: "&hm {mod} {key}".to_string(),
            firmware,
        }
    }

    fn registry() -> AliasRegistry {
        AliasRegistry::new(
            vec![sample_alias("hrm", vec![Firmware::Qmk, Firmware::Zmk])],
            HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_known_alias() {
        let registry = registry();
        assert_eq!(registry.resolve("hrm").unwrap().arity(), 2);
    }

    #[test]
    fn test_resolve_unknown_alias_names_known_ids() {
        let registry = registry();
        let err = registry.resolve("xyz").unwrap_err();
        assert!(err.to_string().contains("'xyz'"));
        assert!(err.to_string().contains("hrm"));
    }

    #[test]
    fn test_supports_requires_listed_firmware() {
        let registry = AliasRegistry::new(
            vec![sample_alias("hrm", vec![Firmware::Zmk])],
            HashMap::new(),
        )
        .unwrap();
        assert!(registry.supports("hrm", Firmware::Zmk));
        assert!(!registry.supports("hrm", Firmware::Qmk));
        assert!(!registry.supports("xyz", Firmware::Zmk));
    }

    #[test]
    fn test_literal_table_entry() {
        let registry = registry();
        assert_eq!(
            registry.literal("COMM", Firmware::Qmk).as_deref(),
            Some("KC_COMM")
        );
        assert_eq!(
            registry.literal("COMM", Firmware::Zmk).as_deref(),
            Some("&kp COMMA")
        );
        assert_eq!(
            registry.literal("DFU", Firmware::Zmk).as_deref(),
            Some("&bootloader")
        );
    }

    #[test]
    fn test_literal_prefix_convention() {
        let registry = registry();
        assert_eq!(registry.literal("A", Firmware::Qmk).as_deref(), Some("KC_A"));
        assert_eq!(
            registry.literal("F12", Firmware::Zmk).as_deref(),
            Some("&kp F12")
        );
    }

    #[test]
    fn test_literal_rejects_unconventional_names() {
        let registry = registry();
        assert_eq!(registry.literal("a", Firmware::Qmk), None);
        assert_eq!(registry.literal("9LIVES", Firmware::Zmk), None);
    }

    #[test]
    fn test_literal_empty_override_degrades() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "EUR".to_string(),
            KeycodeMapping {
                qmk: Some(String::new()),
                zmk: Some("&kp RA(N5)".to_string()),
            },
        );
        let registry = AliasRegistry::new(Vec::new(), overrides).unwrap();
        assert_eq!(registry.literal("EUR", Firmware::Qmk), None);
        assert_eq!(
            registry.literal("EUR", Firmware::Zmk).as_deref(),
            Some("&kp RA(N5)")
        );
    }

    #[test]
    fn test_override_merges_field_wise() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "SPC".to_string(),
            KeycodeMapping {
                qmk: Some("KC_SPACE".to_string()),
                zmk: None,
            },
        );
        let registry = AliasRegistry::new(Vec::new(), overrides).unwrap();
        assert_eq!(
            registry.literal("SPC", Firmware::Qmk).as_deref(),
            Some("KC_SPACE")
        );
        assert_eq!(
            registry.literal("SPC", Firmware::Zmk).as_deref(),
            Some("&kp SPACE")
        );
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let result = AliasRegistry::new(
            vec![
                sample_alias("hrm", vec![Firmware::Qmk]),
                sample_alias("hrm", vec![Firmware::Zmk]),
            ],
            HashMap::new(),
        );
        assert!(result.is_err());
    }
}
