//! Magic key configuration: static alternate-repeat tables per base layer.

/// What the magic key emits when the table has no entry for the previous
/// key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MagicDefault {
    /// Repeat the previous key.
    Repeat,
    /// Do nothing.
    None,
    /// Emit a fixed key.
    Key(String),
}

/// Output of one magic mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MagicOutput {
    /// Emit a key.
    Key(String),
    /// Emit a text expansion.
    Text(String),
}

/// One trigger-to-output mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicMapping {
    /// Previously typed key that selects this output.
    pub trigger: String,
    /// What the magic key emits.
    pub output: MagicOutput,
}

/// Magic table for one base-layer family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicTable {
    /// Base layer the table belongs to (e.g. `BASE`, `BASE_GR`).
    pub base_layer: String,
    /// Fallback when no mapping matches.
    pub default: MagicDefault,
    /// Match window in milliseconds; 0 means unlimited.
    pub timeout_ms: u32,
    /// Mappings in configuration order.
    pub mappings: Vec<MagicMapping>,
}

impl MagicTable {
    /// Lowercase identifier used in generated behavior and macro names.
    #[must_use]
    pub fn ident(&self) -> String {
        self.base_layer.to_lowercase()
    }
}

/// Resolves the magic table that applies to a layer.
///
/// A layer named exactly like a table is its own family. A layer named
/// `X_<suffix>` falls back to `BASE_<suffix>` when that table exists. When
/// exactly one table is configured it applies to every layer.
#[must_use]
pub fn resolve_family<'a>(tables: &'a [MagicTable], layer: &str) -> Option<&'a MagicTable> {
    if let Some(table) = tables.iter().find(|t| t.base_layer == layer) {
        return Some(table);
    }

    if let Some((_, suffix)) = layer.split_once('_') {
        let candidate = format!("BASE_{suffix}");
        if let Some(table) = tables.iter().find(|t| t.base_layer == candidate) {
            return Some(table);
        }
    }

    if tables.len() == 1 {
        return Some(&tables[0]);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(base: &str) -> MagicTable {
        MagicTable {
            base_layer: base.to_string(),
            default: MagicDefault::Repeat,
            timeout_ms: 0,
            mappings: Vec::new(),
        }
    }

    #[test]
    fn test_exact_match() {
        let tables = vec![table("BASE"), table("BASE_GR")];
        assert_eq!(resolve_family(&tables, "BASE").map(|t| t.base_layer.as_str()), Some("BASE"));
        assert_eq!(
            resolve_family(&tables, "BASE_GR").map(|t| t.base_layer.as_str()),
            Some("BASE_GR")
        );
    }

    #[test]
    fn test_suffix_fallback() {
        let tables = vec![table("BASE"), table("BASE_GR")];
        assert_eq!(
            resolve_family(&tables, "NAV_GR").map(|t| t.base_layer.as_str()),
            Some("BASE_GR")
        );
    }

    #[test]
    fn test_single_table_applies_everywhere() {
        let tables = vec![table("BASE")];
        assert_eq!(resolve_family(&tables, "NAV").map(|t| t.base_layer.as_str()), Some("BASE"));
    }

    #[test]
    fn test_no_family() {
        let tables = vec![table("BASE"), table("BASE_GR")];
        assert!(resolve_family(&tables, "NAV").is_none());

        let empty: Vec<MagicTable> = Vec::new();
        assert!(resolve_family(&empty, "BASE").is_none());
    }

    #[test]
    fn test_ident() {
        assert_eq!(table("BASE_GR").ident(), "base_gr");
    }
}
