//! Abstract key tokens parsed from the keymap configuration.
//!
//! Every cell in a layer grid is parsed exactly once, at load time, into a
//! [`KeyToken`]. Translators consume the structured form and never re-split
//! the original colon syntax.

use std::fmt;

use crate::error::{CompileError, CompileResult};

/// One abstract key cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyToken {
    /// Plain key name (`A`, `COMM`, `VOLU`).
    Literal(String),
    /// Behavior invocation from the colon syntax (`hrm:LGUI:A`).
    Behavior {
        /// Behavior id, resolved against the alias registry.
        id: String,
        /// Ordered arguments, arity-checked against the alias.
        args: Vec<String>,
    },
    /// No-op key, written as `NONE`.
    NoKey,
    /// Fall-through to the next lower layer, written as `TRNS`.
    Transparent,
    /// Alternate-repeat key, written as `MAGIC`.
    Magic,
}

impl KeyToken {
    /// Parses a raw configuration cell into a token.
    ///
    /// Sentinels (`NONE`, `TRNS`, `MAGIC`) are recognized first; anything
    /// containing a colon is a behavior invocation; everything else is a
    /// literal key name. `bt` actions are normalized to their ZMK spelling
    /// (`next` -> `NXT`) here so translation stays a pure table lookup.
    pub fn parse(raw: &str) -> CompileResult<Self> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Err(CompileError::config("empty key token"));
        }

        match raw {
            "NONE" => return Ok(Self::NoKey),
            "TRNS" => return Ok(Self::Transparent),
            "MAGIC" => return Ok(Self::Magic),
            _ => {}
        }

        if raw.contains(':') {
            let mut parts = raw.split(':');
            let id = parts.next().unwrap_or_default().trim();
            if id.is_empty() {
                return Err(CompileError::config(format!(
                    "key token '{raw}' has no behavior id before the colon"
                )));
            }

            let mut args = Vec::new();
            for part in parts {
                let part = part.trim();
                if part.is_empty() {
                    return Err(CompileError::config(format!(
                        "key token '{raw}' has an empty parameter"
                    )));
                }
                validate_name(part, raw)?;
                args.push(part.to_string());
            }

            if args.is_empty() {
                return Err(CompileError::config(format!(
                    "behavior token '{raw}' has no parameters"
                )));
            }

            if id == "bt" {
                args = args.into_iter().map(|a| normalize_bt_action(&a)).collect();
            }

            return Ok(Self::Behavior {
                id: id.to_string(),
                args,
            });
        }

        validate_name(raw, raw)?;
        Ok(Self::Literal(raw.to_string()))
    }

    /// Resolves the token to the key name a combo trigger matches on.
    ///
    /// Hold-tap behaviors resolve to their tap key, shift-morphs to their
    /// base key. Returns `None` for tokens with no matchable key (layer
    /// switches, sentinels, the magic key).
    #[must_use]
    pub fn tap_key(&self) -> Option<&str> {
        match self {
            Self::Literal(name) => Some(name),
            Self::Behavior { id, args } => match id.as_str() {
                "hrm" | "mt" | "lt" => args.last().map(String::as_str),
                "sm" => args.first().map(String::as_str),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns true for the `NONE` and `TRNS` sentinels.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        matches!(self, Self::NoKey | Self::Transparent)
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(name) => write!(f, "{name}"),
            Self::Behavior { id, args } => write!(f, "{id}:{}", args.join(":")),
            Self::NoKey => write!(f, "NONE"),
            Self::Transparent => write!(f, "TRNS"),
            Self::Magic => write!(f, "MAGIC"),
        }
    }
}

/// Checks that a key name or behavior parameter uses identifier characters.
fn validate_name(name: &str, token: &str) -> CompileResult<()> {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(CompileError::config(format!(
            "key token '{token}' contains invalid characters (expected letters, digits, or underscores)"
        )))
    }
}

/// Normalizes bluetooth action spellings to the ZMK binding suffix.
fn normalize_bt_action(action: &str) -> String {
    match action.to_ascii_lowercase().as_str() {
        "next" => "NXT".to_string(),
        "prev" => "PRV".to_string(),
        "clr" => "CLR".to_string(),
        _ => action.to_ascii_uppercase(),
    }
}
