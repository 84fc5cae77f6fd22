//! Parsing of `aliases.yaml`: the behavior dictionary and keycode overrides.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{CompileError, CompileResult};
use crate::models::{BehaviorAlias, Firmware};
use crate::registry::KeycodeMapping;

#[derive(Debug, Deserialize)]
struct RawAliases {
    #[serde(default)]
    aliases: HashMap<String, RawAlias>,
    #[serde(default)]
    special_keycodes: HashMap<String, KeycodeMapping>,
}

#[derive(Debug, Deserialize)]
struct RawAlias {
    #[serde(default)]
    params: Vec<String>,
    #[serde(default)]
    qmk: String,
    #[serde(default)]
    zmk: String,
    #[serde(default)]
    firmware: Option<Vec<String>>,
}

/// Parses the alias dictionary and special-keycode overrides.
///
/// An omitted `firmware` list means the alias targets both firmwares; an
/// empty template still marks the alias unsupported on that target.
pub fn parse(source: &str) -> CompileResult<(Vec<BehaviorAlias>, HashMap<String, KeycodeMapping>)> {
    let raw: RawAliases = serde_yml::from_str(source)
        .map_err(|e| CompileError::config(format!("aliases.yaml: {e}")))?;

    let mut aliases = Vec::with_capacity(raw.aliases.len());
    for (id, body) in raw.aliases {
        aliases.push(parse_alias(id, body)?);
    }

    Ok((aliases, raw.special_keycodes))
}

fn parse_alias(id: String, raw: RawAlias) -> CompileResult<BehaviorAlias> {
    if !is_alias_ident(&id) {
        return Err(CompileError::config(format!(
            "invalid alias id '{id}' (must be a lowercase identifier)"
        )));
    }
    for param in &raw.params {
        if !is_alias_ident(param) {
            return Err(CompileError::config(format!(
                "alias '{id}' has invalid parameter name '{param}'"
            )));
        }
    }

    check_placeholders(&id, "qmk", &raw.qmk, &raw.params)?;
    check_placeholders(&id, "zmk", &raw.zmk, &raw.params)?;

    let firmware = match raw.firmware {
        Some(names) => {
            let mut targets = Vec::with_capacity(names.len());
            for name in &names {
                let target = Firmware::parse(name)
                    .map_err(|e| CompileError::config(format!("alias '{id}': {}", e.message)))?;
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
            targets
        }
        None => vec![Firmware::Qmk, Firmware::Zmk],
    };

    Ok(BehaviorAlias {
        id,
        params: raw.params,
        qmk: raw.qmk,
        zmk: raw.zmk,
        firmware,
    })
}

fn is_alias_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            first.is_ascii_lowercase()
                && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        None => false,
    }
}

fn check_placeholders(id: &str, target: &str, template: &str, params: &[String]) -> CompileResult<()> {
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let tail = &rest[start + 1..];
        let Some(end) = tail.find('}') else {
            return Err(CompileError::config(format!(
                "alias '{id}': unterminated placeholder in {target} template"
            )));
        };
        let name = &tail[..end];
        if !params.iter().any(|p| p == name) {
            return Err(CompileError::config(format!(
                "alias '{id}': {target} template references undeclared parameter '{name}'"
            ))
            .with_suggestion(format!("declared parameters: {}", params.join(", "))));
        }
        rest = &tail[end + 1..];
    }
    Ok(())
}
