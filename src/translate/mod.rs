//! Per-target key translation.
//!
//! A translator turns one abstract token into one emission string for its
//! firmware. Translators are created per board, accumulate degrade warnings
//! and shift-morph pairs while a board compiles, and are discarded with the
//! board.

pub mod qmk;
pub mod zmk;

pub use qmk::QmkTranslator;
pub use zmk::ZmkTranslator;

use crate::error::CompileResult;
use crate::models::{Firmware, Hand, KeyToken, MagicTable};
use crate::registry::AliasRegistry;

/// Where a token sits while it is being translated.
///
/// The layer name scopes magic-family resolution and warning messages; the
/// slot and hand drive position-dependent emissions.
#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    /// Layer being compiled.
    pub layer: &'a str,
    /// Canonical slot index within the compiled layer.
    pub slot: usize,
    /// Physical half the key sits on.
    pub hand: Hand,
}

/// One firmware's token-to-emission translation.
pub trait KeyTranslator {
    /// Translates a token into the firmware emission for its position.
    ///
    /// Unsupported behaviors and literals degrade to the firmware's no-op
    /// emission and record a warning; structural problems (unknown behavior
    /// id, wrong argument count) are errors.
    fn translate(&mut self, token: &KeyToken, ctx: &KeyContext<'_>) -> CompileResult<String>;

    /// Warnings accumulated so far, in emission order.
    fn warnings(&self) -> &[String];

    /// Shift-morph pairs seen so far as raw key names, deduplicated in
    /// first-seen order.
    fn shift_morphs(&self) -> &[(String, String)];
}

/// Builds the translator for a firmware.
#[must_use]
pub fn translator_for<'a>(
    firmware: Firmware,
    registry: &'a AliasRegistry,
    magic: &'a [MagicTable],
) -> Box<dyn KeyTranslator + 'a> {
    match firmware {
        Firmware::Qmk => Box::new(QmkTranslator::new(registry)),
        Firmware::Zmk => Box::new(ZmkTranslator::new(registry, magic)),
    }
}

/// Substitutes template placeholders with translated arguments.
///
/// `translate_arg` receives the parameter name and raw argument; returning
/// `None` aborts the whole substitution so the caller can degrade the token.
/// Placeholder names were validated against `params` at load time.
pub(crate) fn render_template<F>(
    template: &str,
    params: &[String],
    args: &[String],
    mut translate_arg: F,
) -> Option<String>
where
    F: FnMut(&str, &str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let end = tail.find('}')?;
        let name = &tail[..end];
        let index = params.iter().position(|p| p == name)?;
        out.push_str(&translate_arg(name, &args[index])?);
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template_substitutes_in_order() {
        let params = vec!["mod".to_string(), "key".to_string()];
        let args = vec!["LGUI".to_string(), "A".to_string()];
        let out = render_template("{mod}_T({key})", &params, &args, |_, arg| {
            Some(arg.to_string())
        });
        assert_eq!(out.as_deref(), Some("LGUI_T(A)"));
    }

    #[test]
    fn test_render_template_propagates_failure() {
        let params = vec!["key".to_string()];
        let args = vec!["EUR".to_string()];
        let out = render_template("OSL({key})", &params, &args, |_, _| None);
        assert_eq!(out, None);
    }

    #[test]
    fn test_render_template_without_placeholders() {
        let out = render_template("&caps_word", &[], &[], |_, _| None);
        assert_eq!(out.as_deref(), Some("&caps_word"));
    }
}
