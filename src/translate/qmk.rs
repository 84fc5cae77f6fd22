//! QMK token translation.

use crate::constants::{QMK_NO_KEY, QMK_TRANSPARENT};
use crate::error::{CompileError, CompileResult};
use crate::models::{Firmware, KeyToken};
use crate::registry::AliasRegistry;

use super::{render_template, KeyContext, KeyTranslator};

/// Translates tokens into QMK keycode expressions.
pub struct QmkTranslator<'a> {
    registry: &'a AliasRegistry,
    warnings: Vec<String>,
    shift_morphs: Vec<(String, String)>,
}

impl<'a> QmkTranslator<'a> {
    /// Creates a translator over the run's registry.
    #[must_use]
    pub fn new(registry: &'a AliasRegistry) -> Self {
        Self {
            registry,
            warnings: Vec::new(),
            shift_morphs: Vec::new(),
        }
    }

    fn degrade(&mut self, ctx: &KeyContext<'_>, what: &str) -> String {
        self.warnings.push(format!(
            "layer {} position {}: {what}, emitted {QMK_NO_KEY}",
            ctx.layer, ctx.slot
        ));
        QMK_NO_KEY.to_string()
    }

    fn record_shift_morph(&mut self, base: &str, shifted: &str) {
        if !self
            .shift_morphs
            .iter()
            .any(|(b, s)| b == base && s == shifted)
        {
            self.shift_morphs
                .push((base.to_string(), shifted.to_string()));
        }
    }

    fn translate_behavior(
        &mut self,
        id: &str,
        args: &[String],
        ctx: &KeyContext<'_>,
    ) -> CompileResult<String> {
        let registry = self.registry;
        let alias = registry
            .resolve(id)
            .map_err(|e| e.with_layer(ctx.layer).with_position(ctx.slot))?;

        if args.len() != alias.arity() {
            return Err(CompileError::translation(format!(
                "behavior '{id}' expects {} arguments, got {}",
                alias.arity(),
                args.len()
            ))
            .with_layer(ctx.layer)
            .with_position(ctx.slot));
        }

        if !alias.supports(Firmware::Qmk) {
            return Ok(self.degrade(ctx, &format!("behavior '{id}' is unsupported on qmk")));
        }

        // Shift-morphs emit the bare base key; the pair feeds the
        // key-override table instead of the keymap array.
        if id == "sm" {
            let base = registry.literal(&args[0], Firmware::Qmk);
            let shifted = registry.literal(&args[1], Firmware::Qmk);
            return match (base, shifted) {
                (Some(base_code), Some(_)) => {
                    self.record_shift_morph(&args[0], &args[1]);
                    Ok(base_code)
                }
                _ => Ok(self.degrade(
                    ctx,
                    &format!("shift-morph '{}:{}' is unsupported on qmk", args[0], args[1]),
                )),
            };
        }

        let rendered = render_template(
            alias.template(Firmware::Qmk),
            &alias.params,
            args,
            |param, arg| qmk_arg(registry, param, arg),
        );
        match rendered {
            Some(out) => Ok(out),
            None => Ok(self.degrade(
                ctx,
                &format!("behavior '{id}' has an argument with no qmk emission"),
            )),
        }
    }
}

/// Argument translation: parameters named `key` become keycodes, everything
/// else (layer names, modifier names) passes through verbatim.
fn qmk_arg(registry: &AliasRegistry, param: &str, arg: &str) -> Option<String> {
    if param != "key" {
        return Some(arg.to_string());
    }
    match arg {
        "MAGIC" => Some("QK_AREP".to_string()),
        "NONE" | "TRNS" => None,
        _ => registry.literal(arg, Firmware::Qmk),
    }
}

impl KeyTranslator for QmkTranslator<'_> {
    fn translate(&mut self, token: &KeyToken, ctx: &KeyContext<'_>) -> CompileResult<String> {
        match token {
            KeyToken::NoKey => Ok(QMK_NO_KEY.to_string()),
            KeyToken::Transparent => Ok(QMK_TRANSPARENT.to_string()),
            KeyToken::Magic => Ok("QK_AREP".to_string()),
            KeyToken::Literal(name) => match self.registry.literal(name, Firmware::Qmk) {
                Some(code) => Ok(code),
                None => Ok(self.degrade(ctx, &format!("key '{name}' has no qmk emission"))),
            },
            KeyToken::Behavior { id, args } => self.translate_behavior(id, args, ctx),
        }
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn shift_morphs(&self) -> &[(String, String)] {
        &self.shift_morphs
    }
}
