//! ZMK token translation.

use crate::constants::{ZMK_NO_KEY, ZMK_TRANSPARENT};
use crate::error::{CompileError, CompileResult};
use crate::models::{resolve_family, Firmware, Hand, KeyToken, MagicTable};
use crate::registry::AliasRegistry;

use super::{render_template, KeyContext, KeyTranslator};

/// Translates tokens into ZMK devicetree bindings.
pub struct ZmkTranslator<'a> {
    registry: &'a AliasRegistry,
    magic: &'a [MagicTable],
    warnings: Vec<String>,
    shift_morphs: Vec<(String, String)>,
}

impl<'a> ZmkTranslator<'a> {
    /// Creates a translator over the run's registry and magic tables.
    #[must_use]
    pub fn new(registry: &'a AliasRegistry, magic: &'a [MagicTable]) -> Self {
        Self {
            registry,
            magic,
            warnings: Vec::new(),
            shift_morphs: Vec::new(),
        }
    }

    fn degrade(&mut self, ctx: &KeyContext<'_>, what: &str) -> String {
        self.warnings.push(format!(
            "layer {} position {}: {what}, emitted {ZMK_NO_KEY}",
            ctx.layer, ctx.slot
        ));
        ZMK_NO_KEY.to_string()
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

        if !alias.supports(Firmware::Zmk) {
            return Ok(self.degrade(ctx, &format!("behavior '{id}' is unsupported on zmk")));
        }

        // Home-row mods pick the per-hand behavior so same-hand holds can
        // be rejected by the behavior's own positions.
        if id == "hrm" {
            let behavior = match ctx.hand {
                Hand::Left => "&hml",
                Hand::Right => "&hmr",
            };
            let modifier = zmk_arg(registry, &alias.params[0], &args[0]);
            let key = zmk_arg(registry, &alias.params[1], &args[1]);
            return match (modifier, key) {
                (Some(m), Some(k)) => Ok(format!("{behavior} {m} {k}")),
                _ => Ok(self.degrade(
                    ctx,
                    &format!("behavior '{id}' has an argument with no zmk emission"),
                )),
            };
        }

        // Shift-morphs reference a generated mod-morph node.
        if id == "sm" {
            let base = registry.literal(&args[0], Firmware::Zmk);
            let shifted = registry.literal(&args[1], Firmware::Zmk);
            return match (base, shifted) {
                (Some(_), Some(_)) => {
                    self.record_shift_morph(&args[0], &args[1]);
                    Ok(format!(
                        "&sm_{}_{}",
                        args[0].to_lowercase(),
                        args[1].to_lowercase()
                    ))
                }
                _ => Ok(self.degrade(
                    ctx,
                    &format!("shift-morph '{}:{}' is unsupported on zmk", args[0], args[1]),
                )),
            };
        }

        // The adaptive key is a behavior, not a keycode, so layer-taps and
        // mod-taps holding it route through generated hold-tap helpers.
        if matches!(id, "lt" | "mt") && args.last().is_some_and(|a| a == "MAGIC") {
            let Some(table) = resolve_family(self.magic, ctx.layer) else {
                return Ok(self.degrade(
                    ctx,
                    &format!("no magic table applies to layer '{}'", ctx.layer),
                ));
            };
            let family = table.ident();
            return match zmk_arg(registry, &alias.params[0], &args[0]) {
                Some(hold) => Ok(format!("&{id}_ak_{family} {hold} 0")),
                None => Ok(self.degrade(
                    ctx,
                    &format!("behavior '{id}' has an argument with no zmk emission"),
                )),
            };
        }

        let rendered = render_template(
            alias.template(Firmware::Zmk),
            &alias.params,
            args,
            |param, arg| zmk_arg(registry, param, arg),
        );
        match rendered {
            Some(out) => Ok(out),
            None => Ok(self.degrade(
                ctx,
                &format!("behavior '{id}' has an argument with no zmk emission"),
            )),
        }
    }
}

/// Argument translation: layer names pass through verbatim; everything else
/// is translated as a literal with any `&kp ` prefix dropped, so modifier
/// names land in their ZMK spelling (`LSFT` → `LSHFT`) inside bindings.
fn zmk_arg(registry: &AliasRegistry, param: &str, arg: &str) -> Option<String> {
    if param == "layer" {
        return Some(arg.to_string());
    }
    if matches!(arg, "MAGIC" | "NONE" | "TRNS") {
        return None;
    }
    let translated = registry.literal(arg, Firmware::Zmk)?;
    Some(
        translated
            .strip_prefix("&kp ")
            .unwrap_or(&translated)
            .to_string(),
    )
}

impl KeyTranslator for ZmkTranslator<'_> {
    fn translate(&mut self, token: &KeyToken, ctx: &KeyContext<'_>) -> CompileResult<String> {
        match token {
            KeyToken::NoKey => Ok(ZMK_NO_KEY.to_string()),
            KeyToken::Transparent => Ok(ZMK_TRANSPARENT.to_string()),
            KeyToken::Magic => match resolve_family(self.magic, ctx.layer) {
                Some(table) => Ok(format!("&ak_{}", table.ident())),
                None => Ok(self.degrade(
                    ctx,
                    &format!("no magic table applies to layer '{}'", ctx.layer),
                )),
            },
            KeyToken::Literal(name) => match self.registry.literal(name, Firmware::Zmk) {
                Some(code) => Ok(code),
                None => Ok(self.degrade(ctx, &format!("key '{name}' has no zmk emission"))),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileErrorKind;
    use crate::models::{BehaviorAlias, MagicDefault};
    use crate::registry::KeycodeMapping;
    use std::collections::HashMap;

    fn alias(id: &str, params: &[&str], qmk: &str, zmk: &str, firmware: &[Firmware]) -> BehaviorAlias {
        BehaviorAlias {
            id: id.to_string(),
            params: params.iter().map(|p| (*p).to_string()).collect(),
            qmk: qmk.to_string(),
            zmk: zmk.to_string(),
            firmware: firmware.to_vec(),
        }
    }

    fn dictionary() -> AliasRegistry {
        let both = [Firmware::Qmk, Firmware::Zmk];
        let mut overrides = HashMap::new();
        overrides.insert(
            "EUR".to_string(),
            KeycodeMapping {
                qmk: Some(String::new()),
                zmk: Some("&kp RA(N5)".to_string()),
            },
        );
        overrides.insert(
            "HYPR".to_string(),
            KeycodeMapping {
                qmk: Some("KC_HYPR".to_string()),
                zmk: Some(String::new()),
            },
        );
        AliasRegistry::new(
            vec![
                alias("hrm", &["mod", "key"], "{mod}_T({key})", "&hm {mod} {key}", &both),
                alias("lt", &["layer", "key"], "LT({layer}, {key})", "&lt {layer} {key}", &both),
                alias("mt", &["mod", "key"], "{mod}_T({key})", "&mt {mod} {key}", &both),
                alias("osl", &["layer"], "OSL({layer})", "&sl {layer}", &both),
                alias("df", &["layer"], "DF({layer})", "&to {layer}", &both),
                alias("sm", &["base", "shifted"], "{base}", "&sm_{base}_{shifted}", &both),
                alias("bt", &["action"], "", "&bt BT_{action}", &[Firmware::Zmk]),
            ],
            overrides,
        )
        .unwrap()
    }

    fn magic_tables() -> Vec<MagicTable> {
        vec![MagicTable {
            base_layer: "BASE".to_string(),
            default: MagicDefault::Repeat,
            timeout_ms: 0,
            mappings: Vec::new(),
        }]
    }

    fn ctx(layer: &str, hand: Hand) -> KeyContext<'_> {
        KeyContext {
            layer,
            slot: 12,
            hand,
        }
    }

    fn translate(translator: &mut ZmkTranslator<'_>, raw: &str) -> String {
        let token = KeyToken::parse(raw).unwrap();
        translator
            .translate(&token, &ctx("BASE", Hand::Left))
            .unwrap()
    }

    #[test]
    fn test_literals_and_sentinels() {
        let registry = dictionary();
        let magic = magic_tables();
        let mut t = ZmkTranslator::new(&registry, &magic);
        assert_eq!(translate(&mut t, "A"), "&kp A");
        assert_eq!(translate(&mut t, "COMM"), "&kp COMMA");
        assert_eq!(translate(&mut t, "EUR"), "&kp RA(N5)");
        assert_eq!(translate(&mut t, "NONE"), "&none");
        assert_eq!(translate(&mut t, "TRNS"), "&trans");
        assert_eq!(translate(&mut t, "DFU"), "&bootloader");
        assert!(t.warnings().is_empty());
    }

    #[test]
    fn test_home_row_mods_follow_the_hand() {
        let registry = dictionary();
        let magic = magic_tables();
        let mut t = ZmkTranslator::new(&registry, &magic);
        let token = KeyToken::parse("hrm:LGUI:A").unwrap();
        assert_eq!(
            t.translate(&token, &ctx("BASE", Hand::Left)).unwrap(),
            "&hml LGUI A"
        );
        let token = KeyToken::parse("hrm:RSFT:N").unwrap();
        assert_eq!(
            t.translate(&token, &ctx("BASE", Hand::Right)).unwrap(),
            "&hmr RSHFT N"
        );
    }

    #[test]
    fn test_behavior_templates() {
        let registry = dictionary();
        let magic = magic_tables();
        let mut t = ZmkTranslator::new(&registry, &magic);
        assert_eq!(translate(&mut t, "lt:NAV:SPC"), "&lt NAV SPACE");
        assert_eq!(translate(&mut t, "osl:SYM"), "&sl SYM");
        assert_eq!(translate(&mut t, "df:GAME"), "&to GAME");
        assert_eq!(translate(&mut t, "bt:next"), "&bt BT_NXT");
        assert_eq!(translate(&mut t, "bt:clr"), "&bt BT_CLR");
    }

    #[test]
    fn test_magic_key_resolves_family() {
        let registry = dictionary();
        let magic = magic_tables();
        let mut t = ZmkTranslator::new(&registry, &magic);
        assert_eq!(translate(&mut t, "MAGIC"), "&ak_base");

        // Suffix layers share the family through BASE_<suffix> lookup only;
        // with a single table every layer resolves to it.
        let token = KeyToken::parse("MAGIC").unwrap();
        assert_eq!(
            t.translate(&token, &ctx("NAV", Hand::Left)).unwrap(),
            "&ak_base"
        );
    }

    #[test]
    fn test_magic_without_table_degrades() {
        let registry = dictionary();
        let magic: Vec<MagicTable> = Vec::new();
        let mut t = ZmkTranslator::new(&registry, &magic);
        assert_eq!(translate(&mut t, "MAGIC"), "&none");
        assert_eq!(t.warnings().len(), 1);
        assert!(t.warnings()[0].contains("no magic table"));
    }

    #[test]
    fn test_magic_on_tap_side_uses_helpers() {
        let registry = dictionary();
        let magic = magic_tables();
        let mut t = ZmkTranslator::new(&registry, &magic);
        assert_eq!(translate(&mut t, "lt:NAV:MAGIC"), "&lt_ak_base NAV 0");
        assert_eq!(translate(&mut t, "mt:LSFT:MAGIC"), "&mt_ak_base LSHFT 0");
    }

    #[test]
    fn test_shift_morph_references_node() {
        let registry = dictionary();
        let magic = magic_tables();
        let mut t = ZmkTranslator::new(&registry, &magic);
        assert_eq!(translate(&mut t, "sm:COMM:SCLN"), "&sm_comm_scln");
        assert_eq!(translate(&mut t, "sm:COMM:SCLN"), "&sm_comm_scln");
        assert_eq!(
            t.shift_morphs(),
            &[("COMM".to_string(), "SCLN".to_string())]
        );
    }

    #[test]
    fn test_unsupported_literal_degrades() {
        let registry = dictionary();
        let magic = magic_tables();
        let mut t = ZmkTranslator::new(&registry, &magic);
        assert_eq!(translate(&mut t, "HYPR"), "&none");
        assert_eq!(t.warnings().len(), 1);
    }

    #[test]
    fn test_unknown_behavior_is_an_error() {
        let registry = dictionary();
        let magic = magic_tables();
        let mut t = ZmkTranslator::new(&registry, &magic);
        let token = KeyToken::parse("zoom:A").unwrap();
        let err = t
            .translate(&token, &ctx("BASE", Hand::Left))
            .unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UnknownBehavior);
    }
}
