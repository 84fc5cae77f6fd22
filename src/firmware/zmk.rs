//! ZMK output: a `<shield>.keymap` devicetree file per board.
//!
//! Layers arrive already translated to binding strings, so this module only
//! assembles nodes: combos, macros for text expansions, generated behaviors
//! (adaptive keys, hold-tap helpers, mod-morphs), and the keymap itself.
//! Behavior nodes are emitted only when some binding references them, so the
//! output never carries dead nodes or dangling references.

use std::path::PathBuf;

use crate::compiler::CompiledLayer;
use crate::constants::GENERATED_MARKER;
use crate::error::{CompileError, CompileResult};
use crate::firmware::{
    combo_applies, combo_layer_indices, combo_source_layer, marker_header, physical_rows,
    AuxStructures, GeneratedBoard, GeneratedFile,
};
use crate::models::{
    core_hand, AbstractLayer, BoardDescriptor, Firmware, MagicDefault, MagicOutput, MagicTable,
};
use crate::registry::AliasRegistry;
use crate::translate::{KeyContext, KeyTranslator};

/// Generates `<shield>.keymap` and `README.md` for one ZMK board.
pub fn generate(
    board: &BoardDescriptor,
    compiled: &[CompiledLayer],
    raw_layers: &[&AbstractLayer],
    aux: &AuxStructures<'_>,
    translator: &mut dyn KeyTranslator,
) -> CompileResult<GeneratedBoard> {
    let Some(output_name) = board.zmk_output_name() else {
        return Err(CompileError::config(format!(
            "board '{}' targets zmk but has neither zmk_shield nor zmk_board",
            board.id
        )));
    };
    let output_name = output_name.to_string();

    let mut warnings = Vec::new();
    let combos = combo_nodes(board, compiled, raw_layers, aux, translator, &mut warnings)?;
    // Snapshot after combo actions so morphs used only by combos are kept.
    let morphs = translator.shift_morphs().to_vec();

    let mut macros: Vec<(String, String)> = combos.macros.clone();
    let (behavior_entries, magic_macros) =
        magic_behaviors(aux, compiled, &combos.bindings, &mut warnings)?;
    for entry in magic_macros {
        if !macros.iter().any(|(name, _)| *name == entry.0) {
            macros.push(entry);
        }
    }

    let mut behaviors = behavior_entries;
    behaviors.extend(morph_entries(&morphs, aux.registry));

    let keymap = render_keymap(
        board,
        &output_name,
        compiled,
        &combos.nodes,
        &macros,
        &behaviors,
    );

    let dir = PathBuf::from("zmk").join("config");
    let files = vec![
        GeneratedFile::new(dir.join(format!("{output_name}.keymap")), keymap),
        GeneratedFile::new(
            dir.join("README.md"),
            render_readme(board, &output_name, compiled),
        ),
    ];

    Ok(GeneratedBoard { files, warnings })
}

/// Combo output: devicetree nodes, binding strings (for the behavior
/// reference scan), and macro definitions for text expansions.
struct ComboOutput {
    nodes: Vec<String>,
    bindings: Vec<String>,
    macros: Vec<(String, String)>,
}

fn combo_nodes(
    board: &BoardDescriptor,
    compiled: &[CompiledLayer],
    raw_layers: &[&AbstractLayer],
    aux: &AuxStructures<'_>,
    translator: &mut dyn KeyTranslator,
    warnings: &mut Vec<String>,
) -> CompileResult<ComboOutput> {
    let mut out = ComboOutput {
        nodes: Vec::new(),
        bindings: Vec::new(),
        macros: Vec::new(),
    };

    for combo in aux.combos {
        if !combo_applies(combo, compiled) {
            continue;
        }

        let positions: Option<Vec<usize>> = combo
            .keys
            .iter()
            .map(|&pos| board.layout_size.combo_position(pos))
            .collect();
        let Some(positions) = positions else {
            warnings.push(format!(
                "combo '{}' skipped: size class {} has no combo position map",
                combo.name, board.layout_size
            ));
            continue;
        };

        let binding = if let Some(text) = &combo.macro_text {
            out.macros
                .push((combo.name.clone(), macro_node(&combo.name, text, aux.registry)?));
            format!("&{}", combo.name)
        } else if let Some(action) = &combo.action {
            let source = combo_source_layer(combo, raw_layers)?;
            let slot = combo.keys[0];
            let ctx = KeyContext {
                layer: &source.name,
                slot,
                hand: core_hand(slot),
            };
            translator.translate(action, &ctx)?
        } else {
            return Err(CompileError::config(format!(
                "combo '{}' defines neither an action nor a macro",
                combo.name
            )));
        };

        let positions_str = positions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        let mut node = format!(
            "        combo_{} {{\n            timeout-ms = <{}>;\n            key-positions = <{positions_str}>;\n            bindings = <{binding}>;",
            combo.name, combo.timeout_ms
        );

        let layer_indices = combo_layer_indices(combo, compiled);
        if !layer_indices.is_empty() {
            let layers_str = layer_indices
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            node.push_str(&format!("\n            layers = <{layers_str}>;"));
        }
        if let Some(ms) = combo.require_prior_idle_ms {
            if ms > 0 {
                node.push_str(&format!("\n            require-prior-idle-ms = <{ms}>;"));
            }
        }
        if combo.slow_release {
            node.push_str("\n            slow-release;");
        }
        node.push_str("\n        };");

        out.nodes.push(node);
        out.bindings.push(binding);
    }

    Ok(out)
}

/// Builds a `zmk,behavior-macro` node that taps out `text` one key at a
/// time, with conservative wait/tap timing so long expansions don't drop
/// characters.
fn macro_node(name: &str, text: &str, registry: &AliasRegistry) -> CompileResult<String> {
    let keycodes: Vec<String> = text
        .chars()
        .map(|ch| char_keycode(registry, ch))
        .collect::<CompileResult<_>>()?;

    let mut lines = vec![
        format!("        {name}: {name}_macro {{"),
        "            compatible = \"zmk,behavior-macro\";".to_string(),
        format!("            label = \"{}\";", name.to_uppercase()),
        "            #binding-cells = <0>;".to_string(),
        "            bindings".to_string(),
        "                = <&macro_wait_time 10>".to_string(),
        "                , <&macro_tap_time 10>".to_string(),
    ];

    for chunk in keycodes.chunks(10) {
        let taps = chunk
            .iter()
            .map(|k| format!("&kp {k}"))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("                , <&macro_tap {taps}>"));
    }

    lines.push("                ;".to_string());
    lines.push("        };".to_string());
    Ok(lines.join("\n"))
}

/// Maps one character of macro text to a ZMK keycode. Case is not
/// preserved; letters tap their unshifted key.
fn char_keycode(registry: &AliasRegistry, ch: char) -> CompileResult<String> {
    let token = match ch {
        'a'..='z' | 'A'..='Z' => ch.to_ascii_uppercase().to_string(),
        '0'..='9' => format!("N{ch}"),
        ' ' => "SPC".to_string(),
        '\n' => "ENT".to_string(),
        '.' => "DOT".to_string(),
        ',' => "COMM".to_string(),
        '\'' => "QUOT".to_string(),
        '-' => "MINS".to_string(),
        '_' => "UNDS".to_string(),
        '@' => "AT".to_string(),
        ':' => "COLN".to_string(),
        ';' => "SCLN".to_string(),
        '/' => "SLSH".to_string(),
        '!' => "EXLM".to_string(),
        '?' => "QUES".to_string(),
        '#' => "HASH".to_string(),
        _ => {
            return Err(CompileError::translation(format!(
                "macro text character '{ch}' has no keycode mapping"
            )))
        }
    };

    let binding = registry.literal(&token, Firmware::Zmk).ok_or_else(|| {
        CompileError::translation(format!(
            "macro text character '{ch}' has no zmk keycode"
        ))
    })?;
    Ok(binding
        .strip_prefix("&kp ")
        .unwrap_or(&binding)
        .to_string())
}

/// Emits adaptive-key behaviors plus hold-tap helpers for every magic table
/// some binding actually references, and collects the macros its text
/// expansions need.
fn magic_behaviors(
    aux: &AuxStructures<'_>,
    compiled: &[CompiledLayer],
    combo_bindings: &[String],
    warnings: &mut Vec<String>,
) -> CompileResult<(Vec<String>, Vec<(String, String)>)> {
    let mut entries = Vec::new();
    let mut macros: Vec<(String, String)> = Vec::new();

    for table in aux.magic {
        let ident = table.ident();
        let ak = format!("&ak_{ident}");
        let lt_ak = format!("&lt_ak_{ident}");
        let mt_ak = format!("&mt_ak_{ident}");

        let wants_ak = references(compiled, combo_bindings, &ak);
        let wants_lt = references(compiled, combo_bindings, &lt_ak);
        let wants_mt = references(compiled, combo_bindings, &mt_ak);
        if !wants_ak && !wants_lt && !wants_mt {
            continue;
        }

        entries.push(adaptive_key_node(table, &ident, aux.registry, &mut macros, warnings)?);
        if wants_lt {
            entries.push(hold_tap_helper("lt", &ident, "&mo"));
        }
        if wants_mt {
            entries.push(hold_tap_helper("mt", &ident, "&kp"));
        }
    }

    Ok((entries, macros))
}

/// True when any compiled binding or combo binding invokes `behavior`.
/// Matching is word-exact so `&ak_base` never matches `&ak_base_gr`.
fn references(compiled: &[CompiledLayer], combo_bindings: &[String], behavior: &str) -> bool {
    compiled
        .iter()
        .flat_map(|layer| layer.keys.iter())
        .chain(combo_bindings.iter())
        .flat_map(|binding| binding.split_whitespace())
        .any(|word| word == behavior)
}

fn adaptive_key_node(
    table: &MagicTable,
    ident: &str,
    registry: &AliasRegistry,
    macros: &mut Vec<(String, String)>,
    warnings: &mut Vec<String>,
) -> CompileResult<String> {
    let default = match &table.default {
        MagicDefault::Repeat => "&key_repeat".to_string(),
        MagicDefault::None => "&none".to_string(),
        MagicDefault::Key(key) => match registry.literal(key, Firmware::Zmk) {
            Some(binding) => binding,
            None => {
                warnings.push(format!(
                    "magic table '{}': default '{key}' has no zmk keycode, falling back to repeat",
                    table.base_layer
                ));
                "&key_repeat".to_string()
            }
        },
    };

    let mut lines = vec![
        format!("        ak_{ident}: ak_{ident} {{"),
        "            compatible = \"zmk,behavior-adaptive-key\";".to_string(),
        "            #binding-cells = <0>;".to_string(),
        format!("            bindings = <{default}>;"),
    ];

    for mapping in &table.mappings {
        let Some(raw) = registry.literal(&mapping.trigger, Firmware::Zmk) else {
            warnings.push(format!(
                "magic table '{}': trigger '{}' has no zmk keycode, mapping skipped",
                table.base_layer, mapping.trigger
            ));
            continue;
        };
        let keycode = raw.strip_prefix("&kp ").unwrap_or(&raw).to_string();
        // Trigger keys must be plain keycodes; behaviors cannot trigger.
        if keycode.contains('&') || keycode.contains(char::is_whitespace) {
            warnings.push(format!(
                "magic table '{}': trigger '{}' is not a plain keycode, mapping skipped",
                table.base_layer, mapping.trigger
            ));
            continue;
        }

        let binding = match &mapping.output {
            MagicOutput::Key(key) if key == "NONE" => "&none".to_string(),
            MagicOutput::Key(key) => match registry.literal(key, Firmware::Zmk) {
                Some(binding) => binding,
                None => {
                    warnings.push(format!(
                        "magic table '{}': output '{key}' has no zmk keycode, mapping skipped",
                        table.base_layer
                    ));
                    continue;
                }
            },
            MagicOutput::Text(text) => {
                let name = format!("magic_{ident}_{}", sanitize_ident(&keycode));
                if !macros.iter().any(|(existing, _)| *existing == name) {
                    macros.push((name.clone(), macro_node(&name, text, registry)?));
                }
                format!("&{name}")
            }
        };

        lines.push(String::new());
        lines.push(format!("            {}_trigger {{", sanitize_ident(&keycode)));
        lines.push(format!("                trigger-keys = <{keycode}>;"));
        lines.push(format!("                bindings = <{binding}>;"));
        // Non-alpha triggers would otherwise greedily match their shifted
        // variants; shifted alphas (capitals) are wanted.
        let is_alpha = keycode.len() == 1 && keycode.chars().all(|c| c.is_ascii_alphabetic());
        if !is_alpha {
            lines.push("                strict-modifiers;".to_string());
        }
        if table.timeout_ms > 0 {
            lines.push(format!(
                "                max-prior-idle-ms = <{}>;",
                table.timeout_ms
            ));
        }
        lines.push("            };".to_string());
    }

    lines.push("        };".to_string());
    Ok(lines.join("\n"))
}

/// Hold-tap wrapper so the adaptive key can sit on the tap side of a
/// layer-tap or mod-tap. Properties are fixed rather than read from the
/// user's behavior file.
fn hold_tap_helper(kind: &str, ident: &str, hold: &str) -> String {
    let name = format!("{kind}_ak_{ident}");
    [
        format!("        {name}: {name} {{"),
        "            compatible = \"zmk,behavior-hold-tap\";".to_string(),
        format!("            label = \"{}\";", name.to_uppercase()),
        "            #binding-cells = <2>;".to_string(),
        "            flavor = \"balanced\";".to_string(),
        "            tapping-term-ms = <200>;".to_string(),
        "            quick-tap-ms = <200>;".to_string(),
        format!("            bindings = <{hold}>, <&ak_{ident}>;"),
        "        };".to_string(),
    ]
    .join("\n")
}

fn morph_entries(morphs: &[(String, String)], registry: &AliasRegistry) -> Vec<String> {
    morphs
        .iter()
        .filter_map(|(base, shifted)| {
            // Both sides resolved during translation, so these cannot miss.
            let base_binding = registry.literal(base, Firmware::Zmk)?;
            let shifted_binding = registry.literal(shifted, Firmware::Zmk)?;
            let name = format!("sm_{}_{}", base.to_lowercase(), shifted.to_lowercase());
            Some(
                [
                    format!("        {name}: {name} {{"),
                    "            compatible = \"zmk,behavior-mod-morph\";".to_string(),
                    "            #binding-cells = <0>;".to_string(),
                    format!("            bindings = <{base_binding}>, <{shifted_binding}>;"),
                    "            mods = <(MOD_LSFT|MOD_RSFT)>;".to_string(),
                    "        };".to_string(),
                ]
                .join("\n"),
            )
        })
        .collect()
}

/// Devicetree-safe identifier fragment: lowercase alphanumerics with
/// underscores, runs of other characters collapsed.
fn sanitize_ident(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut gap = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            gap = false;
        } else if !gap {
            out.push('_');
            gap = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "key".to_string()
    } else {
        trimmed.to_string()
    }
}

fn render_keymap(
    board: &BoardDescriptor,
    output_name: &str,
    compiled: &[CompiledLayer],
    combo_nodes: &[String],
    macros: &[(String, String)],
    behaviors: &[String],
) -> String {
    let mut out = String::new();
    out.push_str(&marker_header(board, output_name));
    out.push('\n');
    out.push_str("#include <behaviors.dtsi>\n");
    out.push_str("#include <dt-bindings/zmk/keys.h>\n");
    out.push_str("#include <dt-bindings/zmk/bt.h>\n");
    out.push_str("#include \"user_behaviors.dtsi\"\n");

    out.push('\n');
    for (idx, layer) in compiled.iter().enumerate() {
        out.push_str(&format!("#define {} {idx}\n", layer.name));
    }

    let mut sections = Vec::new();
    if !combo_nodes.is_empty() {
        sections.push(format!(
            "    combos {{\n        compatible = \"zmk,combos\";\n\n{}\n    }};",
            combo_nodes.join("\n\n")
        ));
    }
    if !macros.is_empty() {
        let defs: Vec<&str> = macros.iter().map(|(_, node)| node.as_str()).collect();
        sections.push(format!("    macros {{\n{}\n    }};", defs.join("\n")));
    }
    if !behaviors.is_empty() {
        sections.push(format!(
            "    behaviors {{\n{}\n    }};",
            behaviors.join("\n\n")
        ));
    }

    let layers: Vec<String> = compiled
        .iter()
        .map(|layer| render_layer_node(layer, board))
        .collect();
    sections.push(format!(
        "    keymap {{\n        compatible = \"zmk,keymap\";\n\n{}\n    }};",
        layers.join("\n\n")
    ));

    out.push_str(&format!("\n/ {{\n{}\n}};\n", sections.join("\n\n")));
    out
}

fn render_layer_node(layer: &CompiledLayer, board: &BoardDescriptor) -> String {
    let rows: Vec<String> = physical_rows(layer, board)
        .iter()
        .map(|row| format!("{}{}", " ".repeat(16), row.join(" ")))
        .collect();

    format!(
        "        {}_layer {{\n            bindings = <\n{}\n            >;\n        }};",
        layer.name.to_lowercase(),
        rows.join("\n")
    )
}

fn render_readme(board: &BoardDescriptor, output_name: &str, compiled: &[CompiledLayer]) -> String {
    let build = match (board.zmk_board.as_deref(), board.zmk_shield.as_deref()) {
        (Some(mcu), Some(shield)) => format!("west build -b {mcu} -- -DSHIELD={shield}"),
        (Some(mcu), None) => format!("west build -b {mcu}"),
        _ => format!("west build -- -DSHIELD={output_name}"),
    };

    let mut out = format!(
        "<!-- {GENERATED_MARKER} -->\n\n# {}\n\nZMK keymap for `{output_name}`, compiled from keymap.yaml.\n\nBuild:\n\n    {build}\n\nLayers:\n\n",
        board.name
    );
    for (idx, layer) in compiled.iter().enumerate() {
        out.push_str(&format!("- {idx}: {}\n", layer.name));
    }
    out
}
