//! QMK output: `keymap.c` plus support files for one board.
//!
//! The generated keymap is self-contained. The layer enum, custom keycodes,
//! key overrides, combos, and callbacks are all emitted inline so the keymap
//! builds against a stock QMK checkout without a userspace header. Section
//! order inside `keymap.c` is fixed so diffs stay readable across runs.

use std::path::PathBuf;

use crate::compiler::CompiledLayer;
use crate::constants::{GENERATED_MARKER, QMK_NO_KEY};
use crate::error::{CompileError, CompileResult};
use crate::firmware::{
    combo_applies, combo_source_layer, marker_header, physical_rows, AuxStructures,
    GeneratedBoard, GeneratedFile,
};
use crate::models::{
    core_hand, resolve_family, AbstractLayer, BoardDescriptor, ComboSpec, Firmware, MagicDefault,
    MagicOutput, MagicTable,
};
use crate::registry::AliasRegistry;
use crate::translate::{KeyContext, KeyTranslator};

/// Width keycodes are padded to inside `LAYOUT_*` calls.
const CELL_WIDTH: usize = 20;

/// Generates `keymap.c`, `config.h`, `rules.mk`, and `README.md` for one
/// QMK board.
pub fn generate(
    board: &BoardDescriptor,
    compiled: &[CompiledLayer],
    raw_layers: &[&AbstractLayer],
    aux: &AuxStructures<'_>,
    translator: &mut dyn KeyTranslator,
) -> CompileResult<GeneratedBoard> {
    let Some(keyboard) = board.qmk_keyboard.as_deref() else {
        return Err(CompileError::config(format!(
            "board '{}' targets qmk but has no qmk_keyboard",
            board.id
        )));
    };

    let mut warnings = Vec::new();
    let combos = combo_emissions(compiled, raw_layers, aux, translator)?;
    let magic = magic_families(aux, compiled, &mut warnings);
    // Snapshot after combo actions so morphs used only by combos are kept.
    let morphs = translator.shift_morphs().to_vec();

    let keymap_c = render_keymap_c(
        board,
        keyboard,
        compiled,
        &combos,
        &magic,
        &morphs,
        aux.registry,
    );
    let needs_repeat = !magic.is_empty()
        || compiled
            .iter()
            .flat_map(|l| l.keys.iter())
            .map(String::as_str)
            .chain(combos.iter().map(|c| c.keycode.as_str()))
            .any(|k| k.contains("QK_AREP") || k.contains("QK_REP"));

    let dir = PathBuf::from("qmk")
        .join("keyboards")
        .join(keyboard)
        .join("keymaps")
        .join(board.keymap_name());

    let files = vec![
        GeneratedFile::new(dir.join("keymap.c"), keymap_c),
        GeneratedFile::new(dir.join("config.h"), render_config_h(board, keyboard)),
        GeneratedFile::new(
            dir.join("rules.mk"),
            render_rules_mk(board, !combos.is_empty(), !morphs.is_empty(), needs_repeat),
        ),
        GeneratedFile::new(
            dir.join("README.md"),
            render_readme(board, keyboard, compiled, &magic),
        ),
    ];

    Ok(GeneratedBoard { files, warnings })
}

/// One combo ready for emission: trigger keycodes resolved, action
/// translated, layer filter reduced to this board's layers.
struct ComboEmission<'a> {
    spec: &'a ComboSpec,
    enum_name: String,
    macro_name: Option<String>,
    sequence: Vec<String>,
    keycode: String,
    conditions: Vec<String>,
}

fn combo_emissions<'a>(
    compiled: &[CompiledLayer],
    raw_layers: &[&AbstractLayer],
    aux: &AuxStructures<'a>,
    translator: &mut dyn KeyTranslator,
) -> CompileResult<Vec<ComboEmission<'a>>> {
    let mut out = Vec::new();

    for combo in aux.combos {
        if !combo_applies(combo, compiled) {
            continue;
        }

        let source = combo_source_layer(combo, raw_layers)?;
        let sequence = trigger_keycodes(combo, source, aux.registry)?;

        let (keycode, macro_name) = if combo.is_macro() {
            let name = format!("MACRO_{}", combo.name.to_uppercase());
            (name.clone(), Some(name))
        } else if let Some(action) = &combo.action {
            let slot = combo.keys[0];
            let ctx = KeyContext {
                layer: &source.name,
                slot,
                hand: core_hand(slot),
            };
            (translator.translate(action, &ctx)?, None)
        } else {
            return Err(CompileError::config(format!(
                "combo '{}' defines neither an action nor a macro",
                combo.name
            )));
        };

        let conditions: Vec<String> = combo
            .layers
            .iter()
            .filter(|name| compiled.iter().any(|l| l.name == **name))
            .cloned()
            .collect();

        out.push(ComboEmission {
            spec: combo,
            enum_name: format!("COMBO_{}", combo.name.to_uppercase()),
            macro_name,
            sequence,
            keycode,
            conditions,
        });
    }

    Ok(out)
}

/// Resolves a combo's trigger positions to trigger KEYCODES from the source
/// layer's core. Hold-taps contribute their tap key; sentinels and tokens
/// without a tap key cannot anchor a combo.
fn trigger_keycodes(
    combo: &ComboSpec,
    source: &AbstractLayer,
    registry: &AliasRegistry,
) -> CompileResult<Vec<String>> {
    let Some(core) = &source.core else {
        return Err(CompileError::reference(format!(
            "combo '{}' resolves trigger keys from layer '{}', which has no core",
            combo.name, source.name
        ))
        .with_layer(&source.name));
    };

    combo
        .keys
        .iter()
        .map(|&pos| {
            let token = &core[pos];
            let key = token.tap_key().ok_or_else(|| {
                CompileError::reference(format!(
                    "combo '{}' position {pos} holds '{token}', which has no trigger keycode",
                    combo.name
                ))
                .with_layer(&source.name)
                .with_position(pos)
            })?;
            registry.literal(key, Firmware::Qmk).ok_or_else(|| {
                CompileError::reference(format!(
                    "combo '{}' trigger '{key}' has no qmk keycode",
                    combo.name
                ))
                .with_layer(&source.name)
                .with_position(pos)
            })
        })
        .collect()
}

/// One magic family on this board: the table, the compiled layers it covers,
/// and its rendered switch cases.
struct MagicFamily<'a> {
    table: &'a MagicTable,
    members: Vec<String>,
    cases: Vec<String>,
    fallback: String,
    macros: Vec<(String, String)>,
}

fn magic_families<'a>(
    aux: &AuxStructures<'a>,
    compiled: &[CompiledLayer],
    warnings: &mut Vec<String>,
) -> Vec<MagicFamily<'a>> {
    let mut out = Vec::new();

    for table in aux.magic {
        let members: Vec<String> = compiled
            .iter()
            .filter(|layer| {
                resolve_family(aux.magic, &layer.name).is_some_and(|t| std::ptr::eq(t, table))
            })
            .map(|layer| layer.name.clone())
            .collect();
        if members.is_empty() {
            continue;
        }

        let ident = table.ident().to_uppercase();
        let mut cases = Vec::new();
        let mut macros = Vec::new();

        for mapping in &table.mappings {
            let Some(trigger) = aux.registry.literal(&mapping.trigger, Firmware::Qmk) else {
                warnings.push(format!(
                    "magic table '{}': trigger '{}' has no qmk keycode, mapping skipped",
                    table.base_layer, mapping.trigger
                ));
                continue;
            };

            let emit = match &mapping.output {
                MagicOutput::Key(key) if key == "NONE" => QMK_NO_KEY.to_string(),
                MagicOutput::Key(key) => match aux.registry.literal(key, Firmware::Qmk) {
                    Some(code) => code,
                    None => {
                        warnings.push(format!(
                            "magic table '{}': output '{key}' has no qmk keycode, mapping skipped",
                            table.base_layer
                        ));
                        continue;
                    }
                },
                MagicOutput::Text(text) => {
                    let name = format!("MAGIC_{ident}_{}", mapping.trigger.to_uppercase());
                    macros.push((name.clone(), text.clone()));
                    name
                }
            };

            cases.push(format!("            case {trigger}: return {emit};"));
        }

        let fallback = match &table.default {
            MagicDefault::Repeat => "QK_REP".to_string(),
            MagicDefault::None => QMK_NO_KEY.to_string(),
            MagicDefault::Key(key) => match aux.registry.literal(key, Firmware::Qmk) {
                Some(code) => code,
                None => {
                    warnings.push(format!(
                        "magic table '{}': default '{key}' has no qmk keycode, falling back to repeat",
                        table.base_layer
                    ));
                    "QK_REP".to_string()
                }
            },
        };

        out.push(MagicFamily {
            table,
            members,
            cases,
            fallback,
            macros,
        });
    }

    out
}

/// Unified custom keycode list with SEND_STRING texts: combo macros in
/// configuration order first, then magic macros sorted by name.
fn custom_keycodes(
    combos: &[ComboEmission<'_>],
    magic: &[MagicFamily<'_>],
) -> Vec<(String, String)> {
    let mut out = Vec::new();

    for combo in combos {
        if let (Some(name), Some(text)) = (&combo.macro_name, &combo.spec.macro_text) {
            out.push((name.clone(), text.clone()));
        }
    }

    let mut magic_macros: Vec<(String, String)> = magic
        .iter()
        .flat_map(|family| family.macros.iter().cloned())
        .collect();
    magic_macros.sort_by(|a, b| a.0.cmp(&b.0));
    out.extend(magic_macros);

    out
}

#[allow(clippy::too_many_arguments)]
fn render_keymap_c(
    board: &BoardDescriptor,
    keyboard: &str,
    compiled: &[CompiledLayer],
    combos: &[ComboEmission<'_>],
    magic: &[MagicFamily<'_>],
    morphs: &[(String, String)],
    registry: &AliasRegistry,
) -> String {
    let mut out = String::new();
    out.push_str(&marker_header(board, keyboard));
    out.push_str("\n#include QMK_KEYBOARD_H\n");

    out.push_str("\nenum layers {\n");
    for layer in compiled {
        out.push_str("    ");
        out.push_str(&layer.name);
        out.push_str(",\n");
    }
    out.push_str("};\n");

    let custom = custom_keycodes(combos, magic);
    if !custom.is_empty() {
        out.push_str("\nenum custom_keycodes {\n");
        for (i, (name, _)) in custom.iter().enumerate() {
            if i == 0 {
                out.push_str(&format!("    {name} = SAFE_RANGE,\n"));
            } else {
                out.push_str(&format!("    {name},\n"));
            }
        }
        out.push_str("};\n");
    }

    out.push_str(&render_overrides(morphs, registry));
    out.push_str(&render_combo_block(combos));

    out.push_str("\nconst uint16_t PROGMEM keymaps[][MATRIX_ROWS][MATRIX_COLS] = {\n");
    for layer in compiled {
        out.push_str(&format!(
            "    [{}] = {},\n",
            layer.name,
            render_layout(board, layer)
        ));
    }
    out.push_str("};\n");

    out.push_str(&render_magic_callback(magic));
    out.push_str(&render_macro_handlers(&custom));

    out
}

fn render_overrides(morphs: &[(String, String)], registry: &AliasRegistry) -> String {
    // Both sides resolved during translation, so the lookups cannot miss;
    // filter_map keeps the pointer list in sync with the consts regardless.
    let resolved: Vec<(String, String, String)> = morphs
        .iter()
        .filter_map(|(base, shifted)| {
            let base_code = registry.literal(base, Firmware::Qmk)?;
            let shifted_code = registry.literal(shifted, Firmware::Qmk)?;
            Some((morph_ident(base, shifted), base_code, shifted_code))
        })
        .collect();

    if resolved.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n// Shift-morph key overrides\n");
    for (ident, base, shifted) in &resolved {
        out.push_str(&format!(
            "const key_override_t {ident}_override = ko_make_basic(MOD_MASK_SHIFT, {base}, {shifted});\n"
        ));
    }
    out.push_str("\nconst key_override_t *key_overrides[] = {\n");
    for (ident, _, _) in &resolved {
        out.push_str(&format!("    &{ident}_override,\n"));
    }
    out.push_str("    NULL\n};\n");
    out
}

fn morph_ident(base: &str, shifted: &str) -> String {
    format!("sm_{}_{}", base.to_lowercase(), shifted.to_lowercase())
}

fn render_combo_block(combos: &[ComboEmission<'_>]) -> String {
    if combos.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n#ifdef COMBO_ENABLE\n// Combo indices\nenum combo_events {\n");
    for combo in combos {
        out.push_str(&format!("    {},\n", combo.enum_name));
    }
    out.push_str("    COMBO_LENGTH\n};\n\n#define COMBO_COUNT COMBO_LENGTH\n");

    out.push_str("\n// Combo key sequences\n");
    for combo in combos {
        out.push_str(&format!(
            "const uint16_t PROGMEM {}_combo[] = {{{}, COMBO_END}};\n",
            combo.spec.name,
            combo.sequence.join(", ")
        ));
    }

    out.push_str("\n// Combo definitions\ncombo_t key_combos[] = {\n");
    let entries: Vec<String> = combos
        .iter()
        .map(|combo| {
            format!(
                "    [{}] = COMBO({}_combo, {})",
                combo.enum_name, combo.spec.name, combo.keycode
            )
        })
        .collect();
    out.push_str(&entries.join(",\n"));
    out.push_str("\n};\n");

    if combos.iter().any(|combo| !combo.conditions.is_empty()) {
        out.push_str("\n// Layer filtering\n");
        out.push_str(
            "bool combo_should_trigger(uint16_t combo_index, combo_t *combo, uint16_t keycode, keyrecord_t *record) {\n",
        );
        out.push_str("    uint8_t layer = get_highest_layer(layer_state);\n\n");
        out.push_str("    switch (combo_index) {\n");
        for combo in combos {
            if combo.conditions.is_empty() {
                continue;
            }
            let checks = combo
                .conditions
                .iter()
                .map(|name| format!("layer == {name}"))
                .collect::<Vec<_>>()
                .join(" || ");
            out.push_str(&format!(
                "        case {}:\n            return ({checks});\n",
                combo.enum_name
            ));
        }
        out.push_str("        default:\n            return true;\n    }\n}\n");
    }

    out.push_str("#endif  // COMBO_ENABLE\n");
    out
}

/// Renders one `LAYOUT_*(...)` call with 20-column cells. Shorter rows
/// (thumb clusters) are centered under the widest row.
fn render_layout(board: &BoardDescriptor, layer: &CompiledLayer) -> String {
    let rows = physical_rows(layer, board);
    let widest = rows.iter().map(Vec::len).max().unwrap_or(0);
    let row_count = rows.len();

    let mut lines = Vec::with_capacity(row_count);
    for (i, row) in rows.iter().enumerate() {
        let offset = (widest - row.len()) / 2;
        let mut line = " ".repeat(8 + offset * (CELL_WIDTH + 2));
        let cells: Vec<String> = row
            .iter()
            .map(|key| format!("{key:<width$}", width = CELL_WIDTH))
            .collect();
        line.push_str(&cells.join(", "));
        if i + 1 < row_count {
            line.push(',');
        }
        lines.push(line);
    }

    format!(
        "{}(\n{}\n    )",
        board.layout_size.qmk_layout_macro(),
        lines.join("\n")
    )
}

fn render_magic_callback(magic: &[MagicFamily<'_>]) -> String {
    if magic.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n// Magic key configuration (alternate repeat key)\n");
    out.push_str("uint16_t get_alt_repeat_key_keycode_user(uint16_t keycode, uint8_t mods) {\n");
    out.push_str("    uint8_t layer = get_highest_layer(layer_state);\n");

    for family in magic {
        let checks = family
            .members
            .iter()
            .map(|name| format!("layer == {name}"))
            .collect::<Vec<_>>()
            .join(" || ");
        out.push_str(&format!(
            "\n    // {} family\n    if ({checks}) {{\n        switch (keycode) {{\n",
            family.table.base_layer
        ));
        for case in &family.cases {
            out.push_str(case);
            out.push('\n');
        }
        out.push_str("        }\n");
        out.push_str(&format!("        return {};\n    }}\n", family.fallback));
    }

    out.push_str("\n    return QK_REP;\n}\n");
    out
}

fn render_macro_handlers(custom: &[(String, String)]) -> String {
    if custom.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n// Macro handlers\n");
    out.push_str("bool process_record_user(uint16_t keycode, keyrecord_t *record) {\n");
    out.push_str("    if (!record->event.pressed) {\n        return true;\n    }\n\n");
    out.push_str("    switch (keycode) {\n");
    for (name, text) in custom {
        out.push_str(&format!(
            "        case {name}:\n            SEND_STRING(\"{}\");\n            return false;\n",
            escape_c(text)
        ));
    }
    out.push_str("    }\n    return true;\n}\n");
    out
}

fn escape_c(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_config_h(board: &BoardDescriptor, keyboard: &str) -> String {
    format!("{}\n#pragma once\n", marker_header(board, keyboard))
}

fn render_rules_mk(
    board: &BoardDescriptor,
    has_combos: bool,
    has_overrides: bool,
    has_repeat: bool,
) -> String {
    let mut out = format!("# {GENERATED_MARKER}\n# Board: {}\n", board.name);
    if has_combos {
        out.push_str("COMBO_ENABLE = yes\n");
    }
    if has_overrides {
        out.push_str("KEY_OVERRIDE_ENABLE = yes\n");
    }
    if has_repeat {
        out.push_str("REPEAT_KEY_ENABLE = yes\n");
    }
    out
}

fn render_readme(
    board: &BoardDescriptor,
    keyboard: &str,
    compiled: &[CompiledLayer],
    magic: &[MagicFamily<'_>],
) -> String {
    let mut out = format!(
        "<!-- {GENERATED_MARKER} -->\n\n# {}\n\nQMK keymap for `{keyboard}`, compiled from keymap.yaml.\n\nBuild:\n\n    qmk compile -kb {keyboard} -km {}\n\nLayers:\n\n",
        board.name,
        board.keymap_name()
    );
    for (idx, layer) in compiled.iter().enumerate() {
        out.push_str(&format!("- {idx}: {}\n", layer.name));
    }

    if !magic.is_empty() {
        out.push_str("\nMagic key:\n\n");
        for family in magic {
            out.push_str(&format!(
                "- {} family ({}): {} mappings, default {}\n",
                family.table.base_layer,
                family.members.join(", "),
                family.cases.len(),
                family.fallback
            ));
        }
    }

    out
}
