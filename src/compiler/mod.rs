//! Layer compilation: assembles each layer's token sequence for a board and
//! translates it into per-target emission strings.

use crate::constants::CORE_KEY_COUNT;
use crate::error::{CompileError, CompileResult};
use crate::models::{core_hand, AbstractLayer, BoardDescriptor, Hand, KeyToken, LayoutCell};
use crate::translate::{KeyContext, KeyTranslator};

/// One layer compiled for one board: translated emissions in slot order.
///
/// Standard size classes compile in canonical order (core, then required
/// extensions) and are woven into physical rows by the generator;
/// `row_lengths` carries the physical row structure when the layer came from
/// a `full_layout` grid instead.
#[derive(Debug, Clone)]
pub struct CompiledLayer {
    /// Layer name.
    pub name: String,
    /// Translated emission strings.
    pub keys: Vec<String>,
    /// Physical row lengths for full-layout compiles, `None` for canonical.
    pub row_lengths: Option<Vec<usize>>,
}

/// Selects the layers a board compiles, in enumeration order.
///
/// Standard boards take every layer with a core; custom boards take every
/// layer with a `full_layout`. Extra layers named by the board are appended
/// (once) even when the main rule skipped them.
///
/// # Errors
///
/// Returns a reference error when `extra_layers` names an unknown layer.
pub fn board_layers<'a>(
    layers: &'a [AbstractLayer],
    board: &BoardDescriptor,
) -> CompileResult<Vec<&'a AbstractLayer>> {
    let mut selected: Vec<&AbstractLayer> = Vec::new();
    for layer in layers {
        let include = if board.layout_size.is_custom() {
            layer.has_full_layout()
        } else {
            layer.has_core()
        };
        if include {
            selected.push(layer);
        }
    }

    for name in &board.extra_layers {
        let layer = layers.iter().find(|l| l.name == *name).ok_or_else(|| {
            CompileError::reference(format!(
                "board '{}' lists unknown extra layer '{name}'",
                board.id
            ))
            .with_suggestion(format!(
                "known layers: {}",
                layers
                    .iter()
                    .map(|l| l.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;
        if !selected.iter().any(|l| l.name == layer.name) {
            selected.push(layer);
        }
    }

    Ok(selected)
}

/// Compiles every selected layer for a board.
///
/// # Errors
///
/// Fails on the first layer that cannot compile; per-board isolation is the
/// orchestrator's job.
pub fn compile_board(
    layers: &[AbstractLayer],
    board: &BoardDescriptor,
    translator: &mut dyn KeyTranslator,
) -> CompileResult<Vec<CompiledLayer>> {
    let selected = board_layers(layers, board)?;
    if selected.is_empty() {
        return Err(CompileError::layout_shape(format!(
            "no layers apply to board '{}' ({})",
            board.id, board.layout_size
        )));
    }
    selected
        .iter()
        .map(|layer| compile(layer, board, translator))
        .collect()
}

/// Compiles one layer for one board.
///
/// # Errors
///
/// Returns layout-shape errors for structural mismatches and passes through
/// translation errors.
pub fn compile(
    layer: &AbstractLayer,
    board: &BoardDescriptor,
    translator: &mut dyn KeyTranslator,
) -> CompileResult<CompiledLayer> {
    if board.layout_size.is_custom() || !layer.has_core() {
        compile_full_layout(layer, board, translator)
    } else {
        compile_standard(layer, board, translator)
    }
}

fn compile_standard(
    layer: &AbstractLayer,
    board: &BoardDescriptor,
    translator: &mut dyn KeyTranslator,
) -> CompileResult<CompiledLayer> {
    let Some(core) = &layer.core else {
        return Err(CompileError::layout_shape(format!(
            "layer '{}' has no core for board '{}'",
            layer.name, board.id
        ))
        .with_layer(&layer.name));
    };
    if core.len() != CORE_KEY_COUNT {
        return Err(CompileError::layout_shape(format!(
            "layer '{}' core has {} tokens, expected {CORE_KEY_COUNT}",
            layer.name,
            core.len()
        ))
        .with_layer(&layer.name));
    }

    let mut tokens: Vec<KeyToken> = core.clone();
    for spec in board.layout_size.required_extensions() {
        match layer.extensions.get(spec.id) {
            Some(list) => {
                if list.len() != spec.len {
                    return Err(CompileError::layout_shape(format!(
                        "layer '{}' extension '{}' has {} keys, expected {}",
                        layer.name,
                        spec.id,
                        list.len(),
                        spec.len
                    ))
                    .with_layer(&layer.name));
                }
                tokens.extend(list.iter().cloned());
            }
            // Undefined extensions pad with no-ops so every layer of a board
            // compiles to the same key count.
            None => tokens.extend(std::iter::repeat(KeyToken::NoKey).take(spec.len)),
        }
    }

    let mut keys = Vec::with_capacity(tokens.len());
    for (slot, token) in tokens.iter().enumerate() {
        let ctx = KeyContext {
            layer: &layer.name,
            slot,
            hand: board.layout_size.hand_of(slot),
        };
        keys.push(translator.translate(token, &ctx)?);
    }

    Ok(CompiledLayer {
        name: layer.name.clone(),
        keys,
        row_lengths: None,
    })
}

fn compile_full_layout(
    layer: &AbstractLayer,
    board: &BoardDescriptor,
    translator: &mut dyn KeyTranslator,
) -> CompileResult<CompiledLayer> {
    let Some(rows) = &layer.full_layout else {
        return Err(CompileError::layout_shape(format!(
            "layer '{}' has no full_layout for board '{}' ({})",
            layer.name, board.id, board.layout_size
        ))
        .with_layer(&layer.name));
    };

    let expected = board.layout_size.key_count();
    let total: usize = rows.iter().map(Vec::len).sum();
    if total != expected {
        return Err(CompileError::layout_shape(format!(
            "layer '{}' full_layout has {total} keys, board '{}' expects {expected}",
            layer.name, board.id
        ))
        .with_layer(&layer.name));
    }

    let mut keys = Vec::with_capacity(total);
    let mut row_lengths = Vec::with_capacity(rows.len());
    let mut slot = 0;
    for row in rows {
        row_lengths.push(row.len());
        for (col, cell) in row.iter().enumerate() {
            let (token, hand) = match cell {
                LayoutCell::CoreRef(position) => {
                    let core = layer.core.as_ref().ok_or_else(|| {
                        CompileError::layout_shape(format!(
                            "layer '{}' references core position {position} but defines no core",
                            layer.name
                        ))
                        .with_layer(&layer.name)
                        .with_position(slot)
                    })?;
                    let token = core.get(*position).ok_or_else(|| {
                        CompileError::layout_shape(format!(
                            "layer '{}' core reference L36_{position} is out of range",
                            layer.name
                        ))
                        .with_layer(&layer.name)
                        .with_position(slot)
                    })?;
                    (token.clone(), core_hand(*position))
                }
                LayoutCell::Token(token) => {
                    let hand = if col * 2 < row.len() {
                        Hand::Left
                    } else {
                        Hand::Right
                    };
                    (token.clone(), hand)
                }
            };
            let ctx = KeyContext {
                layer: &layer.name,
                slot,
                hand,
            };
            keys.push(translator.translate(&token, &ctx)?);
            slot += 1;
        }
    }

    Ok(CompiledLayer {
        name: layer.name.clone(),
        keys,
        row_lengths: Some(row_lengths),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileErrorKind;
    use crate::models::{BehaviorAlias, Firmware, SizeClass};
    use crate::registry::AliasRegistry;
    use crate::translate::{QmkTranslator, ZmkTranslator};
    use std::collections::HashMap;

    fn dictionary() -> AliasRegistry {
        let both = vec![Firmware::Qmk, Firmware::Zmk];
        AliasRegistry::new(
            vec![BehaviorAlias {
                id: "hrm".to_string(),
                params: vec!["mod".to_string(), "key".to_string()],
                qmk: "{mod}_T({key})".to_string(),
                zmk: "&hm {mod} {key}".to_string(),
                firmware: both,
            }],
            HashMap::new(),
        )
        .unwrap()
    }

    fn board(id: &str, firmware: Firmware, size: &str) -> BoardDescriptor {
        BoardDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            firmware,
            layout_size: SizeClass::parse(size).unwrap(),
            qmk_keyboard: Some("vendor/model".to_string()),
            keymap_name: None,
            zmk_shield: Some(id.to_string()),
            zmk_board: None,
            extra_layers: Vec::new(),
        }
    }

    fn tokens(names: &[&str]) -> Vec<KeyToken> {
        names.iter().map(|n| KeyToken::parse(n).unwrap()).collect()
    }

    fn core_layer(name: &str) -> AbstractLayer {
        let mut names: Vec<String> = (0..36).map(|i| format!("F{}", i % 12 + 1)).collect();
        names[0] = "Q".to_string();
        names[10] = "hrm:LGUI:A".to_string();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        AbstractLayer::new(name).with_core(tokens(&refs))
    }

    #[test]
    fn test_standard_compile_bare_core() {
        let registry = dictionary();
        let mut translator = QmkTranslator::new(&registry);
        let layer = core_layer("BASE");
        let board = board("skeletyl", Firmware::Qmk, "3x5_3");

        let compiled = compile(&layer, &board, &mut translator).unwrap();
        assert_eq!(compiled.keys.len(), 36);
        assert_eq!(compiled.keys[0], "KC_Q");
        assert_eq!(compiled.keys[10], "LGUI_T(KC_A)");
        assert!(compiled.row_lengths.is_none());
    }

    #[test]
    fn test_standard_compile_appends_extensions() {
        let registry = dictionary();
        let mut translator = QmkTranslator::new(&registry);
        let layer = core_layer("BASE")
            .with_extension("outer_pinky_left", tokens(&["TAB", "CAPS", "NONE"]));
        let board = board("corne", Firmware::Qmk, "3x6_3");

        let compiled = compile(&layer, &board, &mut translator).unwrap();
        assert_eq!(compiled.keys.len(), 42);
        assert_eq!(compiled.keys[36], "KC_TAB");
        assert_eq!(compiled.keys[38], "KC_NO");
        // Undefined right extension pads with no-ops.
        assert_eq!(compiled.keys[39], "KC_NO");
        assert_eq!(compiled.keys[41], "KC_NO");
    }

    #[test]
    fn test_extension_length_mismatch() {
        let registry = dictionary();
        let mut translator = QmkTranslator::new(&registry);
        let layer = core_layer("BASE").with_extension("outer_pinky_left", tokens(&["TAB"]));
        let board = board("corne", Firmware::Qmk, "3x6_3");

        let err = compile(&layer, &board, &mut translator).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::LayoutShape);
        assert!(err.message.contains("outer_pinky_left"));
    }

    #[test]
    fn test_extension_hand_reaches_translator() {
        let registry = dictionary();
        let magic = Vec::new();
        let mut translator = ZmkTranslator::new(&registry, &magic);
        let layer = core_layer("BASE")
            .with_extension("outer_pinky_left", tokens(&["hrm:LSFT:TAB", "NONE", "NONE"]))
            .with_extension("outer_pinky_right", tokens(&["hrm:RSFT:QUOT", "NONE", "NONE"]));
        let board = board("corne", Firmware::Zmk, "3x6_3");

        let compiled = compile(&layer, &board, &mut translator).unwrap();
        assert_eq!(compiled.keys[36], "&hml LSHFT TAB");
        assert_eq!(compiled.keys[39], "&hmr RSHFT SQT");
    }

    #[test]
    fn test_full_layout_compile() {
        let registry = dictionary();
        let mut translator = QmkTranslator::new(&registry);
        let layer = AbstractLayer::new("GAME").with_full_layout(vec![
            vec![
                LayoutCell::Token(KeyToken::parse("ESC").unwrap()),
                LayoutCell::Token(KeyToken::parse("Q").unwrap()),
            ],
            vec![
                LayoutCell::Token(KeyToken::parse("LSFT").unwrap()),
                LayoutCell::Token(KeyToken::parse("SPC").unwrap()),
            ],
        ]);
        let board = board("boaty", Firmware::Qmk, "custom_4");

        let compiled = compile(&layer, &board, &mut translator).unwrap();
        assert_eq!(compiled.keys, vec!["KC_ESC", "KC_Q", "KC_LSFT", "KC_SPC"]);
        assert_eq!(compiled.row_lengths, Some(vec![2, 2]));
    }

    #[test]
    fn test_full_layout_resolves_core_refs() {
        let registry = dictionary();
        let mut translator = QmkTranslator::new(&registry);
        let layer = core_layer("BASE").with_full_layout(vec![vec![
            LayoutCell::CoreRef(0),
            LayoutCell::CoreRef(10),
            LayoutCell::Token(KeyToken::parse("ESC").unwrap()),
        ]]);
        let board = board("boaty", Firmware::Qmk, "custom_3");

        let compiled = compile(&layer, &board, &mut translator).unwrap();
        assert_eq!(
            compiled.keys,
            vec!["KC_Q", "LGUI_T(KC_A)", "KC_ESC"]
        );
    }

    #[test]
    fn test_full_layout_core_ref_out_of_range() {
        let registry = dictionary();
        let mut translator = QmkTranslator::new(&registry);
        let layer = core_layer("BASE")
            .with_full_layout(vec![vec![LayoutCell::CoreRef(40)]]);
        let board = board("boaty", Firmware::Qmk, "custom_1");

        let err = compile(&layer, &board, &mut translator).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::LayoutShape);
        assert!(err.message.contains("L36_40"));
    }

    #[test]
    fn test_full_layout_core_ref_without_core() {
        let registry = dictionary();
        let mut translator = QmkTranslator::new(&registry);
        let layer = AbstractLayer::new("GAME")
            .with_full_layout(vec![vec![LayoutCell::CoreRef(0)]]);
        let board = board("boaty", Firmware::Qmk, "custom_1");

        let err = compile(&layer, &board, &mut translator).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::LayoutShape);
        assert!(err.message.contains("defines no core"));
    }

    #[test]
    fn test_full_layout_length_mismatch() {
        let registry = dictionary();
        let mut translator = QmkTranslator::new(&registry);
        let layer = AbstractLayer::new("GAME")
            .with_full_layout(vec![vec![LayoutCell::Token(KeyToken::parse("A").unwrap())]]);
        let board = board("boaty", Firmware::Qmk, "custom_2");

        let err = compile(&layer, &board, &mut translator).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::LayoutShape);
        assert!(err.message.contains("expects 2"));
    }

    #[test]
    fn test_board_layers_selection() {
        let core_only = core_layer("BASE");
        let full_only = AbstractLayer::new("GAME")
            .with_full_layout(vec![vec![LayoutCell::Token(KeyToken::parse("A").unwrap())]]);
        let layers = vec![core_only, full_only];

        let standard = board("skeletyl", Firmware::Qmk, "3x5_3");
        let names: Vec<&str> = board_layers(&layers, &standard)
            .unwrap()
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["BASE"]);

        let custom = board("boaty", Firmware::Qmk, "custom_1");
        let names: Vec<&str> = board_layers(&layers, &custom)
            .unwrap()
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["GAME"]);

        let mut with_extra = board("skeletyl", Firmware::Qmk, "3x5_3");
        with_extra.extra_layers = vec!["GAME".to_string()];
        let names: Vec<&str> = board_layers(&layers, &with_extra)
            .unwrap()
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["BASE", "GAME"]);
    }

    #[test]
    fn test_board_layers_unknown_extra() {
        let layers = vec![core_layer("BASE")];
        let mut board = board("skeletyl", Firmware::Qmk, "3x5_3");
        board.extra_layers = vec!["GAME".to_string()];

        let err = board_layers(&layers, &board).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Reference);
        assert!(err.message.contains("GAME"));
    }

    #[test]
    fn test_compile_board_requires_layers() {
        let registry = dictionary();
        let mut translator = QmkTranslator::new(&registry);
        let layers = vec![core_layer("BASE")];
        let board = board("boaty", Firmware::Qmk, "custom_4");

        let err = compile_board(&layers, &board, &mut translator).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::LayoutShape);
        assert!(err.message.contains("no layers apply"));
    }
}
