//! Parsing of `boards.yaml`: the board inventory.

use serde::Deserialize;
use serde_yml::{Mapping, Value};

use crate::error::{CompileError, CompileResult};
use crate::models::{BoardDescriptor, Firmware, SizeClass};

#[derive(Debug, Deserialize)]
struct RawBoards {
    boards: Mapping,
}

#[derive(Debug, Deserialize)]
struct RawBoard {
    #[serde(default)]
    name: Option<String>,
    firmware: String,
    layout_size: String,
    #[serde(default)]
    qmk_keyboard: Option<String>,
    #[serde(default)]
    keymap_name: Option<String>,
    #[serde(default)]
    zmk_shield: Option<String>,
    #[serde(default)]
    zmk_board: Option<String>,
    #[serde(default)]
    extra_layers: Vec<String>,
}

/// Parses the board inventory, preserving declaration order.
pub fn parse(source: &str) -> CompileResult<Vec<BoardDescriptor>> {
    let raw: RawBoards = serde_yml::from_str(source)
        .map_err(|e| CompileError::config(format!("boards.yaml: {e}")))?;

    if raw.boards.is_empty() {
        return Err(CompileError::config("boards.yaml defines no boards")
            .with_suggestion("add at least one board under the top-level 'boards' key"));
    }

    let mut boards: Vec<BoardDescriptor> = Vec::with_capacity(raw.boards.len());
    for (key, body) in &raw.boards {
        let id = key
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| CompileError::config(format!("board id must be a string, got {key:?}")))?;
        if boards.iter().any(|board| board.id == id) {
            return Err(CompileError::config(format!("duplicate board '{id}'")));
        }
        boards.push(parse_board(&id, body)?);
    }
    Ok(boards)
}

fn parse_board(id: &str, body: &Value) -> CompileResult<BoardDescriptor> {
    let raw: RawBoard = serde_yml::from_value(body.clone())
        .map_err(|e| CompileError::config(format!("board '{id}': {e}")))?;

    let firmware = Firmware::parse(&raw.firmware)
        .map_err(|e| CompileError::config(format!("board '{id}': {}", e.message)))?;
    let layout_size = SizeClass::parse(&raw.layout_size)
        .map_err(|e| CompileError::config(format!("board '{id}': {}", e.message)))?;

    let board = BoardDescriptor {
        id: id.to_string(),
        name: raw.name.unwrap_or_else(|| id.to_string()),
        firmware,
        layout_size,
        qmk_keyboard: raw.qmk_keyboard,
        keymap_name: raw.keymap_name,
        zmk_shield: raw.zmk_shield,
        zmk_board: raw.zmk_board,
        extra_layers: raw.extra_layers,
    };
    board.validate()?;
    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = r#"
boards:
  skeletyl:
    name: "BastardKB Skeletyl"
    firmware: qmk
    layout_size: 3x5_3
    qmk_keyboard: bastardkb/skeletyl
    keymap_name: generated
  corne:
    firmware: zmk
    layout_size: 3x6_3
    zmk_shield: corne
  boaty:
    firmware: qmk
    layout_size: custom_63
    qmk_keyboard: jels/boaty
    extra_layers: [GAME]
"#;

    #[test]
    fn test_parse_inventory_in_order() {
        let boards = parse(INVENTORY).unwrap();
        let ids: Vec<&str> = boards.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["skeletyl", "corne", "boaty"]);

        assert_eq!(boards[0].name, "BastardKB Skeletyl");
        assert_eq!(boards[0].firmware, Firmware::Qmk);
        assert_eq!(boards[0].layout_size, SizeClass::Split3x5);

        // Name defaults to the id.
        assert_eq!(boards[1].name, "corne");
        assert_eq!(boards[1].zmk_output_name(), Some("corne"));

        assert_eq!(boards[2].layout_size, SizeClass::Custom(63));
        assert_eq!(boards[2].extra_layers, vec!["GAME".to_string()]);
    }

    #[test]
    fn test_missing_linkage_rejected() {
        let source = r#"
boards:
  corne:
    firmware: zmk
    layout_size: 3x6_3
"#;
        assert!(parse(source).is_err());
    }

    #[test]
    fn test_unknown_firmware_rejected() {
        let source = r#"
boards:
  odd:
    firmware: kmk
    layout_size: 3x5_3
"#;
        let err = parse(source).unwrap_err();
        assert!(err.message.contains("board 'odd'"));
    }

    #[test]
    fn test_empty_inventory_rejected() {
        let err = parse("boards: {}\n").unwrap_err();
        assert!(err.message.contains("no boards"));
    }
}
