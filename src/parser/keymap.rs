//! Parsing of `keymap.yaml`: layers, combos, and magic tables.

use serde::Deserialize;
use serde_yml::{Mapping, Value};

use crate::constants::DEFAULT_COMBO_TIMEOUT_MS;
use crate::error::{CompileError, CompileResult};
use crate::models::{
    flatten_core, AbstractLayer, ComboSpec, KeyToken, LayoutCell, MagicDefault, MagicMapping,
    MagicOutput, MagicTable, SizeClass,
};

#[derive(Debug, Deserialize)]
struct RawKeymap {
    layers: Mapping,
    #[serde(default)]
    combos: Vec<RawCombo>,
    #[serde(default)]
    magic: Mapping,
}

#[derive(Debug, Deserialize)]
struct RawCombo {
    name: String,
    keys: Vec<usize>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default, rename = "macro")]
    macro_text: Option<String>,
    #[serde(default)]
    layers: Vec<String>,
    #[serde(default)]
    timeout_ms: Option<u32>,
    #[serde(default)]
    require_prior_idle_ms: Option<u32>,
    #[serde(default)]
    slow_release: bool,
}

#[derive(Debug, Deserialize)]
struct RawMagicTable {
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    timeout_ms: Option<u32>,
    #[serde(default)]
    mappings: Mapping,
}

/// Parses the keymap document into layers (insertion order preserved),
/// combos, and magic tables.
pub fn parse(source: &str) -> CompileResult<(Vec<AbstractLayer>, Vec<ComboSpec>, Vec<MagicTable>)> {
    let raw: RawKeymap = serde_yml::from_str(source)
        .map_err(|e| CompileError::config(format!("keymap.yaml: {e}")))?;

    if raw.layers.is_empty() {
        return Err(CompileError::config("keymap.yaml defines no layers")
            .with_suggestion("add at least one layer under the top-level 'layers' key"));
    }

    let layers = parse_layers(&raw.layers)?;

    let mut combos = Vec::with_capacity(raw.combos.len());
    for combo in raw.combos {
        combos.push(parse_combo(combo)?);
    }

    let magic = parse_magic(&raw.magic)?;

    Ok((layers, combos, magic))
}

fn parse_layers(section: &Mapping) -> CompileResult<Vec<AbstractLayer>> {
    let mut layers: Vec<AbstractLayer> = Vec::with_capacity(section.len());
    for (key, body) in section {
        let name = string_key(key, "layer name")?;
        AbstractLayer::validate_name(&name)?;
        if layers.iter().any(|layer| layer.name == name) {
            return Err(CompileError::config(format!("duplicate layer '{name}'")));
        }
        layers.push(parse_layer(&name, body)?);
    }
    Ok(layers)
}

fn parse_layer(name: &str, body: &Value) -> CompileResult<AbstractLayer> {
    let map = body.as_mapping().ok_or_else(|| {
        CompileError::config(format!("layer '{name}' body must be a mapping")).with_layer(name)
    })?;

    let mut layer = AbstractLayer::new(name);
    for (key, value) in map {
        let field = string_key(key, "layer field")?;
        match field.as_str() {
            "core" => {
                let rows = parse_token_rows(name, value, "core")?;
                layer.core = Some(flatten_core(name, &rows)?);
            }
            "extensions" => parse_extensions(name, value, &mut layer)?,
            "full_layout" => layer.full_layout = Some(parse_full_layout(name, value)?),
            other => {
                return Err(CompileError::config(format!(
                    "layer '{name}' has unknown field '{other}'"
                ))
                .with_layer(name)
                .with_suggestion("layers accept core, extensions, and full_layout"));
            }
        }
    }

    if !layer.has_core() && !layer.has_full_layout() {
        return Err(CompileError::config(format!(
            "layer '{name}' defines neither core nor full_layout"
        ))
        .with_layer(name));
    }

    Ok(layer)
}

fn parse_extensions(name: &str, value: &Value, layer: &mut AbstractLayer) -> CompileResult<()> {
    let map = value.as_mapping().ok_or_else(|| {
        CompileError::config(format!(
            "layer '{name}' extensions must map extension ids to key lists"
        ))
        .with_layer(name)
    })?;

    for (key, tokens_value) in map {
        let id = string_key(key, "extension id")?;
        let spec = SizeClass::known_extension(&id).ok_or_else(|| {
            CompileError::config(format!("layer '{name}' defines unknown extension '{id}'"))
                .with_layer(name)
                .with_suggestion(
                    "known extensions: outer_pinky_left, outer_pinky_right, \
                     bottom_pinky_left, bottom_pinky_right",
                )
        })?;
        let tokens = parse_token_list(name, tokens_value, &id)?;
        if tokens.len() != spec.len {
            return Err(CompileError::config(format!(
                "layer '{name}' extension '{id}' has {} keys, expected {}",
                tokens.len(),
                spec.len
            ))
            .with_layer(name));
        }
        layer.extensions.insert(id, tokens);
    }
    Ok(())
}

fn parse_full_layout(name: &str, value: &Value) -> CompileResult<Vec<Vec<LayoutCell>>> {
    let rows_value = value.as_sequence().ok_or_else(|| {
        CompileError::config(format!("layer '{name}' full_layout must be a list of rows"))
            .with_layer(name)
    })?;

    let mut rows = Vec::with_capacity(rows_value.len());
    for row_value in rows_value {
        let cells = row_value.as_sequence().ok_or_else(|| {
            CompileError::config(format!(
                "layer '{name}' full_layout rows must be lists of keys"
            ))
            .with_layer(name)
        })?;
        let mut row = Vec::with_capacity(cells.len());
        for cell in cells {
            let text = scalar_cell(name, cell)?;
            row.push(parse_layout_cell(name, &text)?);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn parse_layout_cell(name: &str, text: &str) -> CompileResult<LayoutCell> {
    if let Some(index) = text.strip_prefix("L36_") {
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CompileError::config(format!(
                "layer '{name}' has malformed core reference '{text}'"
            ))
            .with_layer(name)
            .with_suggestion("core references look like L36_0 through L36_35"));
        }
        let position: usize = index.parse().map_err(|_| {
            CompileError::config(format!(
                "layer '{name}' core reference '{text}' is out of range"
            ))
            .with_layer(name)
        })?;
        return Ok(LayoutCell::CoreRef(position));
    }
    let token = KeyToken::parse(text).map_err(|e| e.with_layer(name))?;
    Ok(LayoutCell::Token(token))
}

fn parse_token_rows(name: &str, value: &Value, field: &str) -> CompileResult<Vec<Vec<KeyToken>>> {
    let rows_value = value.as_sequence().ok_or_else(|| {
        CompileError::config(format!("layer '{name}' {field} must be a list of rows"))
            .with_layer(name)
    })?;

    let mut rows = Vec::with_capacity(rows_value.len());
    for row_value in rows_value {
        rows.push(parse_token_sequence(name, row_value, field)?);
    }
    Ok(rows)
}

fn parse_token_list(name: &str, value: &Value, field: &str) -> CompileResult<Vec<KeyToken>> {
    parse_token_sequence(name, value, field)
}

fn parse_token_sequence(name: &str, value: &Value, field: &str) -> CompileResult<Vec<KeyToken>> {
    let cells = value.as_sequence().ok_or_else(|| {
        CompileError::config(format!("layer '{name}' {field} must be a list of keys"))
            .with_layer(name)
    })?;

    let mut tokens = Vec::with_capacity(cells.len());
    for cell in cells {
        let text = scalar_cell(name, cell)?;
        tokens.push(KeyToken::parse(&text).map_err(|e| e.with_layer(name))?);
    }
    Ok(tokens)
}

fn scalar_cell(name: &str, value: &Value) -> CompileResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(CompileError::config(format!(
            "layer '{name}' has a non-scalar key cell ({other:?})"
        ))
        .with_layer(name)
        .with_suggestion("quote the key name if YAML parses it as another type")),
    }
}

fn string_key(key: &Value, what: &str) -> CompileResult<String> {
    key.as_str().map(ToString::to_string).ok_or_else(|| {
        CompileError::config(format!("{what} must be a string, got {key:?}"))
    })
}

fn parse_combo(raw: RawCombo) -> CompileResult<ComboSpec> {
    let action = match &raw.action {
        Some(text) => Some(KeyToken::parse(text).map_err(|e| {
            CompileError::config(format!("combo '{}' action: {}", raw.name, e.message))
        })?),
        None => None,
    };

    let combo = ComboSpec {
        name: raw.name,
        keys: raw.keys,
        action,
        macro_text: raw.macro_text,
        layers: raw.layers,
        timeout_ms: raw.timeout_ms.unwrap_or(DEFAULT_COMBO_TIMEOUT_MS),
        require_prior_idle_ms: raw.require_prior_idle_ms,
        slow_release: raw.slow_release,
    };
    combo.validate()?;

    Ok(combo)
}

fn parse_magic(section: &Mapping) -> CompileResult<Vec<MagicTable>> {
    let mut tables = Vec::with_capacity(section.len());
    for (key, body) in section {
        let base_layer = string_key(key, "magic table layer")?;
        let raw: RawMagicTable = serde_yml::from_value(body.clone()).map_err(|e| {
            CompileError::config(format!("magic table '{base_layer}': {e}"))
                .with_layer(&base_layer)
        })?;

        let default = match raw.default.as_deref() {
            None | Some("REPEAT") => MagicDefault::Repeat,
            Some("NONE") => MagicDefault::None,
            Some(key) => MagicDefault::Key(key.to_string()),
        };

        let mut mappings = Vec::with_capacity(raw.mappings.len());
        for (trigger_value, output_value) in &raw.mappings {
            let trigger = scalar_cell(&base_layer, trigger_value)?;
            let output = parse_magic_output(&base_layer, &trigger, output_value)?;
            mappings.push(MagicMapping { trigger, output });
        }

        tables.push(MagicTable {
            base_layer,
            default,
            timeout_ms: raw.timeout_ms.unwrap_or(0),
            mappings,
        });
    }
    Ok(tables)
}

fn parse_magic_output(
    base_layer: &str,
    trigger: &str,
    value: &Value,
) -> CompileResult<MagicOutput> {
    match value {
        Value::String(s) => Ok(MagicOutput::Key(s.clone())),
        Value::Number(n) => Ok(MagicOutput::Key(n.to_string())),
        Value::Mapping(map) => {
            let text = map
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    CompileError::config(format!(
                        "magic table '{base_layer}' mapping '{trigger}' must be a key or {{text: ...}}"
                    ))
                    .with_layer(base_layer)
                })?;
            Ok(MagicOutput::Text(text.to_string()))
        }
        other => Err(CompileError::config(format!(
            "magic table '{base_layer}' mapping '{trigger}' has invalid output {other:?}"
        ))
        .with_layer(base_layer)),
    }
}
