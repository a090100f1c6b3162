//! The README block schema.
//!
//! [`ReadmeBlock`] is the typed content unit of a generated document: the
//! model is asked for a `{ "blocks": [...] }` object conforming to
//! [`readme_schema`], and [`parse_blocks`] re-validates the raw output at
//! the boundary before anything downstream touches it. A document is an
//! ordered, non-empty sequence of blocks.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};

/// One content block of a generated document.
///
/// Each variant carries only the fields relevant to its kind; the boundary
/// validator rejects blocks with missing required or unknown fields, so a
/// value of this type is schema-valid by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReadmeBlock {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    List {
        ordered: bool,
        items: Vec<String>,
    },
    Code {
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        code: String,
    },
    Image {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

/// The strict JSON schema handed to the model as its output contract.
///
/// `blocks` requires at least one element; each element must match exactly
/// one variant shape, with no additional properties.
pub fn readme_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "blocks": {
                "type": "array",
                "description": "Array of blocks that make up the README document.",
                "minItems": 1,
                "items": {
                    "anyOf": [
                        {
                            "type": "object",
                            "properties": {
                                "type": { "const": "heading" },
                                "level": { "type": "integer", "minimum": 1, "maximum": 6 },
                                "text": { "type": "string" }
                            },
                            "required": ["type", "level", "text"],
                            "additionalProperties": false
                        },
                        {
                            "type": "object",
                            "properties": {
                                "type": { "const": "paragraph" },
                                "text": { "type": "string" }
                            },
                            "required": ["type", "text"],
                            "additionalProperties": false
                        },
                        {
                            "type": "object",
                            "properties": {
                                "type": { "const": "list" },
                                "ordered": { "type": "boolean" },
                                "items": { "type": "array", "items": { "type": "string" } }
                            },
                            "required": ["type", "ordered", "items"],
                            "additionalProperties": false
                        },
                        {
                            "type": "object",
                            "properties": {
                                "type": { "const": "code" },
                                "language": { "type": "string" },
                                "code": { "type": "string" }
                            },
                            "required": ["type", "code"],
                            "additionalProperties": false
                        },
                        {
                            "type": "object",
                            "properties": {
                                "type": { "const": "image" },
                                "url": { "type": "string" },
                                "alt": { "type": "string" }
                            },
                            "required": ["type", "url"],
                            "additionalProperties": false
                        },
                        {
                            "type": "object",
                            "properties": {
                                "type": { "const": "table" },
                                "headers": { "type": "array", "items": { "type": "string" } },
                                "rows": {
                                    "type": "array",
                                    "items": { "type": "array", "items": { "type": "string" } }
                                }
                            },
                            "required": ["type", "headers", "rows"],
                            "additionalProperties": false
                        }
                    ]
                }
            }
        },
        "required": ["blocks"],
        "additionalProperties": false
    })
}

/// The structured-output format wrapper sent with the generation request.
pub fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "name": "readme",
        "schema": readme_schema(),
        "strict": true
    })
}

/// Parse and validate raw model output into a block sequence.
///
/// The text must be a JSON object with a non-empty `blocks` array whose
/// every element passes per-variant validation. Any failure is a
/// [`Error::SchemaViolation`] — terminal, no repair attempted.
pub fn parse_blocks(text: &str) -> Result<Vec<ReadmeBlock>> {
    let parsed: Value = serde_json::from_str(text)
        .map_err(|e| Error::SchemaViolation(format!("output is not valid JSON: {}", e)))?;

    let blocks = parsed
        .get("blocks")
        .ok_or_else(|| Error::SchemaViolation("no 'blocks' field in output".to_string()))?;

    let arr = blocks
        .as_array()
        .ok_or_else(|| Error::SchemaViolation("'blocks' is not an array".to_string()))?;

    if arr.is_empty() {
        return Err(Error::SchemaViolation(
            "'blocks' must contain at least one block".to_string(),
        ));
    }

    for (i, block) in arr.iter().enumerate() {
        validate_block(block).map_err(|e| Error::SchemaViolation(format!("block {}: {}", i, e)))?;
    }

    serde_json::from_value(blocks.clone())
        .map_err(|e| Error::SchemaViolation(format!("block deserialization failed: {}", e)))
}

/// Per-variant field rules: (required, optional) beyond the `type` tag.
fn variant_fields(kind: &str) -> Option<(&'static [&'static str], &'static [&'static str])> {
    match kind {
        "heading" => Some((&["level", "text"], &[])),
        "paragraph" => Some((&["text"], &[])),
        "list" => Some((&["ordered", "items"], &[])),
        "code" => Some((&["code"], &["language"])),
        "image" => Some((&["url"], &["alt"])),
        "table" => Some((&["headers", "rows"], &[])),
        _ => None,
    }
}

fn validate_block(block: &Value) -> std::result::Result<(), String> {
    let obj = block.as_object().ok_or("not an object")?;

    let kind = obj
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or("missing 'type' tag")?;

    let (required, optional) =
        variant_fields(kind).ok_or_else(|| format!("unknown block type '{}'", kind))?;

    for field in required {
        if !obj.contains_key(*field) {
            return Err(format!("'{}' block missing required field '{}'", kind, field));
        }
    }

    for key in obj.keys() {
        if key == "type" {
            continue;
        }
        if !required.contains(&key.as_str()) && !optional.contains(&key.as_str()) {
            return Err(format!("'{}' block has unexpected field '{}'", kind, key));
        }
    }

    // Field-level checks serde cannot express.
    match kind {
        "heading" => {
            let level = obj
                .get("level")
                .and_then(|l| l.as_u64())
                .ok_or("'level' must be an integer")?;
            if !(1..=6).contains(&level) {
                return Err(format!("'level' must be in 1..=6, got {}", level));
            }
        }
        "table" => {
            let headers = obj
                .get("headers")
                .and_then(|h| h.as_array())
                .ok_or("'headers' must be an array")?;
            let rows = obj
                .get("rows")
                .and_then(|r| r.as_array())
                .ok_or("'rows' must be an array")?;
            for (i, row) in rows.iter().enumerate() {
                let row = row.as_array().ok_or(format!("row {} is not an array", i))?;
                if row.len() != headers.len() {
                    return Err(format!(
                        "row {} has {} cells, expected {}",
                        i,
                        row.len(),
                        headers.len()
                    ));
                }
            }
        }
        _ => {}
    }

    Ok(())
}
