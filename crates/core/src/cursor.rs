//! Cursor Codec.
//!
//! A cursor is canonical JSON (sorted keys) of
//! `{"v":1,"lastKey":{...},"index":...,"sort":"ASC"|"DESC"}`, encoded as
//! URL-safe base64 without padding. It is opaque to callers but not
//! authenticated; decoding treats it as untrusted input.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde_json::{json, Map, Value};

use crate::error::{AccessError, Result};
use crate::value::{AttributeValue, Item};

pub const CURSOR_VERSION: u64 = 1;

/// Scan direction a cursor was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn is_forward(&self) -> bool {
        *self == SortDirection::Asc
    }
}

/// Decoded continuation state.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub last_key: Item,
    pub index: Option<String>,
    pub direction: SortDirection,
}

impl Cursor {
    pub fn new(last_key: Item, index: Option<String>, direction: SortDirection) -> Self {
        Self {
            last_key,
            index,
            direction,
        }
    }

    /// Fails unless the cursor was produced by a request of the same shape.
    pub fn ensure_matches(&self, index: Option<&str>, direction: SortDirection) -> Result<()> {
        if self.index.as_deref() != index {
            return Err(AccessError::validation(format!(
                "cursor index mismatch: cursor={} request={}",
                self.index.as_deref().unwrap_or("<table>"),
                index.unwrap_or("<table>")
            )));
        }
        if self.direction != direction {
            return Err(AccessError::validation(format!(
                "cursor sort mismatch: cursor={} request={}",
                self.direction.as_str(),
                direction.as_str()
            )));
        }
        Ok(())
    }
}

/// Encodes a cursor; an empty last key means there is nothing to continue.
pub fn encode_cursor(cursor: &Cursor) -> Option<String> {
    if cursor.last_key.is_empty() {
        return None;
    }
    let payload = json!({
        "v": CURSOR_VERSION,
        "lastKey": item_to_json(&cursor.last_key),
        "index": cursor.index.as_deref(),
        "sort": cursor.direction.as_str(),
    });
    Some(URL_SAFE_NO_PAD.encode(payload.to_string()))
}

pub fn decode_cursor(text: &str) -> Result<Cursor> {
    let bytes = URL_SAFE_NO_PAD
        .decode(text.trim().trim_end_matches('='))
        .map_err(|e| invalid(format!("bad encoding: {e}")))?;
    let raw = String::from_utf8(bytes).map_err(|_| invalid("not utf-8"))?;
    let payload: Value = serde_json::from_str(&raw).map_err(|e| invalid(format!("bad json: {e}")))?;
    let Value::Object(fields) = payload else {
        return Err(invalid("not an object"));
    };

    match fields.get("v") {
        None => {}
        Some(v) => match v.as_u64() {
            Some(CURSOR_VERSION) => {}
            Some(other) => {
                return Err(invalid(format!("unsupported cursor version: {other}")));
            }
            None => return Err(invalid("version must be an integer")),
        },
    }

    let last_key = match fields.get("lastKey") {
        Some(Value::Object(map)) => item_from_json(map)?,
        _ => return Err(invalid("lastKey must be an object")),
    };
    let index = match fields.get("index") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(_) => return Err(invalid("index must be a string")),
    };
    let direction = match fields.get("sort").and_then(Value::as_str) {
        None | Some("ASC") => SortDirection::Asc,
        Some("DESC") => SortDirection::Desc,
        Some(other) => return Err(invalid(format!("unknown sort: {other}"))),
    };

    Ok(Cursor {
        last_key,
        index,
        direction,
    })
}

fn invalid(detail: impl std::fmt::Display) -> AccessError {
    AccessError::validation(format!("invalid cursor: {detail}"))
}

fn bytes_json(bytes: &[u8]) -> Value {
    json!({"__type": "bytes", "b64": STANDARD.encode(bytes)})
}

fn bytes_from_json(value: &Value) -> Result<Vec<u8>> {
    // Untagged base64 strings come from cursors written before the tagged form.
    let b64 = match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) if map.get("__type").and_then(Value::as_str) == Some("bytes") => {
            map.get("b64").and_then(Value::as_str)
        }
        _ => None,
    }
    .ok_or_else(|| invalid("expected tagged bytes"))?;
    STANDARD
        .decode(b64)
        .map_err(|e| invalid(format!("bad bytes: {e}")))
}

fn item_to_json(item: &Item) -> Value {
    Value::Object(
        item.iter()
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect(),
    )
}

fn item_from_json(map: &Map<String, Value>) -> Result<Item> {
    map.iter()
        .map(|(k, v)| value_from_json(v).map(|av| (k.clone(), av)))
        .collect()
}

fn value_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => json!({"S": s}),
        AttributeValue::N(n) => json!({"N": n}),
        AttributeValue::B(b) => json!({"B": bytes_json(b)}),
        AttributeValue::Bool(b) => json!({"BOOL": b}),
        AttributeValue::Null => json!({"NULL": true}),
        AttributeValue::L(items) => {
            json!({"L": items.iter().map(value_to_json).collect::<Vec<_>>()})
        }
        AttributeValue::M(map) => json!({"M": item_to_json(map)}),
        AttributeValue::Ss(items) => json!({"SS": items}),
        AttributeValue::Ns(items) => json!({"NS": items}),
        AttributeValue::Bs(items) => {
            json!({"BS": items.iter().map(|b| bytes_json(b)).collect::<Vec<_>>()})
        }
    }
}

fn value_from_json(value: &Value) -> Result<AttributeValue> {
    let map = value
        .as_object()
        .filter(|map| map.len() == 1)
        .ok_or_else(|| invalid("attribute must be a single-entry object"))?;
    let Some((tag, inner)) = map.iter().next() else {
        return Err(invalid("attribute must be a single-entry object"));
    };

    let string = |v: &Value| {
        v.as_str()
            .map(str::to_string)
            .ok_or_else(|| invalid(format!("{tag} must be a string")))
    };
    let array = |v: &Value| {
        v.as_array()
            .cloned()
            .ok_or_else(|| invalid(format!("{tag} must be an array")))
    };

    Ok(match tag.as_str() {
        "S" => AttributeValue::S(string(inner)?),
        "N" => AttributeValue::N(string(inner)?),
        "B" => AttributeValue::B(bytes_from_json(inner)?),
        "BOOL" => AttributeValue::Bool(
            inner
                .as_bool()
                .ok_or_else(|| invalid("BOOL must be a boolean"))?,
        ),
        "NULL" => AttributeValue::Null,
        "L" => AttributeValue::L(
            array(inner)?
                .iter()
                .map(value_from_json)
                .collect::<Result<_>>()?,
        ),
        "M" => match inner {
            Value::Object(map) => AttributeValue::M(item_from_json(map)?),
            _ => return Err(invalid("M must be an object")),
        },
        "SS" => AttributeValue::Ss(array(inner)?.iter().map(string).collect::<Result<_>>()?),
        "NS" => AttributeValue::Ns(array(inner)?.iter().map(string).collect::<Result<_>>()?),
        "BS" => AttributeValue::Bs(
            array(inner)?
                .iter()
                .map(bytes_from_json)
                .collect::<Result<_>>()?,
        ),
        other => return Err(invalid(format!("unknown attribute type: {other}"))),
    })
}
