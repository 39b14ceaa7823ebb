//! Field encoding between serde's JSON value model and wire values.
//!
//! Records cross the boundary as `serde_json::Value` objects keyed by logical
//! field name. Each field is encoded according to its `AttributeDefinition`
//! flags; encryption happens one layer up, on the already-encoded value.

use base64::Engine as _;
use serde_json::{Map, Number, Value};

use crate::error::{AccessError, Result};
use crate::model::{AttributeDefinition, Model};
use crate::value::{AttributeValue, Item};

/// Primary key of one record, as logical values.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub partition: Value,
    pub sort: Option<Value>,
}

impl Key {
    pub fn new(partition: impl Into<Value>) -> Self {
        Self {
            partition: partition.into(),
            sort: None,
        }
    }

    pub fn with_sort(mut self, sort: impl Into<Value>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

/// Zero/empty values suppressed by `omitempty`.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Encodes a value without any field flags.
pub fn to_wire(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_wire).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_wire(v)))
                .collect(),
        ),
    }
}

/// Decodes a wire value without any field flags.
pub fn from_wire(value: &AttributeValue) -> Result<Value> {
    Ok(match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => Value::Number(parse_number(n)?),
        AttributeValue::B(b) => bytes_to_value(b),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null => Value::Null,
        AttributeValue::L(items) => {
            Value::Array(items.iter().map(from_wire).collect::<Result<_>>()?)
        }
        AttributeValue::M(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), from_wire(v)?);
            }
            Value::Object(out)
        }
        AttributeValue::Ss(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(items) => Value::Array(
            items
                .iter()
                .map(|n| parse_number(n).map(Value::Number))
                .collect::<Result<_>>()?,
        ),
        AttributeValue::Bs(items) => Value::Array(items.iter().map(|b| bytes_to_value(b)).collect()),
    })
}

/// Encodes a field value according to its flags, ignoring `omitempty`.
pub fn encode_value(def: &AttributeDefinition, value: &Value) -> Result<AttributeValue> {
    if value.is_null() {
        return Ok(AttributeValue::Null);
    }
    if def.json {
        let text = serde_json::to_string(value).map_err(|e| {
            AccessError::validation(format!("cannot encode json field {}: {e}", def.field_name))
        })?;
        return Ok(AttributeValue::S(text));
    }
    if def.set {
        return encode_set(def, value);
    }
    if def.binary {
        return value_to_bytes(value)
            .map(AttributeValue::B)
            .ok_or_else(|| {
                AccessError::validation(format!(
                    "binary field {} requires a byte array",
                    def.field_name
                ))
            });
    }
    Ok(to_wire(value))
}

/// Encodes a field value, returning `None` when `omitempty` suppresses it.
pub fn encode_field(def: &AttributeDefinition, value: &Value) -> Result<Option<AttributeValue>> {
    if def.omitempty && is_empty(value) {
        return Ok(None);
    }
    encode_value(def, value).map(Some)
}

/// Decodes a wire value back into the field's logical JSON value.
pub fn decode_field(def: &AttributeDefinition, value: &AttributeValue) -> Result<Value> {
    match value {
        AttributeValue::Null if def.set => Ok(Value::Array(Vec::new())),
        AttributeValue::Null => Ok(Value::Null),
        AttributeValue::S(text) if def.json => serde_json::from_str(text).map_err(|e| {
            AccessError::validation(format!("invalid json in field {}: {e}", def.field_name))
        }),
        _ if def.json => Err(AccessError::validation(format!(
            "json field {} must be stored as a string, got {}",
            def.field_name,
            value.type_tag()
        ))),
        _ => from_wire(value),
    }
}

fn encode_set(def: &AttributeDefinition, value: &Value) -> Result<AttributeValue> {
    let Value::Array(items) = value else {
        return Err(AccessError::validation(format!(
            "set field {} requires an array value",
            def.field_name
        )));
    };
    // Wire sets cannot be empty.
    if items.is_empty() {
        return Ok(AttributeValue::Null);
    }

    if def.binary {
        let bytes = items
            .iter()
            .map(value_to_bytes)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                AccessError::validation(format!(
                    "binary set field {} requires byte array elements",
                    def.field_name
                ))
            })?;
        return Ok(AttributeValue::Bs(bytes));
    }

    if let Some(strings) = items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
    {
        return Ok(AttributeValue::Ss(strings));
    }
    if let Some(numbers) = items
        .iter()
        .map(|v| match v {
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
    {
        return Ok(AttributeValue::Ns(numbers));
    }

    Err(AccessError::validation(format!(
        "set field {} requires homogeneous string or number elements",
        def.field_name
    )))
}

/// Parses wire number text, preferring integers.
pub fn parse_number(text: &str) -> Result<Number> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Number::from(i));
    }
    if let Ok(u) = text.parse::<u64>() {
        return Ok(Number::from(u));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| AccessError::validation(format!("invalid number: {text}")))
}

fn bytes_to_value(bytes: &[u8]) -> Value {
    Value::Array(bytes.iter().map(|b| Value::from(*b)).collect())
}

fn value_to_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
            .collect(),
        // serde_bytes-style base64 strings are accepted on input.
        Value::String(s) => base64::engine::general_purpose::STANDARD.decode(s).ok(),
        _ => None,
    }
}

/// Encodes a serialized record into a wire item, without encryption.
///
/// Encrypted fields are encoded to their plaintext wire value; the caller is
/// expected to seal them before sending.
pub fn encode_item(model: &Model, record: &Value) -> Result<Item> {
    let fields = record_fields(record)?;
    let mut item = Item::new();
    for def in model.attributes().values() {
        let value = fields.get(&def.field_name).unwrap_or(&Value::Null);
        if let Some(encoded) = encode_field(def, value)? {
            item.insert(def.attribute_name.clone(), encoded);
        }
    }

    if !has_key_value(&item, &model.pk().attribute_name) {
        return Err(AccessError::validation("missing pk"));
    }
    if let Some(sk) = model.sk() {
        if !has_key_value(&item, &sk.attribute_name) {
            return Err(AccessError::validation("missing sk"));
        }
    }
    Ok(item)
}

/// Decodes a plaintext wire item into the record's JSON object.
///
/// Attributes the model does not know are ignored; missing ones are left out
/// so serde defaults apply.
pub fn decode_item(model: &Model, item: &Item) -> Result<Value> {
    let mut out = Map::new();
    for def in model.attributes().values() {
        if let Some(value) = item.get(&def.attribute_name) {
            out.insert(def.field_name.clone(), decode_field(def, value)?);
        }
    }
    Ok(Value::Object(out))
}

/// Encodes a primary key against the table key schema.
pub fn encode_key(model: &Model, key: &Key) -> Result<Item> {
    if key.partition.is_null() {
        return Err(AccessError::validation("pk is required"));
    }
    let mut item = Item::new();
    let pk = model.pk();
    item.insert(pk.attribute_name.clone(), encode_value(pk, &key.partition)?);

    match (model.sk(), &key.sort) {
        (None, Some(_)) => return Err(AccessError::validation("model does not define sk")),
        (Some(_), None) => return Err(AccessError::validation("sk is required")),
        (Some(_), Some(sort)) if sort.is_null() => {
            return Err(AccessError::validation("sk is required"))
        }
        (Some(sk), Some(sort)) => {
            item.insert(sk.attribute_name.clone(), encode_value(sk, sort)?);
        }
        (None, None) => {}
    }
    Ok(item)
}

fn record_fields(record: &Value) -> Result<&Map<String, Value>> {
    record
        .as_object()
        .ok_or_else(|| AccessError::validation("record must serialize to an object"))
}

fn has_key_value(item: &Item, attribute: &str) -> bool {
    matches!(item.get(attribute), Some(value) if *value != AttributeValue::Null)
}
