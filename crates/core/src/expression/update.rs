use std::collections::HashMap;

use serde_json::{Number, Value};

use super::Placeholders;
use crate::error::{AccessError, Result};
use crate::marshal::{encode_value, to_wire};
use crate::model::AttributeDefinition;
use crate::model::Model;
use crate::value::AttributeValue;

/// One mutation in an update request.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Assigns a value; a JSON `null` removes the attribute.
    Set { field: String, value: Value },
    SetIfNotExists { field: String, value: Value },
    /// Numeric add, or set union when the field is set-typed.
    Add { field: String, value: Value },
    Increment { field: String, by: Value },
    Decrement { field: String, by: Value },
    Remove { field: String },
    DeleteFromSet { field: String, value: Value },
    AppendToList { field: String, values: Value },
    PrependToList { field: String, values: Value },
    RemoveListAt { field: String, index: usize },
    SetListElement { field: String, index: usize, value: Value },
}

impl UpdateOp {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        UpdateOp::Set {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn remove(field: impl Into<String>) -> Self {
        UpdateOp::Remove {
            field: field.into(),
        }
    }

    pub fn increment(field: impl Into<String>, by: impl Into<Value>) -> Self {
        UpdateOp::Increment {
            field: field.into(),
            by: by.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            UpdateOp::Set { field, .. }
            | UpdateOp::SetIfNotExists { field, .. }
            | UpdateOp::Add { field, .. }
            | UpdateOp::Increment { field, .. }
            | UpdateOp::Decrement { field, .. }
            | UpdateOp::Remove { field }
            | UpdateOp::DeleteFromSet { field, .. }
            | UpdateOp::AppendToList { field, .. }
            | UpdateOp::PrependToList { field, .. }
            | UpdateOp::RemoveListAt { field, .. }
            | UpdateOp::SetListElement { field, .. } => field,
        }
    }

    /// The value an encrypted field would need sealed before rendering.
    pub fn sealable_value(&self) -> Option<&Value> {
        match self {
            UpdateOp::Set { value, .. } | UpdateOp::SetIfNotExists { value, .. }
                if !value.is_null() =>
            {
                Some(value)
            }
            _ => None,
        }
    }
}

#[derive(Default)]
struct Clauses {
    set: Vec<String>,
    remove: Vec<String>,
    add: Vec<String>,
    delete: Vec<String>,
}

impl Clauses {
    fn render(self) -> Option<String> {
        let mut parts = Vec::new();
        for (keyword, items) in [
            ("SET", self.set),
            ("REMOVE", self.remove),
            ("ADD", self.add),
            ("DELETE", self.delete),
        ] {
            if !items.is_empty() {
                parts.push(format!("{keyword} {}", items.join(", ")));
            }
        }
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

/// Renders an ordered list of update operations into one update expression.
///
/// `sealed` carries pre-encrypted wire values for encrypted fields, keyed by
/// the position of the operation in `ops`.
pub fn render_update(
    model: &Model,
    ops: &[UpdateOp],
    sealed: &HashMap<usize, AttributeValue>,
    placeholders: &mut Placeholders,
) -> Result<String> {
    let mut clauses = Clauses::default();

    for (position, op) in ops.iter().enumerate() {
        let def = model.require_attribute(op.field())?;
        if def.is_key() {
            return Err(AccessError::validation(format!(
                "cannot update key field: {}",
                def.field_name
            )));
        }
        if def.encrypted
            && !matches!(
                op,
                UpdateOp::Set { .. } | UpdateOp::SetIfNotExists { .. } | UpdateOp::Remove { .. }
            )
        {
            return Err(AccessError::validation(format!(
                "encrypted field supports only set and remove: {}",
                def.field_name
            )));
        }

        let name = placeholders.name(&def.attribute_name);
        match op {
            UpdateOp::Set { value, .. } if value.is_null() => clauses.remove.push(name),
            UpdateOp::Set { value, .. } => {
                let v = operand(def, value, position, sealed, placeholders)?;
                clauses.set.push(format!("{name} = {v}"));
            }
            UpdateOp::SetIfNotExists { value, .. } => {
                let v = operand(def, value, position, sealed, placeholders)?;
                clauses.set.push(format!("{name} = if_not_exists({name}, {v})"));
            }
            UpdateOp::Add { value, .. } => {
                let v = set_or_number(def, value, "add", placeholders)?;
                clauses.add.push(format!("{name} {v}"));
            }
            UpdateOp::Increment { by, .. } => {
                check_numeric_field(def, "increment")?;
                let n = number(def, by, "increment")?;
                let v = placeholders.value(AttributeValue::N(n.to_string()));
                clauses.add.push(format!("{name} {v}"));
            }
            UpdateOp::Decrement { by, .. } => {
                check_numeric_field(def, "decrement")?;
                let n = negate(&number(def, by, "decrement")?)?;
                let v = placeholders.value(AttributeValue::N(n.to_string()));
                clauses.add.push(format!("{name} {v}"));
            }
            UpdateOp::Remove { .. } => clauses.remove.push(name),
            UpdateOp::DeleteFromSet { value, .. } => {
                let v = set_or_number(def, value, "delete", placeholders)?;
                clauses.delete.push(format!("{name} {v}"));
            }
            UpdateOp::AppendToList { values, .. } => {
                let v = list_operand(def, values, placeholders)?;
                clauses.set.push(format!("{name} = list_append({name}, {v})"));
            }
            UpdateOp::PrependToList { values, .. } => {
                let v = list_operand(def, values, placeholders)?;
                clauses.set.push(format!("{name} = list_append({v}, {name})"));
            }
            UpdateOp::RemoveListAt { index, .. } => {
                check_list_field(def)?;
                clauses.remove.push(format!("{name}[{index}]"));
            }
            UpdateOp::SetListElement { index, value, .. } => {
                check_list_field(def)?;
                let v = placeholders.value(to_wire(value));
                clauses.set.push(format!("{name}[{index}] = {v}"));
            }
        }
    }

    clauses
        .render()
        .ok_or_else(|| AccessError::validation("no updates provided"))
}

/// Runs every check of [`render_update`] without needing sealed values.
///
/// Encrypted operands are stood in for, so callers can reject a request
/// before any data key is generated.
pub fn validate_update(model: &Model, ops: &[UpdateOp]) -> Result<()> {
    let sealed: HashMap<usize, AttributeValue> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| {
            op.sealable_value().is_some()
                && model.attribute(op.field()).is_some_and(|def| def.encrypted)
        })
        .map(|(position, _)| (position, AttributeValue::Null))
        .collect();
    render_update(model, ops, &sealed, &mut Placeholders::new()).map(|_| ())
}

fn operand(
    def: &AttributeDefinition,
    value: &Value,
    position: usize,
    sealed: &HashMap<usize, AttributeValue>,
    placeholders: &mut Placeholders,
) -> Result<String> {
    let wire = if def.encrypted {
        sealed.get(&position).cloned().ok_or_else(|| {
            AccessError::EncryptionNotConfigured(format!(
                "encrypted field requires encryption: {}",
                def.field_name
            ))
        })?
    } else {
        encode_value(def, value)?
    };
    Ok(placeholders.value(wire))
}

fn set_or_number(
    def: &AttributeDefinition,
    value: &Value,
    verb: &str,
    placeholders: &mut Placeholders,
) -> Result<String> {
    if !def.set {
        let n = number(def, value, verb)?;
        return Ok(placeholders.value(AttributeValue::N(n.to_string())));
    }
    match value {
        Value::Array(items) if !items.is_empty() => Ok(placeholders.value(encode_value(def, value)?)),
        _ => Err(AccessError::validation(format!(
            "{verb} on set field {} requires a non-empty array operand",
            def.field_name
        ))),
    }
}

fn number(def: &AttributeDefinition, value: &Value, verb: &str) -> Result<Number> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        _ => Err(AccessError::validation(format!(
            "{verb} on field {} requires a numeric operand",
            def.field_name
        ))),
    }
}

fn check_numeric_field(def: &AttributeDefinition, verb: &str) -> Result<()> {
    if def.set {
        return Err(AccessError::validation(format!(
            "{verb} on set field {} requires a numeric field",
            def.field_name
        )));
    }
    Ok(())
}

fn negate(n: &Number) -> Result<Number> {
    if let Some(i) = n.as_i64().and_then(i64::checked_neg) {
        return Ok(Number::from(i));
    }
    n.as_f64()
        .and_then(|f| Number::from_f64(-f))
        .ok_or_else(|| AccessError::validation(format!("cannot negate number: {n}")))
}

fn check_list_field(def: &AttributeDefinition) -> Result<()> {
    if def.set || def.json || def.binary {
        return Err(AccessError::validation(format!(
            "list operation not supported on set, json or binary field: {}",
            def.field_name
        )));
    }
    Ok(())
}

fn list_operand(
    def: &AttributeDefinition,
    values: &Value,
    placeholders: &mut Placeholders,
) -> Result<String> {
    check_list_field(def)?;
    if !values.is_array() {
        return Err(AccessError::validation(format!(
            "list operation on field {} requires an array operand",
            def.field_name
        )));
    }
    Ok(placeholders.value(to_wire(values)))
}
