use serde_json::Value;

use super::Placeholders;
use crate::error::{AccessError, Result};
use crate::marshal::{encode_value, to_wire};
use crate::model::{AttributeDefinition, Model};

/// Upper bound on `IN` operands accepted by the remote store.
pub const MAX_IN_OPERANDS: usize = 100;

/// Comparison applied by one condition leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionOp {
    Eq(Value),
    Ne(Value),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Between(Value, Value),
    In(Vec<Value>),
    BeginsWith(Value),
    Contains(Value),
    Exists,
    NotExists,
}

impl ConditionOp {
    /// Builds an operator from its token, checking operand arity.
    pub fn parse(op: &str, operands: Vec<Value>) -> Result<Self> {
        let lowered = op.to_ascii_lowercase();
        let unary: fn(Value) -> ConditionOp = match lowered.as_str() {
            "=" | "==" => ConditionOp::Eq,
            "!=" | "<>" => ConditionOp::Ne,
            "<" => ConditionOp::Lt,
            "<=" => ConditionOp::Lte,
            ">" => ConditionOp::Gt,
            ">=" => ConditionOp::Gte,
            "begins_with" => ConditionOp::BeginsWith,
            "contains" => ConditionOp::Contains,
            "between" => {
                let [low, high]: [Value; 2] =
                    operands.try_into().map_err(|rest: Vec<Value>| arity(op, "two", rest.len()))?;
                return Ok(ConditionOp::Between(low, high));
            }
            "in" => {
                check_in_arity(operands.len())?;
                return Ok(ConditionOp::In(operands));
            }
            "exists" | "attribute_exists" | "not_exists" | "attribute_not_exists" => {
                if !operands.is_empty() {
                    return Err(arity(op, "zero", operands.len()));
                }
                return Ok(if lowered.contains("not") {
                    ConditionOp::NotExists
                } else {
                    ConditionOp::Exists
                });
            }
            _ => {
                return Err(AccessError::validation(format!(
                    "unsupported condition operator: {op}"
                )))
            }
        };

        let [value]: [Value; 1] =
            operands.try_into().map_err(|rest: Vec<Value>| arity(op, "one", rest.len()))?;
        Ok(unary(value))
    }
}

fn arity(op: &str, expected: &str, got: usize) -> AccessError {
    AccessError::validation(format!(
        "condition operator {op} requires exactly {expected} operand(s) (got {got})"
    ))
}

fn check_in_arity(count: usize) -> Result<()> {
    if count == 0 || count > MAX_IN_OPERANDS {
        return Err(AccessError::validation(format!(
            "IN requires between 1 and {MAX_IN_OPERANDS} values (got {count})"
        )));
    }
    Ok(())
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: ConditionOp,
}

/// Boolean tree of field conditions used by filters and write conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Leaf(Condition),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn condition(field: impl Into<String>, op: ConditionOp) -> Self {
        Expr::Leaf(Condition {
            field: field.into(),
            op,
        })
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(field, ConditionOp::Eq(value.into()))
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::condition(field, ConditionOp::Exists)
    }

    pub fn not_exists(field: impl Into<String>) -> Self {
        Self::condition(field, ConditionOp::NotExists)
    }

    pub fn and(children: impl IntoIterator<Item = Expr>) -> Self {
        Expr::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Or(children.into_iter().collect())
    }

    /// Renders the tree, returning `None` when nothing renders.
    pub fn render(&self, model: &Model, placeholders: &mut Placeholders) -> Result<Option<String>> {
        self.render_nested(model, placeholders, false)
    }

    fn render_nested(
        &self,
        model: &Model,
        placeholders: &mut Placeholders,
        nested: bool,
    ) -> Result<Option<String>> {
        let (children, joiner) = match self {
            Expr::Leaf(condition) => return render_leaf(condition, model, placeholders).map(Some),
            Expr::And(children) => (children, " AND "),
            Expr::Or(children) => (children, " OR "),
        };

        let mut rendered = Vec::with_capacity(children.len());
        for child in children {
            if let Some(part) = child.render_nested(model, placeholders, true)? {
                rendered.push(part);
            }
        }

        Ok(match rendered.len() {
            0 => None,
            1 => rendered.pop(),
            _ if nested => Some(format!("({})", rendered.join(joiner))),
            _ => Some(rendered.join(joiner)),
        })
    }
}

fn render_leaf(
    condition: &Condition,
    model: &Model,
    placeholders: &mut Placeholders,
) -> Result<String> {
    let def = model.require_attribute(&condition.field)?;
    if def.encrypted {
        return Err(AccessError::validation(format!(
            "encrypted field cannot be used in conditions: {}",
            condition.field
        )));
    }
    let name = placeholders.name(&def.attribute_name);

    let compare = |symbol: &str, value: &Value, placeholders: &mut Placeholders| {
        bind(def, value, placeholders).map(|v| format!("{name} {symbol} {v}"))
    };

    match &condition.op {
        ConditionOp::Eq(v) => compare("=", v, placeholders),
        ConditionOp::Ne(v) => compare("<>", v, placeholders),
        ConditionOp::Lt(v) => compare("<", v, placeholders),
        ConditionOp::Lte(v) => compare("<=", v, placeholders),
        ConditionOp::Gt(v) => compare(">", v, placeholders),
        ConditionOp::Gte(v) => compare(">=", v, placeholders),
        ConditionOp::Between(low, high) => {
            let low = bind(def, low, placeholders)?;
            let high = bind(def, high, placeholders)?;
            Ok(format!("{name} BETWEEN {low} AND {high}"))
        }
        ConditionOp::In(values) => {
            check_in_arity(values.len())?;
            let refs = values
                .iter()
                .map(|v| bind(def, v, placeholders))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("{name} IN ({})", refs.join(", ")))
        }
        ConditionOp::BeginsWith(v) => {
            let v = placeholders.value(to_wire(v));
            Ok(format!("begins_with({name}, {v})"))
        }
        ConditionOp::Contains(v) => {
            let v = placeholders.value(to_wire(v));
            Ok(format!("contains({name}, {v})"))
        }
        ConditionOp::Exists => Ok(format!("attribute_exists({name})")),
        ConditionOp::NotExists => Ok(format!("attribute_not_exists({name})")),
    }
}

fn bind(def: &AttributeDefinition, value: &Value, placeholders: &mut Placeholders) -> Result<String> {
    Ok(placeholders.value(encode_value(def, value)?))
}
