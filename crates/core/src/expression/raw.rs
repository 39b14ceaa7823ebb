use std::collections::HashMap;

use crate::value::{AttributeValue, Item};

/// Caller-written expression text with its own placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawExpression {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: Item,
}

impl RawExpression {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            ..Self::default()
        }
    }

    pub fn name(mut self, placeholder: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.names.insert(placeholder.into(), attribute.into());
        self
    }

    pub fn value(mut self, placeholder: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.values.insert(placeholder.into(), value.into());
        self
    }

    pub fn is_blank(&self) -> bool {
        self.expression.trim().is_empty()
    }
}

/// Joins a generated expression with a caller expression.
pub fn combine(structured: Option<String>, raw: Option<&RawExpression>) -> Option<String> {
    let raw = raw.filter(|r| !r.is_blank()).map(|r| r.expression.as_str());
    match (structured, raw) {
        (Some(s), Some(r)) => Some(format!("({s}) AND ({r})")),
        (Some(s), None) => Some(s),
        (None, Some(r)) => Some(r.to_string()),
        (None, None) => None,
    }
}
