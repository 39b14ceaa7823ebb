use std::collections::HashMap;

use super::RawExpression;
use crate::error::{AccessError, Result};
use crate::value::{AttributeValue, Item};

/// Allocates `#n{k}` / `:v{k}` placeholders for one request.
///
/// Name placeholders are shared per attribute name. Value placeholders are
/// handed out fresh for every operand.
#[derive(Debug, Default, Clone)]
pub struct Placeholders {
    names: HashMap<String, String>,
    by_attribute: HashMap<String, String>,
    values: Item,
    next_name: usize,
    next_value: usize,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder for a wire attribute name, reusing an existing one.
    pub fn name(&mut self, attribute: &str) -> String {
        if let Some(existing) = self.by_attribute.get(attribute) {
            return existing.clone();
        }
        let placeholder = loop {
            let candidate = format!("#n{}", self.next_name);
            self.next_name += 1;
            if !self.names.contains_key(&candidate) {
                break candidate;
            }
        };
        self.names
            .insert(placeholder.clone(), attribute.to_string());
        self.by_attribute
            .insert(attribute.to_string(), placeholder.clone());
        placeholder
    }

    /// Fresh placeholder bound to `value`.
    pub fn value(&mut self, value: AttributeValue) -> String {
        let placeholder = loop {
            let candidate = format!(":v{}", self.next_value);
            self.next_value += 1;
            if !self.values.contains_key(&candidate) {
                break candidate;
            }
        };
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    /// Adds caller-supplied placeholders, failing on any key already in use.
    pub fn merge_raw(&mut self, raw: &RawExpression) -> Result<()> {
        if let Some(key) = raw.names.keys().find(|k| self.names.contains_key(*k)) {
            return Err(AccessError::validation(format!(
                "expression attribute name collision: {key}"
            )));
        }
        if let Some(key) = raw.values.keys().find(|k| self.values.contains_key(*k)) {
            return Err(AccessError::validation(format!(
                "expression attribute value collision: {key}"
            )));
        }

        for (placeholder, attribute) in &raw.names {
            self.names.insert(placeholder.clone(), attribute.clone());
        }
        for (placeholder, value) in &raw.values {
            self.values.insert(placeholder.clone(), value.clone());
        }
        Ok(())
    }

    pub fn names(&self) -> &HashMap<String, String> {
        &self.names
    }

    pub fn values(&self) -> &Item {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.values.is_empty()
    }

    pub fn into_parts(self) -> (HashMap<String, String>, Item) {
        (self.names, self.values)
    }
}
