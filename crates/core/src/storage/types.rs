use std::collections::HashMap;

use crate::value::Item;

/// Placeholder maps attached to a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionAttributes {
    pub names: HashMap<String, String>,
    pub values: Item,
}

impl ExpressionAttributes {
    pub fn new(names: HashMap<String, String>, values: Item) -> Self {
        Self { names, values }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.values.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetItemInput {
    pub table_name: String,
    pub key: Item,
    pub consistent_read: bool,
    pub projection_expression: Option<String>,
    pub attributes: ExpressionAttributes,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetItemOutput {
    pub item: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutItemInput {
    pub table_name: String,
    pub item: Item,
    pub condition_expression: Option<String>,
    pub attributes: ExpressionAttributes,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteItemInput {
    pub table_name: String,
    pub key: Item,
    pub condition_expression: Option<String>,
    pub attributes: ExpressionAttributes,
}

/// Which attributes an update returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnValues {
    #[default]
    None,
    AllNew,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateItemInput {
    pub table_name: String,
    pub key: Item,
    pub update_expression: String,
    pub condition_expression: Option<String>,
    pub attributes: ExpressionAttributes,
    pub return_values: ReturnValues,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateItemOutput {
    pub attributes: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryInput {
    pub table_name: String,
    pub index_name: Option<String>,
    pub key_condition_expression: String,
    pub filter_expression: Option<String>,
    pub projection_expression: Option<String>,
    pub attributes: ExpressionAttributes,
    pub scan_index_forward: bool,
    pub consistent_read: bool,
    pub limit: Option<u32>,
    pub exclusive_start_key: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanInput {
    pub table_name: String,
    pub index_name: Option<String>,
    pub filter_expression: Option<String>,
    pub projection_expression: Option<String>,
    pub attributes: ExpressionAttributes,
    pub consistent_read: bool,
    pub limit: Option<u32>,
    pub exclusive_start_key: Option<Item>,
    pub segment: Option<u32>,
    pub total_segments: Option<u32>,
}

/// One page returned by a query or scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOutput {
    pub items: Vec<Item>,
    pub last_evaluated_key: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetItemInput {
    pub table_name: String,
    pub keys: Vec<Item>,
    pub consistent_read: bool,
    pub projection_expression: Option<String>,
    pub attributes: ExpressionAttributes,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetItemOutput {
    pub items: Vec<Item>,
    pub unprocessed_keys: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest {
    Put(Item),
    Delete(Item),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteItemInput {
    pub table_name: String,
    pub requests: Vec<WriteRequest>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteItemOutput {
    pub unprocessed: Vec<WriteRequest>,
}

/// One action of an atomic multi-item write.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactWriteItem {
    Put {
        table_name: String,
        item: Item,
        condition_expression: Option<String>,
        attributes: ExpressionAttributes,
    },
    Delete {
        table_name: String,
        key: Item,
        condition_expression: Option<String>,
        attributes: ExpressionAttributes,
    },
    Update {
        table_name: String,
        key: Item,
        update_expression: String,
        condition_expression: Option<String>,
        attributes: ExpressionAttributes,
    },
    ConditionCheck {
        table_name: String,
        key: Item,
        condition_expression: String,
        attributes: ExpressionAttributes,
    },
}

impl TransactWriteItem {
    pub fn table_name(&self) -> &str {
        match self {
            TransactWriteItem::Put { table_name, .. }
            | TransactWriteItem::Delete { table_name, .. }
            | TransactWriteItem::Update { table_name, .. }
            | TransactWriteItem::ConditionCheck { table_name, .. } => table_name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactWriteItemsInput {
    pub items: Vec<TransactWriteItem>,
}

/// Plaintext and wrapped form of a freshly generated data key.
#[derive(Clone, PartialEq, Eq)]
pub struct DataKey {
    pub plaintext: Vec<u8>,
    pub wrapped: Vec<u8>,
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKey")
            .field("plaintext", &"<redacted>")
            .field("wrapped", &self.wrapped.len())
            .finish()
    }
}
