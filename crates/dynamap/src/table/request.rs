use serde_json::Value;

use dynamap_core::cursor::SortDirection;
use dynamap_core::expression::{combine, Expr, Placeholders, RawExpression, SortKeyCondition, UpdateOp};
use dynamap_core::model::Model;
use dynamap_core::{Key, Result};

/// One page of decoded records.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque cursor for the next page; `None` once the read is exhausted.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetOptions {
    pub consistent_read: bool,
    pub projection: Option<Vec<String>>,
}

impl GetOptions {
    pub fn consistent(mut self) -> Self {
        self.consistent_read = true;
        self
    }

    pub fn projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Condition attached to a put, delete, update or condition check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    pub condition: Option<Expr>,
    pub raw_condition: Option<RawExpression>,
    /// Stored version the write expects; requires a version field. A delete
    /// expecting version 0 is unconditional.
    pub expected_version: Option<i64>,
}

impl WriteOptions {
    pub fn condition(mut self, condition: Expr) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn raw_condition(mut self, raw: RawExpression) -> Self {
        self.raw_condition = Some(raw);
        self
    }

    pub fn expected_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub(crate) fn render(&self, model: &Model, placeholders: &mut Placeholders) -> Result<Option<String>> {
        render_filter(
            model,
            self.condition.as_ref(),
            self.raw_condition.as_ref(),
            placeholders,
        )
    }
}

/// A query against the table or one of its indexes.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub partition: Value,
    pub sort: Option<SortKeyCondition>,
    pub index: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub direction: SortDirection,
    pub consistent_read: bool,
    pub projection: Option<Vec<String>>,
    pub filter: Option<Expr>,
    pub raw_filter: Option<RawExpression>,
}

impl QueryRequest {
    pub fn new(partition: impl Into<Value>) -> Self {
        Self {
            partition: partition.into(),
            sort: None,
            index: None,
            limit: None,
            cursor: None,
            direction: SortDirection::Asc,
            consistent_read: false,
            projection: None,
            filter: None,
            raw_filter: None,
        }
    }

    pub fn sort(mut self, condition: SortKeyCondition) -> Self {
        self.sort = Some(condition);
        self
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(name.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn descending(mut self) -> Self {
        self.direction = SortDirection::Desc;
        self
    }

    pub fn consistent(mut self) -> Self {
        self.consistent_read = true;
        self
    }

    pub fn projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn raw_filter(mut self, raw: RawExpression) -> Self {
        self.raw_filter = Some(raw);
        self
    }
}

/// A scan of the table or one of its indexes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanRequest {
    pub index: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub consistent_read: bool,
    pub projection: Option<Vec<String>>,
    pub filter: Option<Expr>,
    pub raw_filter: Option<RawExpression>,
    /// `(segment, total_segments)` of a parallel scan.
    pub segment: Option<(u32, u32)>,
}

impl ScanRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(name.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn consistent(mut self) -> Self {
        self.consistent_read = true;
        self
    }

    pub fn projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn raw_filter(mut self, raw: RawExpression) -> Self {
        self.raw_filter = Some(raw);
        self
    }

    pub fn segment(mut self, segment: u32, total_segments: u32) -> Self {
        self.segment = Some((segment, total_segments));
        self
    }
}

/// One action of a transactional write.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactAction<T> {
    Put { record: T, options: WriteOptions },
    Delete { key: Key, options: WriteOptions },
    Update { key: Key, ops: Vec<UpdateOp>, options: WriteOptions },
    /// Requires a condition; nothing is written.
    ConditionCheck { key: Key, options: WriteOptions },
}

impl<T> TransactAction<T> {
    pub fn put(record: T) -> Self {
        TransactAction::Put {
            record,
            options: WriteOptions::default(),
        }
    }

    pub fn delete(key: Key) -> Self {
        TransactAction::Delete {
            key,
            options: WriteOptions::default(),
        }
    }

    pub fn update(key: Key, ops: Vec<UpdateOp>) -> Self {
        TransactAction::Update {
            key,
            ops,
            options: WriteOptions::default(),
        }
    }

    pub fn condition_check(key: Key, condition: Expr) -> Self {
        TransactAction::ConditionCheck {
            key,
            options: WriteOptions::default().condition(condition),
        }
    }

    /// Replaces the action's condition options.
    pub fn with_options(mut self, new: WriteOptions) -> Self {
        match &mut self {
            TransactAction::Put { options, .. }
            | TransactAction::Delete { options, .. }
            | TransactAction::Update { options, .. }
            | TransactAction::ConditionCheck { options, .. } => *options = new,
        }
        self
    }
}

/// Renders a structured expression and a raw one into one shared namespace.
pub(crate) fn render_filter(
    model: &Model,
    structured: Option<&Expr>,
    raw: Option<&RawExpression>,
    placeholders: &mut Placeholders,
) -> Result<Option<String>> {
    let rendered = match structured {
        Some(expr) => expr.render(model, placeholders)?,
        None => None,
    };
    if let Some(raw) = raw {
        placeholders.merge_raw(raw)?;
    }
    Ok(combine(rendered, raw))
}
