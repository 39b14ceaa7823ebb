use std::fmt;

/// Secondary index flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Global secondary index. Eventually consistent only.
    Gsi,
    /// Local secondary index. Shares the table partition key.
    Lsi,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Gsi => f.write_str("GSI"),
            IndexKind::Lsi => f.write_str("LSI"),
        }
    }
}

/// Attributes projected into an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    All,
    KeysOnly,
    /// Keys plus the listed logical fields.
    Include(Vec<String>),
}

/// Index declaration in terms of logical field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub kind: IndexKind,
    /// `None` for an LSI, which inherits the table partition key.
    pub partition: Option<String>,
    pub sort: Option<String>,
    pub projection: Projection,
}

impl IndexSpec {
    /// Declares a global secondary index partitioned on `partition`.
    pub fn gsi(name: impl Into<String>, partition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Gsi,
            partition: Some(partition.into()),
            sort: None,
            projection: Projection::All,
        }
    }

    /// Declares a local secondary index sorted on `sort`.
    pub fn lsi(name: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Lsi,
            partition: None,
            sort: Some(sort.into()),
            projection: Projection::All,
        }
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }
}

/// Index with names resolved to wire attributes at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: String,
    pub kind: IndexKind,
    pub partition_field: String,
    pub partition_attribute: String,
    pub sort_field: Option<String>,
    pub sort_attribute: Option<String>,
    pub projection: Projection,
}
