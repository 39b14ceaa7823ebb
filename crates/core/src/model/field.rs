use std::collections::BTreeSet;
use std::fmt;

use crate::error::ModelDefinitionError;

/// Role a field plays in the record's identity or lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Partition key.
    Pk,
    /// Sort key.
    Sk,
    /// Filled with the write time when empty on put.
    CreatedAt,
    /// Filled when empty on put and set to the write time on every update.
    UpdatedAt,
    /// Optimistic-locking counter: seeded with 0 on put, bumped by every update.
    Version,
}

impl Role {
    /// Parses the textual role names used in record descriptions.
    pub fn parse(s: &str) -> Result<Self, ModelDefinitionError> {
        match s {
            "pk" => Ok(Role::Pk),
            "sk" => Ok(Role::Sk),
            "created_at" => Ok(Role::CreatedAt),
            "updated_at" => Ok(Role::UpdatedAt),
            "version" => Ok(Role::Version),
            other => Err(ModelDefinitionError::new(format!("unknown role: {other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Pk => "pk",
            Role::Sk => "sk",
            Role::CreatedAt => "created_at",
            Role::UpdatedAt => "updated_at",
            Role::Version => "version",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied description of one record field.
///
/// ```
/// use dynamap_core::model::{FieldDescriptor, Role};
///
/// let pk = FieldDescriptor::new("pk").attribute("PK").role(Role::Pk);
/// let tags = FieldDescriptor::new("tags").set().omitempty().with_default();
/// assert_eq!(pk.attribute_name.as_deref(), Some("PK"));
/// assert!(tags.set && tags.omitempty);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    /// Wire attribute name, when it differs from `name`.
    pub attribute_name: Option<String>,
    pub roles: Vec<Role>,
    pub omitempty: bool,
    pub set: bool,
    pub json: bool,
    pub binary: bool,
    pub encrypted: bool,
    pub ignored: bool,
    /// The record can be built without this field (serde default or `Option`).
    pub has_default: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attribute(mut self, attribute_name: impl Into<String>) -> Self {
        self.attribute_name = Some(attribute_name.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    pub fn omitempty(mut self) -> Self {
        self.omitempty = true;
        self
    }

    pub fn set(mut self) -> Self {
        self.set = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

/// Structural description of a record type, consumed once at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDescription {
    pub model_type: String,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescription {
    pub fn new(model_type: impl Into<String>) -> Self {
        Self {
            model_type: model_type.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

/// Resolved encoding contract of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub field_name: String,
    pub attribute_name: String,
    pub roles: BTreeSet<Role>,
    pub omitempty: bool,
    pub set: bool,
    pub json: bool,
    pub binary: bool,
    pub encrypted: bool,
    pub has_default: bool,
}

impl AttributeDefinition {
    pub(crate) fn from_descriptor(descriptor: &FieldDescriptor) -> Self {
        Self {
            field_name: descriptor.name.clone(),
            attribute_name: descriptor
                .attribute_name
                .clone()
                .unwrap_or_else(|| descriptor.name.clone()),
            roles: descriptor.roles.iter().copied().collect(),
            omitempty: descriptor.omitempty,
            set: descriptor.set,
            json: descriptor.json,
            binary: descriptor.binary,
            encrypted: descriptor.encrypted,
            has_default: descriptor.has_default,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether this field is the table partition or sort key.
    pub fn is_key(&self) -> bool {
        self.has_role(Role::Pk) || self.has_role(Role::Sk)
    }
}
