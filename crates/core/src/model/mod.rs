//! Model Registry: turns record descriptions into validated, immutable schemas.

mod field;
mod index;
mod registry;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use field::{AttributeDefinition, FieldDescriptor, RecordDescription, Role};
pub use index::{IndexDefinition, IndexKind, IndexSpec, Projection};
pub use registry::ModelRegistry;

use crate::error::{AccessError, ModelDefinitionError};

/// A record type that can be stored through a `Table`.
///
/// Implementors describe their fields explicitly; serde does the value
/// conversion.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    fn describe() -> RecordDescription;

    /// Default table name for this record type.
    fn table_name() -> Option<String> {
        None
    }

    fn indexes() -> Vec<IndexSpec> {
        Vec::new()
    }

    fn model() -> Result<Model, ModelDefinitionError> {
        Model::from_description(Self::describe(), Self::table_name(), Self::indexes())
    }
}

/// Where a key schema comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Table,
    Index(IndexKind),
}

/// Partition/sort attributes used by a query or scan.
#[derive(Debug, Clone, Copy)]
pub struct KeySchema<'a> {
    pub partition: &'a AttributeDefinition,
    pub sort: Option<&'a AttributeDefinition>,
    pub source: KeySource,
}

impl KeySchema<'_> {
    pub fn is_gsi(&self) -> bool {
        self.source == KeySource::Index(IndexKind::Gsi)
    }
}

/// Immutable schema of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    model_type: String,
    table_name: Option<String>,
    pk: String,
    sk: Option<String>,
    attributes: BTreeMap<String, AttributeDefinition>,
    indexes: Vec<IndexDefinition>,
}

impl Model {
    /// Validates a description and its index declarations.
    pub fn from_description(
        description: RecordDescription,
        table_name: Option<String>,
        indexes: Vec<IndexSpec>,
    ) -> Result<Self, ModelDefinitionError> {
        let mut attributes = BTreeMap::new();
        let mut wire_names = HashSet::new();
        let mut seen_fields = HashSet::new();

        for descriptor in &description.fields {
            if !seen_fields.insert(descriptor.name.as_str()) {
                return Err(ModelDefinitionError::new(format!(
                    "duplicate field: {}",
                    descriptor.name
                )));
            }
            if descriptor.ignored {
                continue;
            }

            let def = AttributeDefinition::from_descriptor(descriptor);
            if def.attribute_name.is_empty() {
                return Err(ModelDefinitionError::new(format!(
                    "empty attribute name for field: {}",
                    def.field_name
                )));
            }
            if !wire_names.insert(def.attribute_name.clone()) {
                return Err(ModelDefinitionError::new(format!(
                    "duplicate attribute name: {}",
                    def.attribute_name
                )));
            }
            attributes.insert(def.field_name.clone(), def);
        }

        let pk_fields: Vec<&AttributeDefinition> = attributes
            .values()
            .filter(|def| def.has_role(Role::Pk))
            .collect();
        if pk_fields.len() != 1 {
            return Err(ModelDefinitionError::new(format!(
                "exactly one pk field is required (found {})",
                pk_fields.len()
            )));
        }
        let sk_fields: Vec<&AttributeDefinition> = attributes
            .values()
            .filter(|def| def.has_role(Role::Sk))
            .collect();
        if sk_fields.len() > 1 {
            return Err(ModelDefinitionError::new(format!(
                "at most one sk field is allowed (found {})",
                sk_fields.len()
            )));
        }

        for def in attributes.values().filter(|def| def.is_key()) {
            if def.has_role(Role::Pk) && def.has_role(Role::Sk) {
                return Err(ModelDefinitionError::new(format!(
                    "field cannot be both pk and sk: {}",
                    def.field_name
                )));
            }
            if def.encrypted {
                return Err(ModelDefinitionError::new(format!(
                    "encrypted field cannot be a key: {}",
                    def.field_name
                )));
            }
            if def.set {
                return Err(ModelDefinitionError::new(format!(
                    "key field cannot be set-typed: {}",
                    def.field_name
                )));
            }
        }

        let version_fields: Vec<&AttributeDefinition> = attributes
            .values()
            .filter(|def| def.has_role(Role::Version))
            .collect();
        if version_fields.len() > 1 {
            return Err(ModelDefinitionError::new(format!(
                "at most one version field is allowed (found {})",
                version_fields.len()
            )));
        }
        if let Some(def) = version_fields
            .iter()
            .find(|def| def.is_key() || def.encrypted || def.set || def.json || def.binary)
        {
            return Err(ModelDefinitionError::new(format!(
                "version field must be a plain number: {}",
                def.field_name
            )));
        }

        let pk = pk_fields[0].field_name.clone();
        let sk = sk_fields.first().map(|def| def.field_name.clone());

        let mut resolved = Vec::with_capacity(indexes.len());
        let mut index_names = HashSet::new();
        for spec in indexes {
            if spec.name.is_empty() {
                return Err(ModelDefinitionError::new("index name cannot be empty"));
            }
            if !index_names.insert(spec.name.clone()) {
                return Err(ModelDefinitionError::new(format!(
                    "duplicate index: {}",
                    spec.name
                )));
            }
            resolved.push(resolve_index(spec, &attributes, &pk)?);
        }

        Ok(Self {
            model_type: description.model_type,
            table_name,
            pk,
            sk,
            attributes,
            indexes: resolved,
        })
    }

    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn pk(&self) -> &AttributeDefinition {
        &self.attributes[&self.pk]
    }

    pub fn sk(&self) -> Option<&AttributeDefinition> {
        self.sk.as_ref().map(|name| &self.attributes[name])
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeDefinition> {
        &self.attributes
    }

    pub fn attribute(&self, field: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(field)
    }

    pub fn indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|idx| idx.name == name)
    }

    /// Looks up a field, failing validation for unknown names.
    pub fn require_attribute(&self, field: &str) -> crate::Result<&AttributeDefinition> {
        self.attributes
            .get(field)
            .ok_or_else(|| AccessError::validation(format!("unknown field: {field}")))
    }

    /// The optimistic-locking version field, if any.
    pub fn version(&self) -> Option<&AttributeDefinition> {
        self.attributes
            .values()
            .find(|def| def.has_role(Role::Version))
    }

    /// Fields stamped with the write time on every update.
    pub fn updated_at_fields(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes
            .values()
            .filter(|def| def.has_role(Role::UpdatedAt))
    }

    pub fn has_encrypted_fields(&self) -> bool {
        self.attributes.values().any(|def| def.encrypted)
    }

    /// Key attributes of the base table or of the named index.
    pub fn key_schema(&self, index_name: Option<&str>) -> crate::Result<KeySchema<'_>> {
        let Some(name) = index_name else {
            return Ok(KeySchema {
                partition: self.pk(),
                sort: self.sk(),
                source: KeySource::Table,
            });
        };

        let index = self
            .index(name)
            .ok_or_else(|| AccessError::validation(format!("unknown index: {name}")))?;
        let partition = self.require_attribute(&index.partition_field)?;
        let sort = match &index.sort_field {
            Some(field) => Some(self.require_attribute(field)?),
            None => None,
        };
        Ok(KeySchema {
            partition,
            sort,
            source: KeySource::Index(index.kind),
        })
    }

    /// Fields a projection must include so the record can still be decoded:
    /// the key fields plus every field without a default.
    pub fn required_fields(&self) -> BTreeSet<&str> {
        let mut required: BTreeSet<&str> = self
            .attributes
            .values()
            .filter(|def| !def.has_default)
            .map(|def| def.field_name.as_str())
            .collect();
        required.insert(self.pk.as_str());
        if let Some(sk) = &self.sk {
            required.insert(sk.as_str());
        }
        required
    }
}

fn resolve_index(
    spec: IndexSpec,
    attributes: &BTreeMap<String, AttributeDefinition>,
    table_pk: &str,
) -> Result<IndexDefinition, ModelDefinitionError> {
    let partition_field = match (spec.kind, spec.partition) {
        (IndexKind::Gsi, Some(field)) => field,
        (IndexKind::Gsi, None) => {
            return Err(ModelDefinitionError::new(format!(
                "gsi requires a partition field: {}",
                spec.name
            )))
        }
        (IndexKind::Lsi, None) => table_pk.to_string(),
        (IndexKind::Lsi, Some(field)) if field == table_pk => field,
        (IndexKind::Lsi, Some(_)) => {
            return Err(ModelDefinitionError::new(format!(
                "lsi partition must be the table partition key: {}",
                spec.name
            )))
        }
    };
    if spec.kind == IndexKind::Lsi && spec.sort.is_none() {
        return Err(ModelDefinitionError::new(format!(
            "lsi requires a sort field: {}",
            spec.name
        )));
    }

    let partition = attributes.get(&partition_field).ok_or_else(|| {
        ModelDefinitionError::new(format!(
            "unknown index partition field: {partition_field}"
        ))
    })?;
    if partition.encrypted {
        return Err(ModelDefinitionError::new(format!(
            "encrypted partition field is not allowed: {partition_field}"
        )));
    }

    let sort = match &spec.sort {
        Some(field) => {
            let def = attributes.get(field).ok_or_else(|| {
                ModelDefinitionError::new(format!("unknown index sort field: {field}"))
            })?;
            if def.encrypted {
                return Err(ModelDefinitionError::new(format!(
                    "encrypted sort field is not allowed: {field}"
                )));
            }
            Some(def)
        }
        None => None,
    };

    if let Projection::Include(fields) = &spec.projection {
        if let Some(missing) = fields.iter().find(|f| !attributes.contains_key(f.as_str())) {
            return Err(ModelDefinitionError::new(format!(
                "unknown projected field in index {}: {missing}",
                spec.name
            )));
        }
    }

    Ok(IndexDefinition {
        name: spec.name,
        kind: spec.kind,
        partition_field: partition.field_name.clone(),
        partition_attribute: partition.attribute_name.clone(),
        sort_field: sort.map(|def| def.field_name.clone()),
        sort_attribute: sort.map(|def| def.attribute_name.clone()),
        projection: spec.projection,
    })
}
