use std::collections::HashMap;
use std::sync::Arc;

use super::{IndexSpec, Model, Record, RecordDescription};
use crate::error::ModelDefinitionError;

/// Process-lifetime cache of validated models, keyed by model type.
///
/// Registration happens once per record type during startup; afterwards the
/// registry is shared read-only and hands out `Arc<Model>` clones.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record type, returning the cached model if already known.
    pub fn register<T: Record>(&mut self) -> Result<Arc<Model>, ModelDefinitionError> {
        self.register_description(T::describe(), T::table_name(), T::indexes())
    }

    pub fn register_description(
        &mut self,
        description: RecordDescription,
        table_name: Option<String>,
        indexes: Vec<IndexSpec>,
    ) -> Result<Arc<Model>, ModelDefinitionError> {
        if let Some(existing) = self.models.get(&description.model_type) {
            return Ok(Arc::clone(existing));
        }

        let model = Arc::new(Model::from_description(description, table_name, indexes)?);
        tracing::debug!(model_type = %model.model_type(), "registered model");
        self.models
            .insert(model.model_type().to_string(), Arc::clone(&model));
        Ok(model)
    }

    pub fn get(&self, model_type: &str) -> Option<Arc<Model>> {
        self.models.get(model_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
