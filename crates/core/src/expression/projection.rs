use super::Placeholders;
use crate::error::{AccessError, Result};
use crate::model::Model;

/// Renders a projection over logical field names.
///
/// The projection must cover every required field so the returned items can
/// still be decoded into the record type.
pub fn render_projection(
    model: &Model,
    fields: &[String],
    placeholders: &mut Placeholders,
) -> Result<String> {
    let missing: Vec<&str> = model
        .required_fields()
        .into_iter()
        .filter(|required| !fields.iter().any(|f| f == required))
        .collect();
    if !missing.is_empty() {
        return Err(AccessError::validation(format!(
            "projection is missing required fields: {missing:?}"
        )));
    }

    let mut refs: Vec<String> = Vec::with_capacity(fields.len());
    for field in fields {
        let def = model.require_attribute(field)?;
        let name = placeholders.name(&def.attribute_name);
        if !refs.contains(&name) {
            refs.push(name);
        }
    }
    Ok(refs.join(", "))
}
