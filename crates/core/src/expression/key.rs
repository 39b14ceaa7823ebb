use serde_json::Value;

use super::Placeholders;
use crate::error::{AccessError, Result};
use crate::marshal::{encode_value, to_wire};
use crate::model::{AttributeDefinition, KeySchema};

/// Range condition on the sort key of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKeyCondition {
    Eq(Value),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Between(Value, Value),
    BeginsWith(Value),
}

impl SortKeyCondition {
    /// Builds a condition from an operator token and its operands.
    pub fn parse(op: &str, operands: Vec<Value>) -> Result<Self> {
        let unary: fn(Value) -> SortKeyCondition = match op.to_ascii_lowercase().as_str() {
            "=" | "==" => SortKeyCondition::Eq,
            "<" => SortKeyCondition::Lt,
            "<=" => SortKeyCondition::Lte,
            ">" => SortKeyCondition::Gt,
            ">=" => SortKeyCondition::Gte,
            "begins_with" => SortKeyCondition::BeginsWith,
            "between" => {
                let [low, high]: [Value; 2] = operands.try_into().map_err(|rest: Vec<Value>| {
                    AccessError::validation(format!(
                        "sort key operator between requires exactly two operands (got {})",
                        rest.len()
                    ))
                })?;
                return Ok(SortKeyCondition::Between(low, high));
            }
            _ => {
                return Err(AccessError::validation(format!(
                    "unsupported sort key operator: {op}"
                )))
            }
        };

        let [value]: [Value; 1] = operands.try_into().map_err(|rest: Vec<Value>| {
            AccessError::validation(format!(
                "sort key operator {op} requires exactly one operand (got {})",
                rest.len()
            ))
        })?;
        Ok(unary(value))
    }
}

/// Renders `#pk = :pk [AND <sort condition>]` against a key schema.
pub fn render_key_condition(
    schema: &KeySchema<'_>,
    partition: &Value,
    sort: Option<&SortKeyCondition>,
    placeholders: &mut Placeholders,
) -> Result<String> {
    if partition.is_null() {
        return Err(AccessError::validation("partition is required"));
    }
    let pk_name = placeholders.name(&schema.partition.attribute_name);
    let pk_value = placeholders.value(encode_value(schema.partition, partition)?);
    let mut expression = format!("{pk_name} = {pk_value}");

    let Some(sort) = sort else {
        return Ok(expression);
    };
    let sk = schema
        .sort
        .ok_or_else(|| AccessError::validation("model/index does not define a sort key"))?;
    let sk_name = placeholders.name(&sk.attribute_name);

    let clause = match sort {
        SortKeyCondition::Eq(v) => format!("{sk_name} = {}", bind(sk, v, placeholders)?),
        SortKeyCondition::Lt(v) => format!("{sk_name} < {}", bind(sk, v, placeholders)?),
        SortKeyCondition::Lte(v) => format!("{sk_name} <= {}", bind(sk, v, placeholders)?),
        SortKeyCondition::Gt(v) => format!("{sk_name} > {}", bind(sk, v, placeholders)?),
        SortKeyCondition::Gte(v) => format!("{sk_name} >= {}", bind(sk, v, placeholders)?),
        SortKeyCondition::Between(low, high) => {
            let low = bind(sk, low, placeholders)?;
            let high = bind(sk, high, placeholders)?;
            format!("{sk_name} BETWEEN {low} AND {high}")
        }
        SortKeyCondition::BeginsWith(prefix) => {
            let prefix = placeholders.value(to_wire(prefix));
            format!("begins_with({sk_name}, {prefix})")
        }
    };
    expression.push_str(" AND ");
    expression.push_str(&clause);
    Ok(expression)
}

fn bind(def: &AttributeDefinition, value: &Value, placeholders: &mut Placeholders) -> Result<String> {
    Ok(placeholders.value(encode_value(def, value)?))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{FieldDescriptor, Model, RecordDescription, Role};
    use crate::value::AttributeValue;

    fn model(with_sort: bool) -> Model {
        let mut description = RecordDescription::new("Event")
            .field(FieldDescriptor::new("pk").attribute("PK").role(Role::Pk));
        if with_sort {
            description = description.field(FieldDescriptor::new("sk").attribute("SK").role(Role::Sk));
        }
        Model::from_description(description, None, vec![]).unwrap()
    }

    #[test]
    fn test_parse_checks_arity_and_operator() {
        assert!(SortKeyCondition::parse("between", vec![json!(1)]).is_err());
        assert!(SortKeyCondition::parse("=", vec![]).is_err());
        assert!(SortKeyCondition::parse(">=", vec![json!(1), json!(2)]).is_err());
        let err = SortKeyCondition::parse("contains", vec![json!("x")]).unwrap_err();
        assert_eq!(
            err,
            AccessError::validation("unsupported sort key operator: contains")
        );
        assert_eq!(
            SortKeyCondition::parse("BETWEEN", vec![json!(1), json!(2)]).unwrap(),
            SortKeyCondition::Between(json!(1), json!(2))
        );
    }

    #[test]
    fn test_render_between() {
        let model = model(true);
        let schema = model.key_schema(None).unwrap();
        let mut ph = Placeholders::new();
        let cond = SortKeyCondition::Between(json!("a"), json!("m"));
        let expr = render_key_condition(&schema, &json!("P"), Some(&cond), &mut ph).unwrap();

        assert_eq!(expr, "#n0 = :v0 AND #n1 BETWEEN :v1 AND :v2");
        assert_eq!(ph.names()["#n1"], "SK");
        assert_eq!(ph.values()[":v2"], AttributeValue::S("m".into()));
    }

    #[test]
    fn test_render_begins_with() {
        let model = model(true);
        let schema = model.key_schema(None).unwrap();
        let mut ph = Placeholders::new();
        let cond = SortKeyCondition::BeginsWith(json!("2024-"));
        let expr = render_key_condition(&schema, &json!("P"), Some(&cond), &mut ph).unwrap();
        assert_eq!(expr, "#n0 = :v0 AND begins_with(#n1, :v1)");
    }

    #[test]
    fn test_sort_condition_without_sort_key_fails() {
        let model = model(false);
        let schema = model.key_schema(None).unwrap();
        let mut ph = Placeholders::new();
        let cond = SortKeyCondition::Eq(json!(1));
        let err = render_key_condition(&schema, &json!("P"), Some(&cond), &mut ph).unwrap_err();
        assert_eq!(
            err,
            AccessError::validation("model/index does not define a sort key")
        );
    }
}
