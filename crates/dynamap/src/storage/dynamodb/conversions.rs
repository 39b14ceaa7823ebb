//! Conversions between dynamap wire values and SDK attribute values.
//!
//! Pure functions, testable without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue as SdkValue;

use dynamap_core::storage::{ExpressionAttributes, StoreFailure};
use dynamap_core::{AttributeValue, Item};

pub type SdkItem = HashMap<String, SdkValue>;

pub fn to_sdk(value: &AttributeValue) -> SdkValue {
    match value {
        AttributeValue::S(s) => SdkValue::S(s.clone()),
        AttributeValue::N(n) => SdkValue::N(n.clone()),
        AttributeValue::B(b) => SdkValue::B(Blob::new(b.clone())),
        AttributeValue::Bool(b) => SdkValue::Bool(*b),
        AttributeValue::Null => SdkValue::Null(true),
        AttributeValue::L(values) => SdkValue::L(values.iter().map(to_sdk).collect()),
        AttributeValue::M(item) => SdkValue::M(to_sdk_item(item)),
        AttributeValue::Ss(values) => SdkValue::Ss(values.clone()),
        AttributeValue::Ns(values) => SdkValue::Ns(values.clone()),
        AttributeValue::Bs(values) => {
            SdkValue::Bs(values.iter().map(|b| Blob::new(b.clone())).collect())
        }
    }
}

pub fn to_sdk_item(item: &Item) -> SdkItem {
    item.iter().map(|(k, v)| (k.clone(), to_sdk(v))).collect()
}

pub fn from_sdk(value: &SdkValue) -> Result<AttributeValue, StoreFailure> {
    Ok(match value {
        SdkValue::S(s) => AttributeValue::S(s.clone()),
        SdkValue::N(n) => AttributeValue::N(n.clone()),
        SdkValue::B(b) => AttributeValue::B(b.as_ref().to_vec()),
        SdkValue::Bool(b) => AttributeValue::Bool(*b),
        SdkValue::Null(_) => AttributeValue::Null,
        SdkValue::L(values) => AttributeValue::L(
            values
                .iter()
                .map(from_sdk)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        SdkValue::M(item) => AttributeValue::M(from_sdk_item(item)?),
        SdkValue::Ss(values) => AttributeValue::Ss(values.clone()),
        SdkValue::Ns(values) => AttributeValue::Ns(values.clone()),
        SdkValue::Bs(values) => {
            AttributeValue::Bs(values.iter().map(|b| b.as_ref().to_vec()).collect())
        }
        other => {
            return Err(StoreFailure::new(
                "UnsupportedAttributeValue",
                format!("unsupported attribute value: {other:?}"),
            ))
        }
    })
}

pub fn from_sdk_item(item: &SdkItem) -> Result<Item, StoreFailure> {
    item.iter()
        .map(|(k, v)| Ok((k.clone(), from_sdk(v)?)))
        .collect()
}

pub fn from_sdk_items(items: &[SdkItem]) -> Result<Vec<Item>, StoreFailure> {
    items.iter().map(from_sdk_item).collect()
}

/// Placeholder maps as the SDK builders expect them; empty maps become `None`.
pub fn expression_maps(
    attributes: &ExpressionAttributes,
) -> (Option<HashMap<String, String>>, Option<SdkItem>) {
    let names = (!attributes.names.is_empty()).then(|| attributes.names.clone());
    let values = (!attributes.values.is_empty()).then(|| to_sdk_item(&attributes.values));
    (names, values)
}

/// SDK limits are `i32`; larger values are clamped.
pub fn to_sdk_count(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
