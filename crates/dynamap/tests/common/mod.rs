#![allow(dead_code)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use dynamap::testkit::{FakeKeyWrapper, FakeStore, FixedNonce, RecordingSleeper};
use dynamap::{
    AttributeValue, FieldDescriptor, IndexSpec, Item, Record, RecordDescription, Role, Table,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub customer: String,
    pub order_id: String,
    pub status: String,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Order {
    pub fn new(customer: &str, order_id: &str, status: &str) -> Self {
        Self {
            customer: customer.to_string(),
            order_id: order_id.to_string(),
            status: status.to_string(),
            total: 0,
            tags: Vec::new(),
            created_at: String::new(),
        }
    }
}

impl Record for Order {
    fn describe() -> RecordDescription {
        RecordDescription::new("Order")
            .field(FieldDescriptor::new("customer").attribute("PK").role(Role::Pk))
            .field(FieldDescriptor::new("order_id").attribute("SK").role(Role::Sk))
            .field(FieldDescriptor::new("status"))
            .field(FieldDescriptor::new("total").with_default())
            .field(FieldDescriptor::new("tags").set().omitempty().with_default())
            .field(
                FieldDescriptor::new("created_at")
                    .attribute("createdAt")
                    .role(Role::CreatedAt)
                    .with_default(),
            )
    }

    fn table_name() -> Option<String> {
        Some("orders".to_string())
    }

    fn indexes() -> Vec<IndexSpec> {
        vec![
            IndexSpec::gsi("by-status", "status").sort("created_at"),
            IndexSpec::lsi("by-created", "created_at"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub ssn: String,
}

impl Record for Patient {
    fn describe() -> RecordDescription {
        RecordDescription::new("Patient")
            .field(FieldDescriptor::new("id").attribute("PK").role(Role::Pk))
            .field(FieldDescriptor::new("name"))
            .field(FieldDescriptor::new("ssn").encrypted())
    }

    fn table_name() -> Option<String> {
        Some("patients".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub updated_at: String,
}

impl Document {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            version: 0,
            updated_at: String::new(),
        }
    }
}

impl Record for Document {
    fn describe() -> RecordDescription {
        RecordDescription::new("Document")
            .field(FieldDescriptor::new("id").attribute("PK").role(Role::Pk))
            .field(FieldDescriptor::new("title"))
            .field(FieldDescriptor::new("version").role(Role::Version).with_default())
            .field(
                FieldDescriptor::new("updated_at")
                    .attribute("updatedAt")
                    .role(Role::UpdatedAt)
                    .with_default(),
            )
    }

    fn table_name() -> Option<String> {
        Some("documents".to_string())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Harness<T> {
    pub table: Table<T>,
    pub store: Arc<FakeStore>,
    pub sleeper: Arc<RecordingSleeper>,
}

pub fn orders_with(store: FakeStore) -> Harness<Order> {
    init_tracing();
    let store = Arc::new(store);
    let sleeper = Arc::new(RecordingSleeper::new());
    let table = Table::<Order>::builder(store.clone())
        .sleeper(sleeper.clone())
        .build()
        .unwrap();
    Harness {
        table,
        store,
        sleeper,
    }
}

pub fn documents() -> Harness<Document> {
    init_tracing();
    let store = Arc::new(FakeStore::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let table = Table::<Document>::builder(store.clone())
        .sleeper(sleeper.clone())
        .build()
        .unwrap();
    Harness {
        table,
        store,
        sleeper,
    }
}

pub fn orders() -> Harness<Order> {
    orders_with(FakeStore::new())
}

pub fn patients(wrapper: Arc<FakeKeyWrapper>) -> Harness<Patient> {
    init_tracing();
    let store = Arc::new(FakeStore::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let table = Table::<Patient>::builder(store.clone())
        .key_wrapper(wrapper, "alias/patients")
        .nonce_source(Arc::new(FixedNonce([7; 12])))
        .sleeper(sleeper.clone())
        .build()
        .unwrap();
    Harness {
        table,
        store,
        sleeper,
    }
}

/// Wire item of an order as the store would hold it.
pub fn order_item(customer: &str, order_id: &str, status: &str) -> Item {
    Item::from([
        ("PK".to_string(), AttributeValue::S(customer.to_string())),
        ("SK".to_string(), AttributeValue::S(order_id.to_string())),
        ("status".to_string(), AttributeValue::S(status.to_string())),
        ("total".to_string(), AttributeValue::N("0".to_string())),
        (
            "createdAt".to_string(),
            AttributeValue::S("2024-01-01T00:00:00+00:00".to_string()),
        ),
    ])
}

pub fn order_key(customer: &str, order_id: &str) -> Item {
    Item::from([
        ("PK".to_string(), AttributeValue::S(customer.to_string())),
        ("SK".to_string(), AttributeValue::S(order_id.to_string())),
    ])
}
