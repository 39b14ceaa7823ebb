mod common;

use std::collections::HashMap;

use dynamap::testkit::{Call, FakeStore, Operation, Response};
use dynamap::{
    AccessError, AttributeValue, Expr, GetOptions, Key, RawExpression, UpdateOp, WriteOptions,
};
use dynamap_core::storage::{StoreFailure, UpdateItemOutput, CONDITIONAL_CHECK_FAILED};

use common::{documents, order_item, order_key, orders, orders_with, Document, Order};

#[tokio::test]
async fn test_put_then_get_round_trip() {
    let h = orders();
    let mut order = Order::new("c1", "o1", "open");
    order.total = 42;
    order.tags = vec!["gift".to_string()];

    h.table.put(&order, &WriteOptions::default()).await.unwrap();

    let stored = h.store.item("orders", &order_key("c1", "o1")).await.unwrap();
    assert_eq!(stored["PK"], AttributeValue::S("c1".into()));
    assert_eq!(stored["SK"], AttributeValue::S("o1".into()));
    assert_eq!(stored["total"], AttributeValue::N("42".into()));
    assert_eq!(stored["tags"], AttributeValue::Ss(vec!["gift".into()]));

    let loaded = h
        .table
        .get(&Key::new("c1").with_sort("o1"), &GetOptions::default())
        .await
        .unwrap();
    assert_eq!(loaded.total, 42);
    assert_eq!(loaded.tags, vec!["gift".to_string()]);
    assert!(!loaded.created_at.is_empty(), "created_at is filled on put");
}

#[tokio::test]
async fn test_put_keeps_existing_timestamp() {
    let h = orders();
    let mut order = Order::new("c1", "o1", "open");
    order.created_at = "2020-02-02T00:00:00+00:00".to_string();

    h.table.put(&order, &WriteOptions::default()).await.unwrap();

    let stored = h.store.item("orders", &order_key("c1", "o1")).await.unwrap();
    assert_eq!(
        stored["createdAt"],
        AttributeValue::S("2020-02-02T00:00:00+00:00".into())
    );
}

#[tokio::test]
async fn test_empty_set_is_omitted() {
    let h = orders();
    h.table
        .put(&Order::new("c1", "o1", "open"), &WriteOptions::default())
        .await
        .unwrap();

    let stored = h.store.item("orders", &order_key("c1", "o1")).await.unwrap();
    assert!(!stored.contains_key("tags"));
}

#[tokio::test]
async fn test_get_missing_item_is_not_found() {
    let h = orders();
    let err = h
        .table
        .get(&Key::new("c1").with_sort("nope"), &GetOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::NotFound(_)));
}

#[tokio::test]
async fn test_get_requires_sort_key() {
    let h = orders();
    let err = h
        .table
        .get(&Key::new("c1"), &GetOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::validation("sk is required"));
    assert_eq!(h.store.call_count(Operation::GetItem).await, 0);
}

#[tokio::test]
async fn test_get_with_projection_and_consistent_read() {
    let h = orders();
    h.store.insert("orders", order_item("c1", "o1", "open")).await;

    h.table
        .get(
            &Key::new("c1").with_sort("o1"),
            &GetOptions::default()
                .consistent()
                .projection(["customer", "order_id", "status"]),
        )
        .await
        .unwrap();

    let calls = h.store.calls().await;
    let Call::GetItem(input) = &calls[0] else {
        panic!("expected GetItem, got {calls:?}");
    };
    assert!(input.consistent_read);
    assert_eq!(input.projection_expression.as_deref(), Some("#n0, #n1, #n2"));
    assert_eq!(input.attributes.names["#n0"], "PK");
    assert_eq!(input.attributes.names["#n1"], "SK");
    assert_eq!(input.attributes.names["#n2"], "status");
}

#[tokio::test]
async fn test_projection_must_cover_required_fields() {
    let h = orders();
    let err = h
        .table
        .get(
            &Key::new("c1").with_sort("o1"),
            &GetOptions::default().projection(["customer"]),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AccessError::validation(r#"projection is missing required fields: ["order_id", "status"]"#)
    );
}

#[tokio::test]
async fn test_put_with_condition() {
    let h = orders();
    let options = WriteOptions::default().condition(Expr::not_exists("customer"));
    h.table
        .put(&Order::new("c1", "o1", "open"), &options)
        .await
        .unwrap();

    let calls = h.store.calls().await;
    let Call::PutItem(input) = &calls[0] else {
        panic!("expected PutItem, got {calls:?}");
    };
    assert_eq!(
        input.condition_expression.as_deref(),
        Some("attribute_not_exists(#n0)")
    );
    assert_eq!(
        input.attributes.names,
        HashMap::from([("#n0".to_string(), "PK".to_string())])
    );
}

#[tokio::test]
async fn test_structured_and_raw_conditions_are_combined() {
    let h = orders();
    let options = WriteOptions::default()
        .condition(Expr::eq("status", "open"))
        .raw_condition(
            RawExpression::new("#total < :max")
                .name("#total", "total")
                .value(":max", 100),
        );
    h.table
        .delete(&Key::new("c1").with_sort("o1"), &options)
        .await
        .unwrap();

    let calls = h.store.calls().await;
    let Call::DeleteItem(input) = &calls[0] else {
        panic!("expected DeleteItem, got {calls:?}");
    };
    assert_eq!(
        input.condition_expression.as_deref(),
        Some("(#n0 = :v0) AND (#total < :max)")
    );
    assert_eq!(input.attributes.names["#total"], "total");
    assert_eq!(input.attributes.values[":max"], AttributeValue::N("100".into()));
}

#[tokio::test]
async fn test_raw_placeholder_collision_is_rejected() {
    let h = orders();
    let options = WriteOptions::default()
        .condition(Expr::eq("status", "open"))
        .raw_condition(RawExpression::new("#n0 = :x").name("#n0", "total"));
    let err = h
        .table
        .delete(&Key::new("c1").with_sort("o1"), &options)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AccessError::validation("expression attribute name collision: #n0")
    );
    assert_eq!(h.store.call_count(Operation::DeleteItem).await, 0);
}

#[tokio::test]
async fn test_conditional_check_failure_maps_to_condition_failed() {
    let h = orders_with(FakeStore::new().fail_next(
        Operation::PutItem,
        StoreFailure::new(CONDITIONAL_CHECK_FAILED, "The conditional request failed"),
    ));
    let err = h
        .table
        .put(&Order::new("c1", "o1", "open"), &WriteOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AccessError::ConditionFailed("The conditional request failed".into())
    );
}

#[tokio::test]
async fn test_update_returns_new_record() {
    let h = orders();
    h.store.insert("orders", order_item("c1", "o1", "shipped")).await;

    let updated = h
        .table
        .update(
            &Key::new("c1").with_sort("o1"),
            &[UpdateOp::set("status", "shipped"), UpdateOp::increment("total", 2)],
            &WriteOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(updated.status, "shipped");

    let calls = h.store.calls().await;
    let Call::UpdateItem(input) = &calls[0] else {
        panic!("expected UpdateItem, got {calls:?}");
    };
    assert_eq!(input.update_expression, "SET #n0 = :v0 ADD #n1 :v1");
    assert_eq!(input.return_values, dynamap_core::storage::ReturnValues::AllNew);
}

#[tokio::test]
async fn test_update_of_key_field_fails_before_request() {
    let h = orders();
    let err = h
        .table
        .update(
            &Key::new("c1").with_sort("o1"),
            &[UpdateOp::set("customer", "c2")],
            &WriteOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::validation("cannot update key field: customer"));
    assert_eq!(h.store.call_count(Operation::UpdateItem).await, 0);
}

#[tokio::test]
async fn test_update_without_returned_attributes_fails() {
    let h = orders_with(FakeStore::new().script(
        Operation::UpdateItem,
        Response::Update(UpdateItemOutput { attributes: None }),
    ));
    let err = h
        .table
        .update(
            &Key::new("c1").with_sort("o1"),
            &[UpdateOp::set("status", "open")],
            &WriteOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::validation("update did not return Attributes"));
}

#[tokio::test]
async fn test_decode_stream_image() {
    let h = orders();
    let image = order_item("c1", "o1", "open");

    let decoded = h.table.decode_stream_image(Some(&image)).await.unwrap();
    assert_eq!(decoded.map(|o| o.status), Some("open".to_string()));
    assert_eq!(h.table.decode_stream_image(None).await.unwrap(), None);
}

#[tokio::test]
async fn test_encode_item_does_not_stamp_timestamps() {
    let h = orders();
    let item = h
        .table
        .encode_item(&Order::new("c1", "o1", "open"))
        .await
        .unwrap();
    assert_eq!(item["createdAt"], AttributeValue::S(String::new()));
}

#[tokio::test]
async fn test_missing_table_name_fails_at_build() {
    use std::sync::Arc;

    use dynamap::{FieldDescriptor, Record, RecordDescription, Role, Table};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Untabled {
        id: String,
    }

    impl Record for Untabled {
        fn describe() -> RecordDescription {
            RecordDescription::new("Untabled")
                .field(FieldDescriptor::new("id").role(Role::Pk))
        }
    }

    let store = Arc::new(FakeStore::new());
    let err = Table::<Untabled>::new(store.clone()).err().unwrap();
    assert_eq!(
        err,
        AccessError::validation("no table name configured for model Untabled")
    );

    let table = Table::<Untabled>::builder(store)
        .table_name("things")
        .build()
        .unwrap();
    assert_eq!(table.table_name(), "things");
}

fn document_key(id: &str) -> dynamap::Item {
    dynamap::Item::from([("PK".to_string(), AttributeValue::S(id.to_string()))])
}

#[tokio::test]
async fn test_put_seeds_version_and_updated_at() {
    let h = documents();
    h.table
        .put(&Document::new("d1", "draft"), &WriteOptions::default())
        .await
        .unwrap();

    let stored = h.store.item("documents", &document_key("d1")).await.unwrap();
    assert_eq!(stored["version"], AttributeValue::N("0".into()));
    assert!(matches!(&stored["updatedAt"], AttributeValue::S(s) if !s.is_empty()));
}

#[tokio::test]
async fn test_update_bumps_version_and_stamps_updated_at() {
    let h = documents();
    h.table
        .put(&Document::new("d1", "draft"), &WriteOptions::default())
        .await
        .unwrap();

    h.table
        .update(
            &Key::new("d1"),
            &[UpdateOp::set("title", "final")],
            &WriteOptions::default().expected_version(3),
        )
        .await
        .unwrap();

    let calls = h.store.calls().await;
    let Some(Call::UpdateItem(input)) = calls.last() else {
        panic!("expected UpdateItem, got {calls:?}");
    };
    assert_eq!(input.update_expression, "SET #n0 = :v0, #n1 = :v1 ADD #n2 :v2");
    assert_eq!(input.condition_expression.as_deref(), Some("#n2 = :v3"));
    assert_eq!(input.attributes.names["#n1"], "updatedAt");
    assert_eq!(input.attributes.names["#n2"], "version");
    assert_eq!(input.attributes.values[":v2"], AttributeValue::N("1".into()));
    assert_eq!(input.attributes.values[":v3"], AttributeValue::N("3".into()));
    assert!(matches!(&input.attributes.values[":v1"], AttributeValue::S(s) if !s.is_empty()));
}

#[tokio::test]
async fn test_update_without_expected_version_is_unconditional() {
    let h = documents();
    h.table
        .put(&Document::new("d1", "draft"), &WriteOptions::default())
        .await
        .unwrap();

    h.table
        .update(
            &Key::new("d1"),
            &[UpdateOp::set("title", "final")],
            &WriteOptions::default(),
        )
        .await
        .unwrap();

    let calls = h.store.calls().await;
    let Some(Call::UpdateItem(input)) = calls.last() else {
        panic!("expected UpdateItem, got {calls:?}");
    };
    assert!(input.update_expression.ends_with("ADD #n2 :v2"));
    assert_eq!(input.condition_expression, None);
}

#[tokio::test]
async fn test_caller_managed_version_is_not_bumped_twice() {
    let h = documents();
    h.table
        .put(&Document::new("d1", "draft"), &WriteOptions::default())
        .await
        .unwrap();

    h.table
        .update(
            &Key::new("d1"),
            &[UpdateOp::set("version", 9), UpdateOp::set("title", "x")],
            &WriteOptions::default(),
        )
        .await
        .unwrap();

    let calls = h.store.calls().await;
    let Some(Call::UpdateItem(input)) = calls.last() else {
        panic!("expected UpdateItem, got {calls:?}");
    };
    assert_eq!(input.update_expression, "SET #n0 = :v0, #n1 = :v1, #n2 = :v2");
    assert_eq!(input.attributes.names["#n0"], "version");
    assert_eq!(input.attributes.names["#n2"], "updatedAt");
}

#[tokio::test]
async fn test_delete_with_expected_version() {
    let h = documents();

    h.table
        .delete(&Key::new("d1"), &WriteOptions::default().expected_version(0))
        .await
        .unwrap();
    h.table
        .delete(
            &Key::new("d1"),
            &WriteOptions::default()
                .condition(Expr::eq("title", "draft"))
                .expected_version(2),
        )
        .await
        .unwrap();

    let calls = h.store.calls().await;
    let [Call::DeleteItem(first), Call::DeleteItem(second)] = calls.as_slice() else {
        panic!("expected two DeleteItem calls, got {calls:?}");
    };
    assert_eq!(first.condition_expression, None);
    assert_eq!(
        second.condition_expression.as_deref(),
        Some("#n0 = :v0 AND #n1 = :v1")
    );
    assert_eq!(second.attributes.names["#n1"], "version");
    assert_eq!(second.attributes.values[":v1"], AttributeValue::N("2".into()));
}

#[tokio::test]
async fn test_expected_version_requires_version_field() {
    let h = orders();
    let err = h
        .table
        .delete(
            &Key::new("c1").with_sort("o1"),
            &WriteOptions::default().expected_version(1),
        )
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::validation("model Order has no version field"));
    assert!(h.store.calls().await.is_empty());
}

#[tokio::test]
async fn test_put_rejects_expected_version() {
    let h = documents();
    let err = h
        .table
        .put(
            &Document::new("d1", "draft"),
            &WriteOptions::default().expected_version(1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::Validation(msg) if msg.starts_with("expected_version applies only")));
    assert!(h.store.calls().await.is_empty());
}
