mod common;

use std::time::Duration;

use dynamap::testkit::{Call, FakeStore, Operation, Response};
use dynamap::{
    AccessError, AttributeValue, Expr, Page, QueryRequest, RetryPolicy, ScanRequest,
    SortKeyCondition,
};
use dynamap_core::storage::{ReadOutput, StoreFailure};

use common::{order_item, order_key, orders, orders_with, Order};

fn page(items: Vec<dynamap::Item>, last: Option<dynamap::Item>) -> Response {
    Response::Read(ReadOutput {
        items,
        last_evaluated_key: last,
    })
}

#[tokio::test]
async fn test_query_renders_key_condition() {
    let h = orders();
    h.table
        .query(
            &QueryRequest::new("c1")
                .sort(SortKeyCondition::BeginsWith("2024".into()))
                .filter(Expr::eq("status", "open"))
                .limit(10),
        )
        .await
        .unwrap();

    let calls = h.store.calls().await;
    let Call::Query(input) = &calls[0] else {
        panic!("expected Query, got {calls:?}");
    };
    assert_eq!(input.table_name, "orders");
    assert_eq!(
        input.key_condition_expression,
        "#n0 = :v0 AND begins_with(#n1, :v1)"
    );
    assert_eq!(input.filter_expression.as_deref(), Some("#n2 = :v2"));
    assert_eq!(input.attributes.names["#n1"], "SK");
    assert_eq!(input.attributes.values[":v0"], AttributeValue::S("c1".into()));
    assert_eq!(input.limit, Some(10));
    assert!(input.scan_index_forward);
}

#[tokio::test]
async fn test_query_on_gsi_uses_index_keys() {
    let h = orders();
    h.table
        .query(
            &QueryRequest::new("open")
                .index("by-status")
                .sort(SortKeyCondition::Between("2024-01".into(), "2024-12".into()))
                .descending(),
        )
        .await
        .unwrap();

    let calls = h.store.calls().await;
    let Call::Query(input) = &calls[0] else {
        panic!("expected Query, got {calls:?}");
    };
    assert_eq!(input.index_name.as_deref(), Some("by-status"));
    assert_eq!(
        input.key_condition_expression,
        "#n0 = :v0 AND #n1 BETWEEN :v1 AND :v2"
    );
    assert_eq!(input.attributes.names["#n0"], "status");
    assert_eq!(input.attributes.names["#n1"], "createdAt");
    assert!(!input.scan_index_forward);
}

#[tokio::test]
async fn test_query_all_follows_cursors() {
    let h = orders_with(
        FakeStore::new()
            .script(
                Operation::Query,
                page(
                    vec![order_item("c1", "o1", "open")],
                    Some(order_key("c1", "o1")),
                ),
            )
            .script(Operation::Query, page(vec![order_item("c1", "o2", "open")], None)),
    );

    let orders: Vec<Order> = h.table.query_all(&QueryRequest::new("c1")).await.unwrap();
    let ids: Vec<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
    assert_eq!(ids, vec!["o1", "o2"]);

    let calls = h.store.calls().await;
    let Call::Query(second) = &calls[1] else {
        panic!("expected Query, got {calls:?}");
    };
    assert_eq!(second.exclusive_start_key, Some(order_key("c1", "o1")));
}

#[tokio::test]
async fn test_last_page_has_no_cursor() {
    let h = orders_with(
        FakeStore::new().script(Operation::Query, page(vec![order_item("c1", "o1", "open")], None)),
    );
    let page = h.table.query(&QueryRequest::new("c1")).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.next_cursor, None);
}

#[tokio::test]
async fn test_cursor_must_match_request_direction() {
    let h = orders_with(FakeStore::new().script(
        Operation::Query,
        page(Vec::new(), Some(order_key("c1", "o1"))),
    ));
    let first = h.table.query(&QueryRequest::new("c1")).await.unwrap();
    let cursor = first.next_cursor.clone();
    assert!(cursor.is_some());

    let err = h
        .table
        .query(&QueryRequest::new("c1").descending().cursor(cursor))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, AccessError::Validation(m) if m.starts_with("cursor sort mismatch")),
        "unexpected error: {err:?}"
    );
    assert_eq!(h.store.call_count(Operation::Query).await, 1);
}

#[tokio::test]
async fn test_cursor_must_match_request_index() {
    let h = orders_with(FakeStore::new().script(
        Operation::Query,
        page(Vec::new(), Some(order_key("c1", "o1"))),
    ));
    let first = h.table.query(&QueryRequest::new("c1")).await.unwrap();

    let err = h
        .table
        .query(
            &QueryRequest::new("c1")
                .index("by-created")
                .cursor(first.next_cursor),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(&err, AccessError::Validation(m) if m.starts_with("cursor index mismatch")),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_invalid_cursor_is_rejected() {
    let h = orders();
    let err = h
        .table
        .query(&QueryRequest::new("c1").cursor(Some("***".to_string())))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, AccessError::Validation(m) if m.starts_with("invalid cursor")),
        "unexpected error: {err:?}"
    );
    assert_eq!(h.store.call_count(Operation::Query).await, 0);
}

#[tokio::test]
async fn test_gsi_consistent_read_fails_before_any_request() {
    let h = orders();
    let expected = AccessError::validation("consistent_read is not supported for GSIs");

    let err = h
        .table
        .query(&QueryRequest::new("open").index("by-status").consistent())
        .await
        .unwrap_err();
    assert_eq!(err, expected);

    let err = h
        .table
        .scan(&ScanRequest::new().index("by-status").consistent())
        .await
        .unwrap_err();
    assert_eq!(err, expected);

    assert!(h.store.calls().await.is_empty());
}

#[tokio::test]
async fn test_lsi_consistent_read_is_allowed() {
    let h = orders();
    h.table
        .query(&QueryRequest::new("c1").index("by-created").consistent())
        .await
        .unwrap();

    let calls = h.store.calls().await;
    let Call::Query(input) = &calls[0] else {
        panic!("expected Query, got {calls:?}");
    };
    assert!(input.consistent_read);
    assert_eq!(input.attributes.names["#n0"], "PK");
}

#[tokio::test]
async fn test_unknown_index_is_rejected() {
    let h = orders();
    let err = h
        .table
        .query(&QueryRequest::new("c1").index("missing"))
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::validation("unknown index: missing"));
}

#[tokio::test]
async fn test_zero_limit_is_rejected() {
    let h = orders();
    let err = h
        .table
        .scan(&ScanRequest::new().limit(0))
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::validation("limit must be > 0"));
}

#[tokio::test]
async fn test_query_with_retry_waits_for_items() {
    let h = orders_with(
        FakeStore::new()
            .script(Operation::Query, page(Vec::new(), None))
            .script(Operation::Query, page(Vec::new(), None))
            .script(Operation::Query, page(vec![order_item("c1", "o1", "open")], None)),
    );

    let page = h
        .table
        .query_with_retry(&QueryRequest::new("c1"), &RetryPolicy::default(), None)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(
        h.sleeper.sleeps().await,
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
}

#[tokio::test]
async fn test_query_with_retry_uses_verify_predicate() {
    let h = orders_with(
        FakeStore::new()
            .script(Operation::Query, page(vec![order_item("c1", "o1", "open")], None))
            .script(
                Operation::Query,
                page(
                    vec![order_item("c1", "o1", "open"), order_item("c1", "o2", "open")],
                    None,
                ),
            ),
    );

    let verify = |page: &Page<Order>| page.items.len() >= 2;
    let page = h
        .table
        .query_with_retry(&QueryRequest::new("c1"), &RetryPolicy::default(), Some(&verify))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(h.store.call_count(Operation::Query).await, 2);
}

#[tokio::test]
async fn test_scan_with_retry_returns_last_page_when_exhausted() {
    let h = orders_with(FakeStore::new().on_scan(|_| Ok(ReadOutput::default())));
    let policy = RetryPolicy {
        max_attempts: 3,
        ..RetryPolicy::default()
    };

    let page = h
        .table
        .scan_with_retry(&ScanRequest::new(), &policy, None)
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(h.store.call_count(Operation::Scan).await, 3);
    assert_eq!(h.sleeper.sleeps().await.len(), 2);
}

#[tokio::test]
async fn test_scan_with_retry_recovers_from_throttling() {
    let h = orders_with(
        FakeStore::new()
            .fail_next(
                Operation::Scan,
                StoreFailure::new("ProvisionedThroughputExceededException", "slow down"),
            )
            .on_scan(|_| {
                Ok(ReadOutput {
                    items: vec![order_item("c1", "o1", "open")],
                    last_evaluated_key: None,
                })
            }),
    );

    let page = h
        .table
        .scan_with_retry(&ScanRequest::new(), &RetryPolicy::default(), None)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(h.store.call_count(Operation::Scan).await, 2);
}

#[tokio::test]
async fn test_scan_all_segments_keeps_segment_order() {
    let h = orders_with(FakeStore::new().on_scan(|input| {
        let segment = input.segment.unwrap_or_default();
        assert_eq!(input.total_segments, Some(3));
        Ok(ReadOutput {
            items: vec![order_item("c1", &format!("o{segment}"), "open")],
            last_evaluated_key: None,
        })
    }));

    let orders = h
        .table
        .scan_all_segments(&ScanRequest::new(), 3, Some(2))
        .await
        .unwrap();
    let ids: Vec<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
    assert_eq!(ids, vec!["o0", "o1", "o2"]);
}

#[tokio::test]
async fn test_scan_rejects_invalid_segment() {
    let h = orders();
    let err = h
        .table
        .scan(&ScanRequest::new().segment(3, 3))
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::validation("invalid scan segment 3 of 3"));
}
