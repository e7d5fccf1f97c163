use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use tokio::sync::mpsc;

use lineitem_sync::core::FieldStore;
use lineitem_sync::domain::model::RowEvent;
use lineitem_sync::{FieldConvention, HttpPriceSource, InMemoryForm, SyncEngine, SyncProfile};

fn two_row_form() -> Arc<InMemoryForm> {
    Arc::new(
        InMemoryForm::from_snapshot(
            serde_json::json!({
                "invoiceitem_set-0-item_type": "product",
                "invoiceitem_set-0-product": "1",
                "invoiceitem_set-0-service": "",
                "invoiceitem_set-0-quantity": "1",
                "invoiceitem_set-0-unit_price": "",
                "invoiceitem_set-0-discount": "",
                "invoiceitem_set-0-subtotal": "",
                "invoiceitem_set-1-item_type": "service",
                "invoiceitem_set-1-product": "",
                "invoiceitem_set-1-service": "2",
                "invoiceitem_set-1-quantity": "1",
                "invoiceitem_set-1-unit_price": "",
                "invoiceitem_set-1-discount": "",
                "invoiceitem_set-1-subtotal": ""
            })
            .to_string()
            .as_bytes(),
        )
        .unwrap(),
    )
}

fn changed(field: &str) -> RowEvent {
    RowEvent::FieldChanged {
        field: field.to_string(),
    }
}

/// Two in-flight lookups resolving out of order must each land on the row
/// that issued them, never swapped. Row A's product lookup is slowed down
/// so row B's service lookup finishes first.
#[tokio::test]
async fn test_out_of_order_resolutions_never_swap_rows() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/products/1/");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"price_per_unit": "10.00"}))
            .delay(Duration::from_millis(250));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/services/2/");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"base_price": "20.00"}));
    });

    let form = two_row_form();
    let profile = SyncProfile::admin_inline(&server.base_url());
    let convention = FieldConvention::from_profile(&profile.form).unwrap();
    let source = Arc::new(HttpPriceSource::new(profile.api.clone()).unwrap());
    let engine = SyncEngine::new(form.clone(), source, convention);

    let (tx, rx) = mpsc::channel(4);
    tx.send(changed("invoiceitem_set-0-product")).await.unwrap();
    tx.send(changed("invoiceitem_set-1-service")).await.unwrap();
    drop(tx);

    let stats = engine.run(rx).await.unwrap();

    assert_eq!(stats.lookups_applied, 2);
    assert_eq!(
        form.read_field("invoiceitem_set-0-unit_price").as_deref(),
        Some("10.00")
    );
    assert_eq!(
        form.read_field("invoiceitem_set-1-unit_price").as_deref(),
        Some("20.00")
    );
    assert_eq!(
        form.read_field("invoiceitem_set-0-subtotal").as_deref(),
        Some("10.00")
    );
    assert_eq!(
        form.read_field("invoiceitem_set-1-subtotal").as_deref(),
        Some("20.00")
    );
}

/// A lookup that fails must leave its row's price alone and must not take
/// the other rows down with it.
#[tokio::test]
async fn test_failed_lookup_does_not_block_other_rows() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/products/1/");
        then.status(500);
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/services/2/");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"base_price": 20.0}));
    });

    let form = two_row_form();
    form.write_field("invoiceitem_set-0-unit_price", "7.50");

    let profile = SyncProfile::admin_inline(&server.base_url());
    let convention = FieldConvention::from_profile(&profile.form).unwrap();
    let source = Arc::new(HttpPriceSource::new(profile.api.clone()).unwrap());
    let engine = SyncEngine::new(form.clone(), source, convention);

    let (tx, rx) = mpsc::channel(4);
    tx.send(changed("invoiceitem_set-0-product")).await.unwrap();
    tx.send(changed("invoiceitem_set-1-service")).await.unwrap();
    drop(tx);

    let stats = engine.run(rx).await.unwrap();

    assert_eq!(stats.lookups_failed, 1);
    assert_eq!(stats.lookups_applied, 1);
    // 失敗的列保留原價
    assert_eq!(
        form.read_field("invoiceitem_set-0-unit_price").as_deref(),
        Some("7.50")
    );
    assert_eq!(
        form.read_field("invoiceitem_set-1-unit_price").as_deref(),
        Some("20.00")
    );
}

/// Resolving product id=7 -> 150.00 writes into that row only and
/// recomputes that row's subtotal exactly once.
#[tokio::test]
async fn test_resolution_touches_only_the_originating_row() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/products/7/");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"price_per_unit": 150.0}));
    });

    let form = two_row_form();
    form.write_field("invoiceitem_set-0-product", "7");

    let profile = SyncProfile::admin_inline(&server.base_url());
    let convention = FieldConvention::from_profile(&profile.form).unwrap();
    let source = Arc::new(HttpPriceSource::new(profile.api.clone()).unwrap());
    let engine = SyncEngine::new(form.clone(), source, convention);

    let (tx, rx) = mpsc::channel(2);
    tx.send(changed("invoiceitem_set-0-product")).await.unwrap();
    drop(tx);

    engine.run(rx).await.unwrap();

    assert_eq!(
        form.read_field("invoiceitem_set-0-unit_price").as_deref(),
        Some("150.00")
    );
    assert_eq!(form.write_count("invoiceitem_set-0-subtotal"), 1);
    // 另一列完全沒被動到
    assert_eq!(
        form.read_field("invoiceitem_set-1-unit_price").as_deref(),
        Some("")
    );
    assert_eq!(form.write_count("invoiceitem_set-1-subtotal"), 0);
}
