mod common;

use std::collections::HashSet;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use storefront_api::{
    error::AppError,
    models::{OrderStatus, PaymentMethod, PaymentStatus},
    services::order_service,
    store::{OrderStore, memory::MemoryStore},
};
use uuid::Uuid;

use common::{
    FixedGateway, NotifierMode, RecordingNotifier, customer, line, line_with_variant,
    order_request, product, state_with,
};

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

// Cart of two at 10.00 against five in stock: stock drops to three and the
// lookup echoes what was submitted.
#[tokio::test]
async fn placing_an_order_reserves_stock_and_persists_it() -> anyhow::Result<()> {
    let p1 = product("Test Widget", money(1000), 5);
    let store = MemoryStore::with_products([p1.clone()]);
    let notifier = RecordingNotifier::new(NotifierMode::Deliver);
    let state = state_with(&store, FixedGateway::approve(), notifier.clone());

    let placed = order_service::place_order(&state, order_request(vec![line(p1.id, 2)], money(2160)))
        .await?
        .data
        .expect("placed order");
    assert_eq!(placed.status, OrderStatus::Processing);
    assert!(placed.order_number.starts_with("ORD-"));
    assert_eq!(store.inventory(p1.id)?, Some(3));

    let details = order_service::get_order(&state, &placed.order_number)
        .await?
        .data
        .expect("order details");
    assert_eq!(details.order_number, placed.order_number);
    assert_eq!(details.total, money(2160));
    assert_eq!(details.customer_info, customer());
    assert_eq!(details.status, OrderStatus::Processing);
    assert_eq!(details.payment_status, PaymentStatus::Paid);
    assert_eq!(details.payment_method, PaymentMethod::CreditCard);
    assert_eq!(details.payment_details.last4.as_deref(), Some("4242"));
    assert_eq!(details.payment_details.transaction_id.as_deref(), Some("txn_test"));
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.items[0].product_id, p1.id);
    assert_eq!(details.items[0].quantity, 2);
    assert_eq!(details.items[0].price, money(1000));
    assert_eq!(
        details.items[0].product.as_ref().map(|p| p.name.as_str()),
        Some("Test Widget")
    );

    let confirmations = notifier.confirmations();
    assert_eq!(confirmations.len(), 1);
    assert_eq!(confirmations[0].to, "ada@example.com");
    assert_eq!(confirmations[0].order_number, placed.order_number);
    assert_eq!(confirmations[0].items[0].name, "Test Widget");
    assert!(notifier.failures().is_empty());
    Ok(())
}

// 50.00 at 20% off is sold at 40.00; the order and the email both carry that.
#[tokio::test]
async fn discounted_product_is_recorded_at_the_price_paid() -> anyhow::Result<()> {
    let mut p1 = product("Summer Dress", money(5000), 5);
    p1.discount = 20;
    let store = MemoryStore::with_products([p1.clone()]);
    let notifier = RecordingNotifier::new(NotifierMode::Deliver);
    let state = state_with(&store, FixedGateway::approve(), notifier.clone());

    let placed = order_service::place_order(&state, order_request(vec![line(p1.id, 1)], money(4400)))
        .await?
        .data
        .expect("placed order");

    let details = order_service::get_order(&state, &placed.order_number)
        .await?
        .data
        .expect("order details");
    assert_eq!(details.items[0].price, money(4000));
    assert_eq!(details.total, money(4400));

    let confirmations = notifier.confirmations();
    assert_eq!(confirmations[0].items[0].unit_price, money(4000));
    Ok(())
}

#[tokio::test]
async fn stored_order_keeps_only_last_four_card_digits() -> anyhow::Result<()> {
    let p1 = product("Ferris Mug", money(1200), 3);
    let store = MemoryStore::with_products([p1.clone()]);
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );

    let mut request = order_request(vec![line(p1.id, 1)], money(1200));
    request.card_number = "4000-0566-5566-5556".into();
    let placed = order_service::place_order(&state, request).await?.data.unwrap();

    let order = store.find_order(&placed.order_number).await?.expect("stored order");
    assert_eq!(order.payment_details.last4.as_deref(), Some("5556"));
    let serialized = serde_json::to_string(&order)?;
    assert!(!serialized.contains("4000056655665556"));
    assert!(!serialized.contains("4000-0566"));
    Ok(())
}

#[tokio::test]
async fn insufficient_inventory_is_rejected_without_touching_stock() -> anyhow::Result<()> {
    let p1 = product("Test Widget", money(1000), 5);
    let store = MemoryStore::with_products([p1.clone()]);
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );

    let err = order_service::place_order(&state, order_request(vec![line(p1.id, 10)], money(10000)))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientInventory { .. }));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert!(err.to_string().contains("Test Widget"), "{err}");
    assert_eq!(store.inventory(p1.id)?, Some(5));
    assert_eq!(store.order_count()?, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_product_fails_before_any_reservation() -> anyhow::Result<()> {
    let p1 = product("Test Widget", money(1000), 5);
    let store = MemoryStore::with_products([p1.clone()]);
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );
    let missing = Uuid::new_v4();

    let err = order_service::place_order(
        &state,
        order_request(vec![line(p1.id, 1), line(missing, 1)], money(2000)),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::ProductNotFound(ref id) if *id == missing.to_string()));
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(store.inventory(p1.id)?, Some(5));
    Ok(())
}

#[tokio::test]
async fn malformed_product_id_is_reported_as_not_found() {
    let store = MemoryStore::new();
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );
    let mut request = order_request(vec![line(Uuid::new_v4(), 1)], money(100));
    request.items[0].product_id = "P1".into();

    let err = order_service::place_order(&state, request).await.unwrap_err();
    assert!(matches!(err, AppError::ProductNotFound(ref id) if id == "P1"));
}

#[tokio::test]
async fn short_later_item_leaves_earlier_items_untouched() -> anyhow::Result<()> {
    let plenty = product("Summer Dress", money(4999), 50);
    let scarce = product("Kids Denim Jacket", money(3999), 1);
    let store = MemoryStore::with_products([plenty.clone(), scarce.clone()]);
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );

    let err = order_service::place_order(
        &state,
        order_request(vec![line(plenty.id, 2), line(scarce.id, 2)], money(17996)),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("Kids Denim Jacket"), "{err}");
    assert_eq!(store.inventory(plenty.id)?, Some(50));
    assert_eq!(store.inventory(scarce.id)?, Some(1));
    Ok(())
}

#[tokio::test]
async fn repeated_lines_are_checked_against_combined_quantity() -> anyhow::Result<()> {
    let p1 = product("Classic White T-Shirt", money(2999), 3);
    let store = MemoryStore::with_products([p1.clone()]);
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );

    let err = order_service::place_order(
        &state,
        order_request(
            vec![
                line_with_variant(p1.id, 2, "Black", "M"),
                line_with_variant(p1.id, 2, "White", "L"),
            ],
            money(11996),
        ),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InsufficientInventory { .. }));
    assert_eq!(store.inventory(p1.id)?, Some(3));

    let placed = order_service::place_order(
        &state,
        order_request(
            vec![
                line_with_variant(p1.id, 1, "Black", "M"),
                line_with_variant(p1.id, 2, "White", "L"),
            ],
            money(8997),
        ),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(store.inventory(p1.id)?, Some(0));

    let details = order_service::get_order(&state, &placed.order_number).await?.data.unwrap();
    assert_eq!(details.items.len(), 2);
    assert_eq!(
        details.items[1].selected_variant.as_ref().and_then(|v| v.color.as_deref()),
        Some("White")
    );
    Ok(())
}

#[tokio::test]
async fn unavailable_variant_is_a_validation_error() -> anyhow::Result<()> {
    let p1 = product("Classic White T-Shirt", money(2999), 3);
    let store = MemoryStore::with_products([p1.clone()]);
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );

    let err = order_service::place_order(
        &state,
        order_request(vec![line_with_variant(p1.id, 1, "Purple", "M")], money(2999)),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(store.inventory(p1.id)?, Some(3));
    Ok(())
}

#[tokio::test]
async fn declined_payment_releases_reserved_stock() -> anyhow::Result<()> {
    let p1 = product("Test Widget", money(1000), 5);
    let p2 = product("Ferris Mug", money(1200), 4);
    let store = MemoryStore::with_products([p1.clone(), p2.clone()]);
    let notifier = RecordingNotifier::new(NotifierMode::Deliver);
    let state = state_with(&store, FixedGateway::decline(), notifier.clone());

    let err = order_service::place_order(
        &state,
        order_request(vec![line(p1.id, 2), line(p2.id, 1)], money(3200)),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::PaymentDeclined(_)));
    assert_eq!(err.to_string(), "Payment declined by bank");
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(store.inventory(p1.id)?, Some(5));
    assert_eq!(store.inventory(p2.id)?, Some(4));
    assert_eq!(store.order_count()?, 0);

    let failures = notifier.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].reason, "Payment declined by bank");
    assert!(notifier.confirmations().is_empty());
    Ok(())
}

#[tokio::test]
async fn gateway_error_releases_reserved_stock() -> anyhow::Result<()> {
    let p1 = product("Test Widget", money(1000), 5);
    let store = MemoryStore::with_products([p1.clone()]);
    let state = state_with(
        &store,
        FixedGateway::gateway_error(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );

    let err = order_service::place_order(&state, order_request(vec![line(p1.id, 5)], money(5000)))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::PaymentGatewayError(_)));
    assert_eq!(err.to_string(), "Payment gateway error");
    assert_eq!(store.inventory(p1.id)?, Some(5));
    Ok(())
}

#[tokio::test]
async fn failing_notifier_does_not_fail_the_order() -> anyhow::Result<()> {
    let p1 = product("Test Widget", money(1000), 5);
    let store = MemoryStore::with_products([p1.clone()]);
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Fail),
    );

    let placed = order_service::place_order(&state, order_request(vec![line(p1.id, 1)], money(1000)))
        .await?
        .data
        .unwrap();

    assert!(store.find_order(&placed.order_number).await?.is_some());
    assert_eq!(store.inventory(p1.id)?, Some(4));
    Ok(())
}

#[tokio::test]
async fn hanging_notifier_is_cut_off_by_timeout() -> anyhow::Result<()> {
    let p1 = product("Test Widget", money(1000), 5);
    let store = MemoryStore::with_products([p1.clone()]);
    let notifier = RecordingNotifier::new(NotifierMode::Hang);
    let state = state_with(&store, FixedGateway::approve(), notifier.clone());

    let started = std::time::Instant::now();
    let response = order_service::place_order(&state, order_request(vec![line(p1.id, 1)], money(1000)))
        .await?;

    assert!(response.data.is_some());
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(notifier.confirmations().len(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_requests_never_reach_the_catalog() -> anyhow::Result<()> {
    let p1 = product("Test Widget", money(1000), 5);
    let store = MemoryStore::with_products([p1.clone()]);
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );

    let mut bad_card = order_request(vec![line(p1.id, 1)], money(1000));
    bad_card.card_number = "1234".into();
    let mut bad_email = order_request(vec![line(p1.id, 1)], money(1000));
    bad_email.customer_info.email = "not-an-email".into();
    let empty = order_request(Vec::new(), money(0));

    for request in [bad_card, bad_email, empty] {
        let err = order_service::place_order(&state, request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{err:?}");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(store.inventory(p1.id)?, Some(5));
    Ok(())
}

#[tokio::test]
async fn looking_up_unknown_or_blank_order_numbers_fails() {
    let store = MemoryStore::new();
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );

    let err = order_service::get_order(&state, "ORD-0-0").await.unwrap_err();
    assert!(matches!(err, AppError::OrderNotFound));
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

    let err = order_service::get_order(&state, "   ").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lookup_survives_product_removal() -> anyhow::Result<()> {
    let p1 = product("Test Widget", money(1000), 5);
    let store = MemoryStore::with_products([p1.clone()]);
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );

    let placed = order_service::place_order(&state, order_request(vec![line(p1.id, 1)], money(1000)))
        .await?
        .data
        .unwrap();
    store.remove_product(p1.id)?;

    let details = order_service::get_order(&state, &placed.order_number).await?.data.unwrap();
    assert_eq!(details.items[0].product_id, p1.id);
    assert!(details.items[0].product.is_none());
    assert_eq!(details.items[0].price, money(1000));
    Ok(())
}

#[tokio::test]
async fn order_numbers_are_unique() -> anyhow::Result<()> {
    let p1 = product("Rust Sticker Pack", money(500), 1000);
    let store = MemoryStore::with_products([p1.clone()]);
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );

    let mut numbers = HashSet::new();
    for _ in 0..50 {
        let placed = order_service::place_order(&state, order_request(vec![line(p1.id, 1)], money(500)))
            .await?
            .data
            .unwrap();
        assert!(numbers.insert(placed.order_number));
    }
    assert_eq!(store.inventory(p1.id)?, Some(950));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_cannot_oversell() -> anyhow::Result<()> {
    let p1 = product("Limited Edition Hoodie", money(5500), 5);
    let store = MemoryStore::with_products([p1.clone()]);
    let state = state_with(
        &store,
        FixedGateway::approve(),
        RecordingNotifier::new(NotifierMode::Deliver),
    );

    let mut handles = Vec::new();
    for _ in 0..12 {
        let state = state.clone();
        let request = order_request(vec![line(p1.id, 1)], money(5500));
        handles.push(tokio::spawn(async move {
            order_service::place_order(&state, request).await
        }));
    }

    let mut placed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => placed += 1,
            Err(AppError::InsufficientInventory { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(placed, 5);
    assert_eq!(rejected, 7);
    assert_eq!(store.inventory(p1.id)?, Some(0));
    Ok(())
}
