use futures_util::future::join_all;
use log::*;
use mse_common::Money;
use settlement_engine::{
    db_types::OrderStatusType,
    order_objects::WebhookOutcome,
    test_utils::{seed::insert_ledger_row, test_engine::TestEngine},
    LifecycleError,
    SettlementDatabase,
};

const DELIVERIES: usize = 5;

#[tokio::test]
async fn replayed_webhook_settles_once() {
    let engine = TestEngine::new().await;
    let order = engine.place_and_accept(engine.card_order_request()).await;
    let session = order.checkout_session_ref.clone().unwrap();
    let body = engine.payment_succeeded(&session, Money::from_major(100), "EUR");
    let sig = engine.sign(&body);

    let mut settled = 0;
    for i in 0..DELIVERIES {
        let outcome = engine.api.handle_gateway_webhook(&body, Some(sig.as_str())).await.unwrap();
        info!("🚀️ Delivery {i}: {outcome:?}");
        if matches!(outcome, WebhookOutcome::Settled { .. }) {
            settled += 1;
        }
    }
    assert_eq!(settled, 1);
    let order = engine.reload(order.id).await;
    assert_eq!(order.status, OrderStatusType::Paid);
    let entries = engine.db.ledger_entries_for_seller(order.seller_id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].order_id, order.id);
    engine.teardown().await;
}

#[tokio::test]
async fn concurrent_webhooks_settle_once() {
    let engine = TestEngine::new().await;
    let order = engine.place_and_accept(engine.card_order_request()).await;
    let session = order.checkout_session_ref.clone().unwrap();
    let body = engine.payment_succeeded(&session, Money::from_major(100), "EUR");
    let sig = engine.sign(&body);

    let deliveries = (0..DELIVERIES).map(|_| engine.api.handle_gateway_webhook(&body, Some(sig.as_str())));
    let results = join_all(deliveries).await;
    let settled = results.iter().filter(|r| matches!(r, Ok(WebhookOutcome::Settled { .. }))).count();
    assert_eq!(settled, 1, "{results:?}");
    // The losers are either acknowledged or told to retry. Nothing else.
    for result in &results {
        match result {
            Ok(_) => {},
            Err(e) => assert!(e.is_retryable(), "unexpected error {e}"),
        }
    }
    let entries = engine.db.ledger_entries_for_seller(order.seller_id).await.unwrap();
    assert_eq!(entries.len(), 1);

    // A redelivery after the dust settles is acknowledged
    let outcome = engine.api.handle_gateway_webhook(&body, Some(sig.as_str())).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Acknowledged { .. }));
    engine.teardown().await;
}

#[tokio::test]
async fn failed_ledger_write_leaves_order_unpaid() {
    let engine = TestEngine::new().await;
    let order = engine.place_and_accept(engine.card_order_request()).await;
    let session = order.checkout_session_ref.clone().unwrap();
    // A stray row makes the ledger insert inside the settlement transaction fail
    insert_ledger_row(&engine.db, order.id, order.seller_id, Money::from_major(100)).await;
    let body = engine.payment_succeeded(&session, Money::from_major(100), "EUR");
    let sig = engine.sign(&body);

    let err = engine.api.handle_gateway_webhook(&body, Some(sig.as_str())).await.unwrap_err();
    assert!(matches!(err, LifecycleError::ConflictError(id) if id == order.id), "{err}");
    let reloaded = engine.reload(order.id).await;
    assert_eq!(reloaded.status, OrderStatusType::AwaitingPayment);
    assert!(!reloaded.paid);
    assert_eq!(reloaded.version, order.version);
    let entries = engine.db.ledger_entries_for_seller(order.seller_id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].fee, Money::zero());
    engine.teardown().await;
}
