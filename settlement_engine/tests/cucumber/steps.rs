use std::str::FromStr;

use cucumber::{given, then, when};
use mse_common::{Money, Secret};
use settlement_engine::{
    db_types::OrderStatusType,
    helpers::WebhookVerifier,
    order_flow::Party,
    order_objects::{AcceptOrderRequest, OrderRequest},
    test_utils::test_engine::gateway_event,
    LifecycleError,
    SettlementDatabase,
};

use crate::cucumber::SettlementWorld;

fn party(name: &str) -> Party {
    match name {
        "buyer" => Party::Buyer,
        "seller" => Party::Seller,
        _ => panic!("Unknown party {name}"),
    }
}

fn money(s: &str) -> Money {
    Money::from_str(s).expect("Not a valid amount")
}

#[given(expr = "a marketplace charging a platform fee of {word}")]
async fn start_marketplace(world: &mut SettlementWorld, fee: String) {
    world.start(&fee).await;
}

#[given("the payment gateway is offline")]
async fn gateway_offline(world: &mut SettlementWorld) {
    world.engine().gateway.set_offline(true);
}

#[when("the payment gateway comes back online")]
async fn gateway_online(world: &mut SettlementWorld) {
    world.engine().gateway.set_offline(false);
}

#[when(expr = "the buyer orders {int} widget(s) paying by {word}")]
async fn order_widgets(world: &mut SettlementWorld, quantity: i64, method: String) {
    let m = world.engine().market.clone();
    let option = match method.as_str() {
        "card" => m.card,
        "bank_transfer" => m.bank_transfer,
        _ => panic!("Unknown payment method {method}"),
    };
    let request = OrderRequest::new(m.delivery_event, option).with_line(m.widget, quantity);
    let result = world.engine().api.create_order(m.buyer, request).await;
    if let Some(order) = world.record(result) {
        world.order = Some(order.id);
    }
}

#[when(expr = "the {word} accepts the order")]
async fn accept_order(world: &mut SettlementWorld, who: String) {
    let caller = world.profile(&who);
    let result = world.engine().api.accept_order(caller, world.order_id(), AcceptOrderRequest::default()).await;
    world.record(result);
}

#[when(expr = "the {word} rejects the order")]
async fn reject_order(world: &mut SettlementWorld, who: String) {
    let caller = world.profile(&who);
    let result = world.engine().api.reject_order(caller, world.order_id()).await;
    world.record(result);
}

#[when(expr = "the {word} cancels the order")]
async fn cancel_order(world: &mut SettlementWorld, who: String) {
    let caller = world.profile(&who);
    let result = world.engine().api.cancel_order(caller, world.order_id()).await;
    world.record(result);
}

#[when(expr = "the {word} confirms payment as {word}")]
async fn confirm_payment(world: &mut SettlementWorld, who: String, as_party: String) {
    let caller = world.profile(&who);
    let result = world.engine().api.confirm_payment(caller, world.order_id(), party(&as_party)).await;
    world.record(result);
}

#[when(expr = "the {word} confirms delivery as {word}")]
async fn confirm_delivery(world: &mut SettlementWorld, who: String, as_party: String) {
    let caller = world.profile(&who);
    let result = world.engine().api.confirm_delivery(caller, world.order_id(), party(&as_party)).await;
    world.record(result);
}

#[when(expr = "the {word} asks for a checkout session")]
async fn initiate_checkout(world: &mut SettlementWorld, who: String) {
    let caller = world.profile(&who);
    let result = world.engine().api.initiate_checkout(caller, world.order_id()).await;
    world.record(result);
}

#[when(expr = "the gateway reports a payment of {word} {word}")]
async fn gateway_payment(world: &mut SettlementWorld, amount: String, currency: String) {
    let order = world.order().await;
    let session = order.checkout_session_ref.expect("The order has no checkout session");
    let engine = world.engine();
    let body = engine.payment_succeeded(&session, money(&amount), &currency);
    let sig = engine.sign(&body);
    let result = engine.api.handle_gateway_webhook(&body, Some(sig.as_str())).await;
    world.record(result);
}

#[when(expr = "a forged gateway payment of {word} {word} arrives")]
async fn forged_payment(world: &mut SettlementWorld, amount: String, currency: String) {
    let order = world.order().await;
    let session = order.checkout_session_ref.expect("The order has no checkout session");
    let body = gateway_event("payment.succeeded", &session, Some(money(&amount)), Some(&currency));
    let forger = WebhookVerifier::new(Secret::new("whsec_guessed".to_string()));
    let sig = forger.sign(&body).unwrap();
    let result = world.engine().api.handle_gateway_webhook(&body, Some(sig.as_str())).await;
    world.record(result);
}

#[then(expr = "the order is {word}")]
async fn order_status(world: &mut SettlementWorld, status: String) {
    let expected = OrderStatusType::from_str(&status).expect("Unknown status");
    assert_eq!(world.order().await.status, expected);
}

#[then("the operation succeeds")]
async fn operation_succeeds(world: &mut SettlementWorld) {
    assert!(world.last_error.is_none(), "Unexpected error: {:?}", world.last_error);
}

#[then(expr = "the operation fails with {word}")]
async fn operation_fails(world: &mut SettlementWorld, kind: String) {
    let err = world.last_error.as_ref().expect("The last operation succeeded");
    let matched = match kind.as_str() {
        "ValidationError" => matches!(err, LifecycleError::ValidationError(_)),
        "AuthorizationError" => matches!(err, LifecycleError::AuthorizationError(_)),
        "InvalidStateError" => matches!(err, LifecycleError::InvalidStateError { .. }),
        "ConflictError" => matches!(err, LifecycleError::ConflictError(_)),
        "GatewayVerificationError" => matches!(err, LifecycleError::GatewayVerificationError(_)),
        "GatewayError" => matches!(err, LifecycleError::GatewayError(_)),
        "NotFoundError" => matches!(err, LifecycleError::NotFoundError(_)),
        _ => panic!("Unknown error kind {kind}"),
    };
    assert!(matched, "Expected {kind}, got {err:?}");
}

#[then(expr = "the seller has {int} ledger entry/entries")]
async fn ledger_count(world: &mut SettlementWorld, count: usize) {
    let engine = world.engine();
    let entries = engine.db.ledger_entries_for_seller(engine.market.seller).await.unwrap();
    assert_eq!(entries.len(), count);
}

#[then(expr = "the ledger shows gross {word}, fee {word} and net {word}")]
async fn ledger_amounts(world: &mut SettlementWorld, gross: String, fee: String, net: String) {
    let engine = world.engine();
    let entry = engine.db.fetch_ledger_entry(world.order_id()).await.unwrap().expect("The order has no ledger entry");
    assert_eq!(entry.gross, money(&gross));
    assert_eq!(entry.fee, money(&fee));
    assert_eq!(entry.net, money(&net));
}

#[then(expr = "the gateway was called {int} time(s)")]
async fn gateway_calls(world: &mut SettlementWorld, calls: usize) {
    assert_eq!(world.engine().gateway.calls(), calls);
}
