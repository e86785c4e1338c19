use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::json;
use settlement_engine::{
    db_types::{Order, OrderStatusType},
    order_flow::PaymentRail,
    order_objects::WebhookOutcome,
    traits::SettlementDbError,
};

use super::{
    helpers::*,
    mocks::{MockGateway, MockMarket, MockSettlementDb},
};
use crate::{config::ServerOptions, routes::GatewayWebhookRoute};

fn event(event_type: &str, session_ref: &str, amount: i64, currency: &str) -> Vec<u8> {
    json!({
        "id": format!("evt_{session_ref}"),
        "type": event_type,
        "data": { "session_ref": session_ref, "amount": amount, "currency": currency }
    })
    .to_string()
    .into_bytes()
}

async fn deliver(body: Vec<u8>, signature: Option<String>) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri("/webhook/gateway").insert_header(("Content-Type", "application/json"));
    if let Some(sig) = signature {
        req = req.insert_header(("X-Gateway-Signature", sig));
    }
    send_request(req.set_payload(body), configure).await.expect("Request failed")
}

#[actix_web::test]
async fn unsigned_webhooks_are_rejected() {
    let _ = env_logger::try_init().ok();
    let body = event("payment.succeeded", "cs_paid", 10_000, "EUR");
    let (status, body) = deliver(body, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).starts_with("Gateway event rejected."));
}

#[actix_web::test]
async fn tampered_webhooks_are_rejected() {
    let _ = env_logger::try_init().ok();
    let body = event("payment.succeeded", "cs_paid", 10_000, "EUR");
    let signature = sign(&body);
    let tampered = event("payment.succeeded", "cs_paid", 1, "EUR");
    let (status, _) = deliver(tampered, Some(signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn failed_payments_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = event("payment.failed", "cs_paid", 10_000, "EUR");
    let signature = sign(&body);
    let (status, body) = deliver(body, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: WebhookOutcome = serde_json::from_str(&body).unwrap();
    assert!(matches!(outcome, WebhookOutcome::Acknowledged { .. }));
}

#[actix_web::test]
async fn successful_payment_settles_the_order() {
    let _ = env_logger::try_init().ok();
    let body = event("payment.succeeded", "cs_paid", 10_000, "EUR");
    let signature = sign(&body);
    let (status, body) = deliver(body, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    match serde_json::from_str::<WebhookOutcome>(&body).unwrap() {
        WebhookOutcome::Settled { order, ledger_entry } => {
            assert_eq!(order.status, OrderStatusType::Paid);
            assert!(order.paid);
            assert_eq!(ledger_entry.fee.value(), 500);
            assert_eq!(ledger_entry.net.value(), 9_500);
        },
        other => panic!("Expected the order to settle, got {other:?}"),
    }
}

#[actix_web::test]
async fn underpayments_are_refused() {
    let _ = env_logger::try_init().ok();
    let body = event("payment.succeeded", "cs_paid", 9_999, "EUR");
    let signature = sign(&body);
    let (status, body) = deliver(body, Some(signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Invalid request. Paid amount does not match the order total of 100.00");
}

#[actix_web::test]
async fn racing_writes_ask_the_gateway_to_redeliver() {
    let _ = env_logger::try_init().ok();
    let body = event("payment.succeeded", "cs_race", 10_000, "EUR");
    let signature = sign(&body);
    let (status, body) = deliver(body, Some(signature)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_message(&body), "Order #7 was modified concurrently. Re-fetch it and try again");
}

fn awaiting_payment(id: i64, session_ref: &str) -> Order {
    let mut order = order(id, OrderStatusType::AwaitingPayment, PaymentRail::Automated);
    order.checkout_session_ref = Some(session_ref.to_string());
    order.checkout_url = Some(format!("https://pay.example.test/{session_ref}"));
    order
}

fn configure(cfg: &mut ServiceConfig) {
    let mut settlement_db = MockSettlementDb::new();
    settlement_db.expect_fetch_order_by_session().returning(|session_ref| {
        Ok(match session_ref {
            "cs_paid" => Some(awaiting_payment(6, "cs_paid")),
            "cs_race" => Some(awaiting_payment(7, "cs_race")),
            _ => None,
        })
    });
    settlement_db.expect_settle_order().returning(|order, _| {
        if order.checkout_session_ref.as_deref() == Some("cs_race") {
            return Err(SettlementDbError::VersionConflict(order.id));
        }
        let mut order = order.clone();
        order.version += 1;
        let entry = ledger_entry(&order);
        Ok((order, entry))
    });
    // The competing write has not landed yet, so the order still looks unpaid
    settlement_db.expect_fetch_order().returning(|id| Ok(Some(awaiting_payment(id.value(), "cs_race"))));
    let api = order_flow_api(MockSettlementDb::new(), settlement_db, MockMarket::new(), MockGateway::new());
    cfg.service(GatewayWebhookRoute::<MockSettlementDb, MockMarket, MockGateway>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(ServerOptions::default()));
}
