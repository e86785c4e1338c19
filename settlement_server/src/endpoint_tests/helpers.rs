use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use log::debug;
use mse_common::{Money, Secret};
use settlement_engine::{
    db_types::{DeliveryEventId, ItemId, LedgerEntry, Order, OrderId, OrderLine, OrderStatusType, PaymentOptionId, ProfileId},
    events::EventProducers,
    helpers::WebhookVerifier,
    order_flow::{FeeCalculator, FeeRate, PaymentRail, RailRegistry},
    OrderFlowApi,
    SettlementApi,
};

use super::mocks::{MockGateway, MockMarket, MockSettlementDb};

pub const BUYER: i64 = 100;
pub const SELLER: i64 = 200;
pub const STRANGER: i64 = 300;
pub const ADMIN: i64 = 1;
pub const TEST_WEBHOOK_SECRET: &str = "whsec_endpoint_tests";

pub type MockOrderFlowApi = OrderFlowApi<MockSettlementDb, MockMarket, MockGateway>;

/// `db` serves the order flow and `settlement_db` the settlement API, so each can carry its own expectations.
pub fn order_flow_api(
    db: MockSettlementDb,
    settlement_db: MockSettlementDb,
    market: MockMarket,
    gateway: MockGateway,
) -> MockOrderFlowApi {
    let fees = FeeCalculator::new(FeeRate::from_basis_points(500).unwrap());
    let verifier = WebhookVerifier::new(Secret::new(TEST_WEBHOOK_SECRET.to_string()));
    let producers = EventProducers::default();
    let settlement = SettlementApi::new(settlement_db, gateway, fees, verifier, producers.clone());
    OrderFlowApi::new(db, market, settlement, RailRegistry::default(), "EUR".into(), producers)
}

pub fn sign(body: &[u8]) -> String {
    WebhookVerifier::new(Secret::new(TEST_WEBHOOK_SECRET.to_string())).sign(body).unwrap()
}

/// Two items at 50.00 between [`BUYER`] and [`SELLER`].
pub fn order(id: i64, status: OrderStatusType, rail: PaymentRail) -> Order {
    let created = Utc.with_ymd_and_hms(2026, 10, 1, 9, 30, 0).unwrap();
    Order {
        id: OrderId(id),
        buyer_id: ProfileId(BUYER),
        seller_id: ProfileId(SELLER),
        delivery_event_id: DeliveryEventId(1),
        shipping_option_id: None,
        home_delivery: false,
        comment: None,
        payment_option_id: PaymentOptionId(1),
        selected_payment_option_id: None,
        rail,
        currency: "EUR".into(),
        shipping_price: Money::zero(),
        estimated_delivery_date: None,
        status,
        buyer_delivery_confirmed: false,
        seller_delivery_confirmed: false,
        buyer_payment_confirmed: false,
        seller_payment_confirmed: false,
        checkout_session_ref: None,
        checkout_url: None,
        paid: status.is_settled(),
        version: 3,
        created_at: created,
        updated_at: created,
        lines: vec![OrderLine {
            order_id: OrderId(id),
            position: 0,
            item_id: ItemId(10),
            quantity: 2,
            unit_price: Money::from_major(50),
        }],
    }
}

pub fn ledger_entry(order: &Order) -> LedgerEntry {
    LedgerEntry {
        id: order.id.value(),
        order_id: order.id,
        seller_id: order.seller_id,
        rail: order.rail,
        gross: Money::from_major(100),
        fee: Money::from_major(5),
        net: Money::from_major(95),
        currency: order.currency.clone(),
        settled_at: order.updated_at,
    }
}

pub async fn send_request(req: TestRequest, configure: fn(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    let req = req.to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub fn with_caller(req: TestRequest, caller: Option<i64>) -> TestRequest {
    match caller {
        Some(id) => req.insert_header(("X-Profile-Id", id.to_string())),
        None => req,
    }
}

pub async fn get_request(
    caller: Option<i64>,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    send_request(with_caller(TestRequest::get().uri(path), caller), configure).await
}

pub async fn post_request(
    caller: Option<i64>,
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    send_request(with_caller(TestRequest::post().uri(path).set_json(body), caller), configure).await
}

pub fn error_message(body: &str) -> String {
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    json["error"].as_str().unwrap().to_string()
}
