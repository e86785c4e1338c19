use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use mse_common::Money;
use serde_json::json;
use settlement_engine::{
    db_types::{CatalogItem, ItemId, Order, OrderId, OrderStatusType, PaymentOptionId, ProfileId, StockCheck},
    order_flow::PaymentRail,
    traits::{PaymentGatewayError, SettlementDbError},
};

use super::{
    helpers::*,
    mocks::{market_with_profiles, MockGateway, MockMarket, MockSettlementDb},
};
use crate::{
    config::ServerOptions,
    routes::{
        health,
        AcceptOrderRoute,
        CancelOrderRoute,
        ConfirmPaymentRoute,
        CreateOrderRoute,
        OrderByIdRoute,
        SearchOrdersRoute,
        UpdateDeliveryDateRoute,
    },
    server::json_config,
};

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(None, "/health", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn fetch_order_as_buyer() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Some(BUYER), "/orders/1", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.id, OrderId(1));
    assert_eq!(order.status, OrderStatusType::Created);
    assert_eq!(order.lines.len(), 1);
}

#[actix_web::test]
async fn fetch_order_as_admin() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(Some(ADMIN), "/orders/2", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn fetch_order_without_caller() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(None, "/orders/1", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&body), "No caller profile was supplied. The X-Profile-Id header is required");
}

#[actix_web::test]
async fn fetch_order_as_stranger() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Some(STRANGER), "/orders/1", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_message(&body), "Insufficient Permissions. profile:300 may not act on order #1");
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Some(BUYER), "/orders/99", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "The data was not found. Order #99 does not exist");
}

#[actix_web::test]
async fn paid_orders_cannot_be_cancelled() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Some(BUYER), "/orders/2/cancel", json!({}), configure).await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_message(&body), "Cannot cancel an order that is PAID");
}

#[actix_web::test]
async fn buyer_cancels_new_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Some(BUYER), "/orders/1/cancel", json!({}), configure).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert_eq!(order.version, 4);
}

#[actix_web::test]
async fn orders_need_line_items() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "lines": [], "delivery_event_id": 1, "payment_option_id": 1 });
    let (status, body) = post_request(Some(BUYER), "/orders", body, configure).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Invalid request. An order needs at least one line item");
}

#[actix_web::test]
async fn malformed_order_body() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "lines": "two widgets please" });
    let (status, body) = post_request(Some(BUYER), "/orders", body, configure).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).starts_with("Could not read request body"));
}

#[actix_web::test]
async fn seller_accepts_while_gateway_is_down() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Some(SELLER), "/orders/1/accept", json!({}), configure).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.status, OrderStatusType::Accepted);
    assert_eq!(order.checkout_session_ref, None);
}

#[actix_web::test]
async fn acceptance_stands_when_payment_cannot_be_requested() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Some(SELLER), "/orders/3/accept", json!({}), configure).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.id, OrderId(3));
    assert_eq!(order.status, OrderStatusType::Accepted);
    assert_eq!(order.rail, PaymentRail::Manual);
}

#[actix_web::test]
async fn buyer_cannot_accept() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Some(BUYER), "/orders/1/accept", json!({}), configure).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_message(&body), "Insufficient Permissions. Only the seller of order #1 may accept it");
}

#[actix_web::test]
async fn search_own_orders() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Some(BUYER), "/orders?status=created", configure).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].buyer_id, ProfileId(BUYER));
}

#[actix_web::test]
async fn search_someone_elses_orders() {
    let _ = env_logger::try_init().ok();
    let path = format!("/orders?seller_id={SELLER}");
    let (status, _) = get_request(Some(STRANGER), &path, configure).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn search_with_unknown_status() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Some(BUYER), "/orders?status=paid,shipped", configure).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Could not read request query: Invalid order status: shipped");
}

#[actix_web::test]
async fn confirmations_need_a_known_party() {
    let _ = env_logger::try_init().ok();
    let (status, _) = post_request(Some(BUYER), "/orders/1/payment/courier", json!({}), configure).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn card_orders_cannot_be_confirmed_manually() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Some(BUYER), "/orders/1/payment/buyer", json!({}), configure).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(&body),
        "Invalid request. Order #1 is paid through the payment gateway and cannot be confirmed manually"
    );
}

#[actix_web::test]
async fn delivery_date_cannot_be_set_before_acceptance() {
    let _ = env_logger::try_init().ok();
    let req = with_caller(TestRequest::put().uri("/orders/1/delivery_date"), Some(SELLER))
        .set_json(json!({ "estimated_delivery_date": "2026-11-02" }));
    let (status, body) = send_request(req, configure).await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_message(&body), "Cannot update the delivery date of an order that is CREATED");
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|id| {
        Ok(match id.value() {
            1 => Some(order(1, OrderStatusType::Created, PaymentRail::Automated)),
            2 => Some(order(2, OrderStatusType::Paid, PaymentRail::Manual)),
            3 => Some(order(3, OrderStatusType::Created, PaymentRail::Manual)),
            _ => None,
        })
    });
    db.expect_update_order().returning(bump_version);
    db.expect_search_orders().returning(|filter| {
        let mine = filter.participant == Some(ProfileId(BUYER)) || filter.buyer_id == Some(ProfileId(BUYER));
        Ok(if mine { vec![order(1, OrderStatusType::Created, PaymentRail::Automated)] } else { vec![] })
    });
    let mut settlement_db = MockSettlementDb::new();
    settlement_db.expect_update_order().returning(|order| match order.id.value() {
        3 => Err(SettlementDbError::DatabaseError("disk I/O error".into())),
        _ => bump_version(order),
    });
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_checkout_session()
        .returning(|_| Err(PaymentGatewayError::Unavailable("connection refused".into())));
    let api = order_flow_api(db, settlement_db, catalog(), gateway);
    cfg.service(health)
        .service(CreateOrderRoute::<MockSettlementDb, MockMarket, MockGateway>::new())
        .service(SearchOrdersRoute::<MockSettlementDb, MockMarket, MockGateway>::new())
        .service(OrderByIdRoute::<MockSettlementDb, MockMarket, MockGateway>::new())
        .service(AcceptOrderRoute::<MockSettlementDb, MockMarket, MockGateway>::new())
        .service(CancelOrderRoute::<MockSettlementDb, MockMarket, MockGateway>::new())
        .service(ConfirmPaymentRoute::<MockSettlementDb, MockMarket, MockGateway>::new())
        .service(UpdateDeliveryDateRoute::<MockSettlementDb, MockMarket, MockGateway>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(ServerOptions::default()))
        .app_data(json_config());
}

/// Item 10 belongs to the seller, costs 50.00 and is always in stock.
fn catalog() -> MockMarket {
    let mut market = market_with_profiles();
    market.expect_item().returning(|id| {
        Ok(CatalogItem {
            id,
            owner_id: ProfileId(SELLER),
            title: "Sourdough loaf".into(),
            price: Money::from_major(50),
            currency: "EUR".into(),
            accepted_payment_options: vec![PaymentOptionId(1)],
        })
    });
    market.expect_check_stock().returning(|_: ItemId, _| Ok(StockCheck::Ok));
    market
}

fn bump_version(order: &Order) -> Result<Order, SettlementDbError> {
    let mut order = order.clone();
    order.version += 1;
    Ok(order)
}
