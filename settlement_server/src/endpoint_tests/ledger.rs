use actix_web::{http::StatusCode, web, web::ServiceConfig};
use mse_common::Money;
use settlement_engine::{
    db_types::{LedgerEntry, OrderStatusType, ProfileId},
    order_flow::PaymentRail,
    LedgerApi,
    SellerStatement,
};

use super::{
    helpers::*,
    mocks::{market_with_profiles, MockMarket, MockSettlementDb},
};
use crate::{
    config::ServerOptions,
    routes::{LedgerEntryForOrderRoute, SellerStatementRoute},
};

#[actix_web::test]
async fn buyer_sees_the_ledger_entry_of_their_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Some(BUYER), "/orders/2/ledger", configure).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let entry: LedgerEntry = serde_json::from_str(&body).unwrap();
    assert_eq!(entry.gross, Money::from_major(100));
    assert_eq!(entry.fee, Money::from_major(5));
    assert_eq!(entry.net, Money::from_major(95));
}

#[actix_web::test]
async fn unsettled_orders_have_no_ledger_entry() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Some(BUYER), "/orders/1/ledger", configure).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "The data was not found. Order #1 has not been settled");
}

#[actix_web::test]
async fn seller_statement_totals() {
    let _ = env_logger::try_init().ok();
    let path = format!("/sellers/{SELLER}/ledger");
    let (status, body) = get_request(Some(SELLER), &path, configure).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let statement: SellerStatement = serde_json::from_str(&body).unwrap();
    assert_eq!(statement.seller_id, ProfileId(SELLER));
    assert_eq!(statement.entries.len(), 2);
    assert_eq!(statement.total_gross, Money::from_major(200));
    assert_eq!(statement.total_fees, Money::from_major(10));
    assert_eq!(statement.total_net, Money::from_major(190));
}

#[actix_web::test]
async fn buyers_cannot_read_seller_statements() {
    let _ = env_logger::try_init().ok();
    let path = format!("/sellers/{SELLER}/ledger");
    let (status, body) = get_request(Some(BUYER), &path, configure).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_message(&body), "Insufficient Permissions. You may only view your own ledger");
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|id| {
        Ok(match id.value() {
            1 => Some(order(1, OrderStatusType::AwaitingPayment, PaymentRail::Manual)),
            2 => Some(order(2, OrderStatusType::Paid, PaymentRail::Manual)),
            _ => None,
        })
    });
    db.expect_fetch_ledger_entry().returning(|id| {
        Ok(match id.value() {
            2 => Some(ledger_entry(&order(2, OrderStatusType::Paid, PaymentRail::Manual))),
            _ => None,
        })
    });
    db.expect_ledger_entries_for_seller().returning(|_| {
        Ok(vec![
            ledger_entry(&order(2, OrderStatusType::Paid, PaymentRail::Manual)),
            ledger_entry(&order(5, OrderStatusType::Completed, PaymentRail::Automated)),
        ])
    });
    let api = LedgerApi::new(db, market_with_profiles());
    cfg.service(LedgerEntryForOrderRoute::<MockSettlementDb, MockMarket>::new())
        .service(SellerStatementRoute::<MockSettlementDb, MockMarket>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(ServerOptions::default()));
}
