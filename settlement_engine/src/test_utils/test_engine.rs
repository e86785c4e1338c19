//! A fully wired engine on a throwaway SQLite database.
use mse_common::{Money, Secret};
use serde_json::json;

use crate::{
    db_types::{Order, OrderId},
    events::EventProducers,
    helpers::WebhookVerifier,
    order_flow::{FeeCalculator, FeeRate, RailRegistry},
    order_objects::OrderRequest,
    test_utils::{
        prepare_env::{drop_database, prepare_test_env, random_db_path},
        seed::MarketFixture,
        test_gateway::TestGateway,
    },
    LedgerApi,
    OrderFlowApi,
    SettlementApi,
    SqliteDatabase,
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_marketplace_tests";
pub const TEST_CURRENCY: &str = "EUR";

pub type TestOrderFlowApi = OrderFlowApi<SqliteDatabase, SqliteDatabase, TestGateway>;

#[derive(Debug)]
pub struct TestEngine {
    pub url: String,
    pub db: SqliteDatabase,
    pub api: TestOrderFlowApi,
    pub ledger: LedgerApi<SqliteDatabase, SqliteDatabase>,
    pub gateway: TestGateway,
    pub market: MarketFixture,
    verifier: WebhookVerifier,
}

impl TestEngine {
    /// A 5% platform fee and no event subscribers.
    pub async fn new() -> Self {
        Self::with_fee("0.05", EventProducers::default()).await
    }

    pub async fn with_fee(fee: &str, producers: EventProducers) -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database");
        let market = MarketFixture::seed(&db).await;
        let gateway = TestGateway::new();
        let rate: FeeRate = fee.parse().expect("Invalid test fee rate");
        let verifier = WebhookVerifier::new(Secret::new(TEST_WEBHOOK_SECRET.to_string()));
        let settlement = SettlementApi::new(
            db.clone(),
            gateway.clone(),
            FeeCalculator::new(rate),
            verifier.clone(),
            producers.clone(),
        );
        let api = OrderFlowApi::new(
            db.clone(),
            db.clone(),
            settlement,
            RailRegistry::default(),
            TEST_CURRENCY.to_string(),
            producers,
        );
        let ledger = LedgerApi::new(db.clone(), db.clone());
        Self { url, db, api, ledger, gateway, market, verifier }
    }

    /// Two widgets for the fixture buyer, collected at the fixture delivery event and paid by card.
    pub fn card_order_request(&self) -> OrderRequest {
        OrderRequest::new(self.market.delivery_event, self.market.card).with_line(self.market.widget, 2)
    }

    /// Like [`card_order_request`](Self::card_order_request), paid by bank transfer.
    pub fn transfer_order_request(&self) -> OrderRequest {
        OrderRequest::new(self.market.delivery_event, self.market.bank_transfer).with_line(self.market.widget, 2)
    }

    pub async fn place(&self, request: OrderRequest) -> Order {
        self.api.create_order(self.market.buyer, request).await.expect("Error creating order")
    }

    pub async fn place_and_accept(&self, request: OrderRequest) -> Order {
        let order = self.place(request).await;
        self.api
            .accept_order(self.market.seller, order.id, Default::default())
            .await
            .expect("Error accepting order")
    }

    pub async fn reload(&self, id: OrderId) -> Order {
        self.api.fetch_order(self.market.admin, id).await.expect("Error fetching order")
    }

    /// A `payment.succeeded` event body for `session_ref`.
    pub fn payment_succeeded(&self, session_ref: &str, amount: Money, currency: &str) -> Vec<u8> {
        gateway_event("payment.succeeded", session_ref, Some(amount), Some(currency))
    }

    pub fn sign(&self, body: &[u8]) -> String {
        self.verifier.sign(body).expect("Error signing webhook")
    }

    pub async fn teardown(self) {
        self.db.pool().close().await;
        drop_database(&self.url).await;
    }
}

pub fn gateway_event(event_type: &str, session_ref: &str, amount: Option<Money>, currency: Option<&str>) -> Vec<u8> {
    let event = json!({
        "id": format!("evt_{}", rand::random::<u32>()),
        "type": event_type,
        "data": {
            "session_ref": session_ref,
            "amount": amount,
            "currency": currency,
        }
    });
    event.to_string().into_bytes()
}
