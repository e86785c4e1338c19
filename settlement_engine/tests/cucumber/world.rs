use cucumber::World;
use settlement_engine::{
    db_types::{Order, OrderId, ProfileId},
    events::EventProducers,
    test_utils::test_engine::TestEngine,
    LifecycleError,
};

#[derive(Default, Debug, World)]
pub struct SettlementWorld {
    pub system: Option<TestEngine>,
    pub order: Option<OrderId>,
    pub last_error: Option<LifecycleError>,
}

impl SettlementWorld {
    pub async fn start(&mut self, fee: &str) {
        if let Some(previous) = self.system.take() {
            previous.teardown().await;
        }
        self.system = Some(TestEngine::with_fee(fee, EventProducers::default()).await);
    }

    pub fn engine(&self) -> &TestEngine {
        self.system.as_ref().expect("The marketplace has not been started")
    }

    pub fn order_id(&self) -> OrderId {
        self.order.expect("No order has been placed")
    }

    pub async fn order(&self) -> Order {
        self.engine().reload(self.order_id()).await
    }

    /// Maps the names used in feature files onto the fixture profiles.
    pub fn profile(&self, who: &str) -> ProfileId {
        let m = &self.engine().market;
        match who {
            "buyer" => m.buyer,
            "seller" => m.seller,
            "stranger" => m.stranger,
            "admin" => m.admin,
            _ => panic!("Unknown profile {who}"),
        }
    }

    pub fn record<T>(&mut self, result: Result<T, LifecycleError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                self.last_error = Some(e);
                None
            },
        }
    }
}
