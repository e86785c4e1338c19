use mockall::mock;
use settlement_engine::{
    db_types::{
        CatalogItem,
        DeliveryEvent,
        DeliveryEventId,
        ItemId,
        LedgerEntry,
        NewLedgerEntry,
        NewOrder,
        Order,
        OrderId,
        PaymentOption,
        PaymentOptionId,
        ProfileId,
        ShippingOption,
        ShippingOptionId,
        StockCheck,
    },
    order_objects::OrderQueryFilter,
    traits::{
        CheckoutRequest,
        CheckoutSession,
        ItemService,
        LocationService,
        MarketplaceError,
        PaymentGateway,
        PaymentGatewayError,
        ProfileService,
        SettlementDatabase,
        SettlementDbError,
    },
};

mock! {
    pub SettlementDb {}
    impl Clone for SettlementDb {
        fn clone(&self) -> Self;
    }
    impl SettlementDatabase for SettlementDb {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, SettlementDbError>;
        async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, SettlementDbError>;
        async fn fetch_order_by_session(&self, session_ref: &str) -> Result<Option<Order>, SettlementDbError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, SettlementDbError>;
        async fn update_order(&self, order: &Order) -> Result<Order, SettlementDbError>;
        async fn settle_order(&self, order: &Order, entry: NewLedgerEntry) -> Result<(Order, LedgerEntry), SettlementDbError>;
        async fn fetch_ledger_entry(&self, order_id: OrderId) -> Result<Option<LedgerEntry>, SettlementDbError>;
        async fn ledger_entries_for_seller(&self, seller_id: ProfileId) -> Result<Vec<LedgerEntry>, SettlementDbError>;
    }
}

mock! {
    pub Market {}
    impl Clone for Market {
        fn clone(&self) -> Self;
    }
    impl ItemService for Market {
        async fn item(&self, id: ItemId) -> Result<CatalogItem, MarketplaceError>;
        async fn check_stock(&self, id: ItemId, quantity: i64) -> Result<StockCheck, MarketplaceError>;
        async fn payment_option(&self, id: PaymentOptionId) -> Result<PaymentOption, MarketplaceError>;
    }
    impl ProfileService for Market {
        async fn is_same_profile(&self, a: ProfileId, b: ProfileId) -> Result<bool, MarketplaceError>;
        async fn is_admin(&self, profile: ProfileId) -> Result<bool, MarketplaceError>;
    }
    impl LocationService for Market {
        async fn delivery_event(&self, id: DeliveryEventId) -> Result<DeliveryEvent, MarketplaceError>;
        async fn shipping_option(&self, id: ShippingOptionId) -> Result<ShippingOption, MarketplaceError>;
    }
}

mock! {
    pub Gateway {}
    impl Clone for Gateway {
        fn clone(&self) -> Self;
    }
    impl PaymentGateway for Gateway {
        async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentGatewayError>;
    }
}

/// Profiles are the same if their ids are. Profile 1 is the only admin.
pub fn market_with_profiles() -> MockMarket {
    let mut market = MockMarket::new();
    market.expect_is_same_profile().returning(|a, b| Ok(a == b));
    market.expect_is_admin().returning(|p| Ok(p == ProfileId(1)));
    market
}
