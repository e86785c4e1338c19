//! `SqliteDatabase` is the concrete backend that ships with the engine.
//!
//! It stores orders and the ledger, and also answers the marketplace lookups from the collaborator tables that share
//! the same database file.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, ledger, marketplace, new_pool, orders};
use crate::{
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
    traits::{ItemService, LocationService, MarketplaceError, ProfileService, SettlementDatabase, SettlementDbError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `MSE_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        trace!("🗃️ Connection pool created for {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, SettlementDbError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, SettlementDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(id, &mut conn).await?)
    }

    async fn fetch_order_by_session(&self, session_ref: &str) -> Result<Option<Order>, SettlementDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_session(session_ref, &mut conn).await?)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, SettlementDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }

    async fn update_order(&self, order: &Order) -> Result<Order, SettlementDbError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order(order, &mut conn).await
    }

    async fn settle_order(
        &self,
        order: &Order,
        entry: NewLedgerEntry,
    ) -> Result<(Order, LedgerEntry), SettlementDbError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::update_order(order, &mut tx).await?;
        let entry = ledger::insert_entry(entry, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} settled. Ledger entry #{} written", order.id, entry.id);
        Ok((order, entry))
    }

    async fn fetch_ledger_entry(&self, order_id: OrderId) -> Result<Option<LedgerEntry>, SettlementDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledger::fetch_entry_for_order(order_id, &mut conn).await?)
    }

    async fn ledger_entries_for_seller(&self, seller_id: ProfileId) -> Result<Vec<LedgerEntry>, SettlementDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledger::fetch_entries_for_seller(seller_id, &mut conn).await?)
    }

    async fn close(&mut self) -> Result<(), SettlementDbError> {
        self.pool.close().await;
        Ok(())
    }
}

impl ItemService for SqliteDatabase {
    async fn item(&self, id: ItemId) -> Result<CatalogItem, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        marketplace::fetch_item(id, &mut conn).await?.ok_or(MarketplaceError::ItemNotFound(id))
    }

    async fn check_stock(&self, id: ItemId, quantity: i64) -> Result<StockCheck, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let available = marketplace::fetch_stock(id, &mut conn).await?.ok_or(MarketplaceError::ItemNotFound(id))?;
        if available >= quantity {
            Ok(StockCheck::Ok)
        } else {
            Ok(StockCheck::Insufficient { available })
        }
    }

    async fn payment_option(&self, id: PaymentOptionId) -> Result<PaymentOption, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        marketplace::fetch_payment_option(id, &mut conn).await?.ok_or(MarketplaceError::PaymentOptionNotFound(id))
    }
}

impl ProfileService for SqliteDatabase {
    async fn is_same_profile(&self, a: ProfileId, b: ProfileId) -> Result<bool, MarketplaceError> {
        Ok(a == b)
    }

    async fn is_admin(&self, profile: ProfileId) -> Result<bool, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(marketplace::is_admin(profile, &mut conn).await?)
    }
}

impl LocationService for SqliteDatabase {
    async fn delivery_event(&self, id: DeliveryEventId) -> Result<DeliveryEvent, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        marketplace::fetch_delivery_event(id, &mut conn).await?.ok_or(MarketplaceError::DeliveryEventNotFound(id))
    }

    async fn shipping_option(&self, id: ShippingOptionId) -> Result<ShippingOption, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        marketplace::fetch_shipping_option(id, &mut conn).await?.ok_or(MarketplaceError::ShippingOptionNotFound(id))
    }
}
