use thiserror::Error;

use crate::{
    db_types::{LedgerEntry, NewLedgerEntry, NewOrder, Order, OrderId, ProfileId},
    order_objects::OrderQueryFilter,
};

/// The storage contract for orders and the settlement ledger.
///
/// Every write that changes an existing order is guarded by the order's `version`. Implementations must reject the
/// write with [`SettlementDbError::VersionConflict`] when the stored version no longer matches the one on the
/// in-memory order, and must bump the version on success.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order and its lines in one transaction. The order starts out `Created` at version 0.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, SettlementDbError>;

    /// Fetches the order, including its lines.
    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, SettlementDbError>;

    /// Resolves an order from the checkout session that the gateway reports on.
    async fn fetch_order_by_session(&self, session_ref: &str) -> Result<Option<Order>, SettlementDbError>;

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, SettlementDbError>;

    /// Writes the mutable fields of `order` (status, flags, payment option, rail, dates, session) back to storage,
    /// provided the stored version still equals `order.version`. Returns the stored order with its new version.
    async fn update_order(&self, order: &Order) -> Result<Order, SettlementDbError>;

    /// Atomically writes the `Paid` order (same version check as [`update_order`](Self::update_order)) and appends
    /// its ledger entry. Either both happen or neither does.
    async fn settle_order(&self, order: &Order, entry: NewLedgerEntry) -> Result<(Order, LedgerEntry), SettlementDbError>;

    async fn fetch_ledger_entry(&self, order_id: OrderId) -> Result<Option<LedgerEntry>, SettlementDbError>;

    async fn ledger_entries_for_seller(&self, seller_id: ProfileId) -> Result<Vec<LedgerEntry>, SettlementDbError>;

    async fn close(&mut self) -> Result<(), SettlementDbError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettlementDbError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} has been modified since it was read")]
    VersionConflict(OrderId),
    #[error("A ledger entry for order {0} already exists")]
    LedgerEntryExists(OrderId),
}

impl From<sqlx::Error> for SettlementDbError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
