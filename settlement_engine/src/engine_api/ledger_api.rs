use std::fmt::Debug;

use log::*;
use mse_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{LedgerEntry, OrderId, ProfileId},
    engine_api::errors::LifecycleError,
    traits::{ProfileService, SettlementDatabase},
};

/// Read access to the settlement ledger.
pub struct LedgerApi<B, P> {
    db: B,
    profiles: P,
}

impl<B, P> Debug for LedgerApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

/// A seller's settled entries together with their totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerStatement {
    pub seller_id: ProfileId,
    pub total_gross: Money,
    pub total_fees: Money,
    pub total_net: Money,
    pub entries: Vec<LedgerEntry>,
}

impl SellerStatement {
    pub fn new(seller_id: ProfileId, entries: Vec<LedgerEntry>) -> Self {
        let total_gross = entries.iter().map(|e| e.gross).sum();
        let total_fees = entries.iter().map(|e| e.fee).sum();
        let total_net = entries.iter().map(|e| e.net).sum();
        Self { seller_id, total_gross, total_fees, total_net, entries }
    }
}

impl<B, P> LedgerApi<B, P> {
    pub fn new(db: B, profiles: P) -> Self {
        Self { db, profiles }
    }
}

impl<B, P> LedgerApi<B, P>
where
    B: SettlementDatabase,
    P: ProfileService,
{
    /// The ledger entry for an order. Visible to the order's buyer, its seller and admins.
    pub async fn entry_for_order(&self, caller: ProfileId, order_id: OrderId) -> Result<LedgerEntry, LifecycleError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| LifecycleError::order_not_found(order_id))?;
        let is_party = self.profiles.is_same_profile(caller, order.buyer_id).await? ||
            self.profiles.is_same_profile(caller, order.seller_id).await?;
        if !is_party && !self.profiles.is_admin(caller).await? {
            return Err(LifecycleError::AuthorizationError(format!("{caller} may not view order {order_id}")));
        }
        self.db
            .fetch_ledger_entry(order_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFoundError(format!("Order {order_id} has not been settled")))
    }

    /// Every entry for `seller_id`, oldest first, with totals. Visible to that seller and admins.
    pub async fn statement_for_seller(
        &self,
        caller: ProfileId,
        seller_id: ProfileId,
    ) -> Result<SellerStatement, LifecycleError> {
        if !self.profiles.is_same_profile(caller, seller_id).await? && !self.profiles.is_admin(caller).await? {
            warn!("💸️ {caller} asked for the ledger of {seller_id}");
            return Err(LifecycleError::AuthorizationError("You may only view your own ledger".into()));
        }
        let entries = self.db.ledger_entries_for_seller(seller_id).await?;
        debug!("💸️ {} ledger entries for {seller_id}", entries.len());
        Ok(SellerStatement::new(seller_id, entries))
    }
}
