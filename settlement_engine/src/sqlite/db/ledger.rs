use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{LedgerEntry, NewLedgerEntry, OrderId, ProfileId},
    traits::SettlementDbError,
};

/// Appends a ledger entry. A second entry for the same order is refused by the unique index on `order_id`.
pub async fn insert_entry(entry: NewLedgerEntry, conn: &mut SqliteConnection) -> Result<LedgerEntry, SettlementDbError> {
    let order_id = entry.order_id;
    let result = sqlx::query_as(
        r#"
        INSERT INTO ledger_entries (order_id, seller_id, rail, gross, fee, net, currency)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *;
        "#,
    )
    .bind(entry.order_id)
    .bind(entry.seller_id)
    .bind(entry.rail)
    .bind(entry.gross)
    .bind(entry.fee)
    .bind(entry.net)
    .bind(entry.currency)
    .fetch_one(conn)
    .await;
    match result {
        Ok(entry) => {
            debug!("🗃️ Ledger entry written for order {order_id}");
            Ok(entry)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            warn!("🗃️ Refusing a second ledger entry for order {order_id}");
            Err(SettlementDbError::LedgerEntryExists(order_id))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_entry_for_order(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ledger_entries WHERE order_id = $1").bind(order_id).fetch_optional(conn).await
}

pub async fn fetch_entries_for_seller(
    seller_id: ProfileId,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ledger_entries WHERE seller_id = $1 ORDER BY settled_at ASC, id ASC")
        .bind(seller_id)
        .fetch_all(conn)
        .await
}
