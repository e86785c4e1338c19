use log::*;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderLine},
    order_objects::OrderQueryFilter,
    traits::SettlementDbError,
};

/// The layout of `CURRENT_TIMESTAMP`, so that range filters compare like with like.
const SQLITE_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// Inserts the order and its lines. Not atomic on its own: call it inside a transaction.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SettlementDbError> {
    let mut stored: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                buyer_id,
                seller_id,
                delivery_event_id,
                shipping_option_id,
                home_delivery,
                comment,
                payment_option_id,
                rail,
                currency,
                shipping_price
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(order.buyer_id)
    .bind(order.seller_id)
    .bind(order.delivery_event_id)
    .bind(order.shipping_option_id)
    .bind(order.home_delivery)
    .bind(order.comment)
    .bind(order.payment_option_id)
    .bind(order.rail)
    .bind(order.currency)
    .bind(order.shipping_price)
    .fetch_one(&mut *conn)
    .await?;
    for (position, line) in order.lines.into_iter().enumerate() {
        let line: OrderLine = sqlx::query_as(
            r#"
            INSERT INTO order_lines (order_id, position, item_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
            "#,
        )
        .bind(stored.id)
        .bind(position as i64)
        .bind(line.item_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .fetch_one(&mut *conn)
        .await?;
        stored.lines.push(line);
    }
    debug!("🗃️ Order {} inserted with {} lines", stored.id, stored.lines.len());
    Ok(stored)
}

pub async fn fetch_lines(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY position ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await
}

async fn with_lines(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    match order {
        Some(mut order) => {
            order.lines = fetch_lines(order.id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

pub async fn fetch_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&mut *conn).await?;
    with_lines(order, conn).await
}

pub async fn fetch_order_by_session(
    session_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE checkout_session_ref = $1")
        .bind(session_ref)
        .fetch_optional(&mut *conn)
        .await?;
    with_lines(order, conn).await
}

/// Fetches orders according to the criteria in the `OrderQueryFilter`, oldest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(buyer) = query.buyer_id {
        where_clause.push("buyer_id = ");
        where_clause.push_bind_unseparated(buyer);
    }
    if let Some(seller) = query.seller_id {
        where_clause.push("seller_id = ");
        where_clause.push_bind_unseparated(seller);
    }
    if let Some(p) = query.participant {
        where_clause.push("(buyer_id = ");
        where_clause.push_bind_unseparated(p);
        where_clause.push_unseparated(" OR seller_id = ");
        where_clause.push_bind_unseparated(p);
        where_clause.push_unseparated(")");
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(paid) = query.paid {
        where_clause.push("paid = ");
        where_clause.push_bind_unseparated(paid);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since.format(SQLITE_TIMESTAMP).to_string());
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until.format(SQLITE_TIMESTAMP).to_string());
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let mut orders: Vec<Order> = builder.build_query_as::<Order>().fetch_all(&mut *conn).await?;
    for order in orders.iter_mut() {
        order.lines = fetch_lines(order.id, &mut *conn).await?;
    }
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

/// Writes the mutable fields of `order` back, guarded by its version.
///
/// Zero matching rows means either the order is gone or someone else has written it since it was read. The two are
/// told apart with a follow-up read.
pub async fn update_order(order: &Order, conn: &mut SqliteConnection) -> Result<Order, SettlementDbError> {
    let updated: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders SET
            selected_payment_option_id = $1,
            rail = $2,
            estimated_delivery_date = $3,
            status = $4,
            buyer_delivery_confirmed = $5,
            seller_delivery_confirmed = $6,
            buyer_payment_confirmed = $7,
            seller_payment_confirmed = $8,
            checkout_session_ref = $9,
            checkout_url = $10,
            paid = $11,
            version = version + 1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $12 AND version = $13
        RETURNING *;
        "#,
    )
    .bind(order.selected_payment_option_id)
    .bind(order.rail)
    .bind(order.estimated_delivery_date)
    .bind(order.status)
    .bind(order.buyer_delivery_confirmed)
    .bind(order.seller_delivery_confirmed)
    .bind(order.buyer_payment_confirmed)
    .bind(order.seller_payment_confirmed)
    .bind(order.checkout_session_ref.as_deref())
    .bind(order.checkout_url.as_deref())
    .bind(order.paid)
    .bind(order.id)
    .bind(order.version)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(mut updated) => {
            trace!("🗃️ Order {} is now at version {}", updated.id, updated.version);
            updated.lines = fetch_lines(updated.id, conn).await?;
            Ok(updated)
        },
        None => {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT version FROM orders WHERE id = $1").bind(order.id).fetch_optional(conn).await?;
            match exists {
                Some(v) => {
                    debug!("🗃️ Order {} is at version {v}, but the write expected {}", order.id, order.version);
                    Err(SettlementDbError::VersionConflict(order.id))
                },
                None => Err(SettlementDbError::OrderNotFound(order.id)),
            }
        },
    }
}
