//! Read-only queries against the tables owned by the marketplace services.
use sqlx::SqliteConnection;

use crate::db_types::{
    CatalogItem,
    DeliveryEvent,
    DeliveryEventId,
    ItemId,
    PaymentOption,
    PaymentOptionId,
    ProfileId,
    ShippingOption,
    ShippingOptionId,
};

pub async fn fetch_item(id: ItemId, conn: &mut SqliteConnection) -> Result<Option<CatalogItem>, sqlx::Error> {
    let item: Option<CatalogItem> =
        sqlx::query_as("SELECT id, owner_id, title, price, currency FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    match item {
        Some(mut item) => {
            item.accepted_payment_options = sqlx::query_scalar(
                "SELECT payment_option_id FROM item_payment_options WHERE item_id = $1 ORDER BY payment_option_id",
            )
            .bind(id)
            .fetch_all(conn)
            .await?;
            Ok(Some(item))
        },
        None => Ok(None),
    }
}

pub async fn fetch_stock(id: ItemId, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT stock FROM items WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_payment_option(
    id: PaymentOptionId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentOption>, sqlx::Error> {
    sqlx::query_as("SELECT id, owner_id, kind FROM payment_options WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn is_admin(id: ProfileId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let admin: Option<bool> =
        sqlx::query_scalar("SELECT is_admin FROM profiles WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(admin.unwrap_or(false))
}

pub async fn fetch_delivery_event(
    id: DeliveryEventId,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryEvent>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            delivery_events.id AS id,
            delivery_events.pickup_location_id AS pickup_location_id,
            pickup_locations.name AS pickup_location_name,
            delivery_events.starts_at AS starts_at
        FROM delivery_events
        LEFT JOIN pickup_locations ON pickup_locations.id = delivery_events.pickup_location_id
        WHERE delivery_events.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_shipping_option(
    id: ShippingOptionId,
    conn: &mut SqliteConnection,
) -> Result<Option<ShippingOption>, sqlx::Error> {
    sqlx::query_as("SELECT id, owner_id, name, price, currency FROM shipping_options WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
}
