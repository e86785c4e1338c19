//! Populates the marketplace tables that the engine reads from. In production these belong to other services.
use chrono::{Duration, Utc};
use mse_common::Money;

use crate::{
    db_types::{DeliveryEventId, ItemId, OrderId, PaymentOptionId, ProfileId, ShippingOptionId},
    SqliteDatabase,
};

pub async fn insert_profile(db: &SqliteDatabase, name: &str, is_admin: bool) -> ProfileId {
    sqlx::query_scalar("INSERT INTO profiles (display_name, is_admin) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(is_admin)
        .fetch_one(db.pool())
        .await
        .expect("Error inserting profile")
}

pub async fn insert_item(db: &SqliteDatabase, owner: ProfileId, title: &str, price: Money, stock: i64) -> ItemId {
    sqlx::query_scalar("INSERT INTO items (owner_id, title, price, currency, stock) VALUES ($1, $2, $3, 'EUR', $4) RETURNING id")
        .bind(owner)
        .bind(title)
        .bind(price)
        .bind(stock)
        .fetch_one(db.pool())
        .await
        .expect("Error inserting item")
}

pub async fn set_stock(db: &SqliteDatabase, item: ItemId, stock: i64) {
    sqlx::query("UPDATE items SET stock = $1 WHERE id = $2")
        .bind(stock)
        .bind(item)
        .execute(db.pool())
        .await
        .expect("Error updating stock");
}

/// Writes a ledger row for `order` directly, without touching the order itself.
pub async fn insert_ledger_row(db: &SqliteDatabase, order: OrderId, seller: ProfileId, gross: Money) {
    sqlx::query("INSERT INTO ledger_entries (order_id, seller_id, rail, gross, fee, net, currency) VALUES ($1, $2, 'automated', $3, 0, $4, 'EUR')")
        .bind(order)
        .bind(seller)
        .bind(gross)
        .bind(gross)
        .execute(db.pool())
        .await
        .expect("Error inserting ledger row");
}

pub async fn insert_payment_option(db: &SqliteDatabase, owner: ProfileId, kind: &str) -> PaymentOptionId {
    sqlx::query_scalar("INSERT INTO payment_options (owner_id, kind) VALUES ($1, $2) RETURNING id")
        .bind(owner)
        .bind(kind)
        .fetch_one(db.pool())
        .await
        .expect("Error inserting payment option")
}

pub async fn accept_payment_option(db: &SqliteDatabase, item: ItemId, option: PaymentOptionId) {
    sqlx::query("INSERT INTO item_payment_options (item_id, payment_option_id) VALUES ($1, $2)")
        .bind(item)
        .bind(option)
        .execute(db.pool())
        .await
        .expect("Error linking payment option to item");
}

pub async fn insert_delivery_event(db: &SqliteDatabase, location: &str) -> DeliveryEventId {
    let location_id: i64 = sqlx::query_scalar("INSERT INTO pickup_locations (name) VALUES ($1) RETURNING id")
        .bind(location)
        .fetch_one(db.pool())
        .await
        .expect("Error inserting pickup location");
    sqlx::query_scalar("INSERT INTO delivery_events (pickup_location_id, starts_at) VALUES ($1, $2) RETURNING id")
        .bind(location_id)
        .bind(Utc::now() + Duration::days(7))
        .fetch_one(db.pool())
        .await
        .expect("Error inserting delivery event")
}

pub async fn insert_shipping_option(db: &SqliteDatabase, owner: ProfileId, name: &str, price: Money) -> ShippingOptionId {
    sqlx::query_scalar("INSERT INTO shipping_options (owner_id, name, price) VALUES ($1, $2, $3) RETURNING id")
        .bind(owner)
        .bind(name)
        .bind(price)
        .fetch_one(db.pool())
        .await
        .expect("Error inserting shipping option")
}

/// A small marketplace: one seller with two items, a card option and a bank-transfer option, a buyer, a bystander
/// and an admin.
#[derive(Debug, Clone)]
pub struct MarketFixture {
    pub buyer: ProfileId,
    pub seller: ProfileId,
    pub stranger: ProfileId,
    pub admin: ProfileId,
    /// Costs 50.00, 10 in stock.
    pub widget: ItemId,
    /// Costs 25.00, 3 in stock.
    pub gadget: ItemId,
    pub card: PaymentOptionId,
    pub bank_transfer: PaymentOptionId,
    pub delivery_event: DeliveryEventId,
    /// Costs 10.00.
    pub courier: ShippingOptionId,
}

impl MarketFixture {
    pub async fn seed(db: &SqliteDatabase) -> Self {
        let buyer = insert_profile(db, "Bob the buyer", false).await;
        let seller = insert_profile(db, "Sally the seller", false).await;
        let stranger = insert_profile(db, "Mallory", false).await;
        let admin = insert_profile(db, "Ada the admin", true).await;
        let widget = insert_item(db, seller, "Widget", Money::from_major(50), 10).await;
        let gadget = insert_item(db, seller, "Gadget", Money::from_major(25), 3).await;
        let card = insert_payment_option(db, seller, "card").await;
        let bank_transfer = insert_payment_option(db, seller, "bank_transfer").await;
        for item in [widget, gadget] {
            accept_payment_option(db, item, card).await;
            accept_payment_option(db, item, bank_transfer).await;
        }
        let delivery_event = insert_delivery_event(db, "Market square").await;
        let courier = insert_shipping_option(db, seller, "Courier", Money::from_major(10)).await;
        Self { buyer, seller, stranger, admin, widget, gadget, card, bank_transfer, delivery_event, courier }
    }
}
