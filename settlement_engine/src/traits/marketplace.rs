//! Read-only views onto the services that own catalog items, profiles and logistics.
//!
//! The engine never writes to any of these. They are split into small traits so that a deployment can back each of
//! them with a different system, and so that tests can mock them one at a time.
use thiserror::Error;

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
    StockCheck,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarketplaceError {
    #[error("Item {0} does not exist")]
    ItemNotFound(ItemId),
    #[error("Payment option {0} does not exist")]
    PaymentOptionNotFound(PaymentOptionId),
    #[error("Delivery event {0} does not exist")]
    DeliveryEventNotFound(DeliveryEventId),
    #[error("Shipping option {0} does not exist")]
    ShippingOptionNotFound(ShippingOptionId),
    #[error("Marketplace service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        Self::ServiceUnavailable(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait ItemService {
    /// The item, with its owner, unit price, currency and the payment options its owner accepts for it.
    async fn item(&self, id: ItemId) -> Result<CatalogItem, MarketplaceError>;

    async fn check_stock(&self, id: ItemId, quantity: i64) -> Result<StockCheck, MarketplaceError>;

    async fn owner_of(&self, id: ItemId) -> Result<ProfileId, MarketplaceError> {
        self.item(id).await.map(|item| item.owner_id)
    }

    async fn payment_option(&self, id: PaymentOptionId) -> Result<PaymentOption, MarketplaceError>;
}

#[allow(async_fn_in_trait)]
pub trait ProfileService {
    async fn is_same_profile(&self, a: ProfileId, b: ProfileId) -> Result<bool, MarketplaceError>;

    async fn is_admin(&self, profile: ProfileId) -> Result<bool, MarketplaceError>;
}

#[allow(async_fn_in_trait)]
pub trait LocationService {
    async fn delivery_event(&self, id: DeliveryEventId) -> Result<DeliveryEvent, MarketplaceError>;

    async fn shipping_option(&self, id: ShippingOptionId) -> Result<ShippingOption, MarketplaceError>;
}

/// Everything the order flow needs from the rest of the marketplace.
pub trait Marketplace: ItemService + ProfileService + LocationService + Clone {}

impl<T> Marketplace for T where T: ItemService + ProfileService + LocationService + Clone {}
