use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use log::error;
use mse_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::order_flow::{ConfirmationPair, Delivery, PaymentRail, Payment as PaymentConfirmation};

/// Declares an integer identifier newtype that is stored transparently in the database and in JSON.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().trim_start_matches('#').parse::<i64>().map(Self)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl $name {
            pub fn value(&self) -> i64 {
                self.0
            }
        }
    };
}

//--------------------------------------     Identifiers      ---------------------------------------------------------
id_type!(
    /// The engine-assigned identifier of an order.
    OrderId,
    "#"
);
id_type!(
    /// A buyer, seller or admin profile, as issued by the profile service.
    ProfileId,
    "profile:"
);
id_type!(ItemId, "item:");
id_type!(PaymentOptionId, "payment_option:");
id_type!(DeliveryEventId, "delivery_event:");
id_type!(ShippingOptionId, "shipping_option:");

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The buyer has placed the order. The seller has not responded yet.
    Created,
    /// The seller accepted the order. Payment has not been requested yet.
    Accepted,
    /// The seller declined the order. Terminal.
    Rejected,
    /// Waiting for the gateway webhook (automated rail) or for both parties to confirm the transfer (manual rail).
    AwaitingPayment,
    /// Settlement is complete and the ledger entry has been written.
    Paid,
    /// The buyer or seller withdrew the order before it was paid. Terminal.
    Cancelled,
    /// Both parties confirmed delivery. Terminal.
    Completed,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Completed)
    }

    /// Position along the happy path. Rejected and Cancelled are off-path and have no rank.
    pub fn progress_rank(&self) -> Option<u8> {
        match self {
            Self::Created => Some(0),
            Self::Accepted => Some(1),
            Self::AwaitingPayment => Some(2),
            Self::Paid => Some(3),
            Self::Completed => Some(4),
            Self::Rejected | Self::Cancelled => None,
        }
    }

    /// True once settlement has happened, i.e. `Paid` or `Completed`.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Paid | Self::Completed)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::AwaitingPayment => write!(f, "AWAITING_PAYMENT"),
            Self::Paid => write!(f, "PAID"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATED" => Ok(Self::Created),
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            "AWAITING_PAYMENT" => Ok(Self::AwaitingPayment),
            "PAID" => Ok(Self::Paid),
            "CANCELLED" => Ok(Self::Cancelled),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Created");
            OrderStatusType::Created
        })
    }
}

//--------------------------------------       OrderLine       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    /// Zero-based position of the line within the order.
    pub position: i64,
    pub item_id: ItemId,
    pub quantity: i64,
    /// Unit price snapshotted from the catalog when the order was created.
    pub unit_price: Money,
}

impl OrderLine {
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------         Order         --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: ProfileId,
    pub seller_id: ProfileId,
    pub delivery_event_id: DeliveryEventId,
    pub shipping_option_id: Option<ShippingOptionId>,
    pub home_delivery: bool,
    pub comment: Option<String>,
    /// The payment option the buyer picked when placing the order.
    pub payment_option_id: PaymentOptionId,
    /// Set by the seller at acceptance when they move the order onto a different payment option.
    pub selected_payment_option_id: Option<PaymentOptionId>,
    pub rail: PaymentRail,
    pub currency: String,
    pub shipping_price: Money,
    pub estimated_delivery_date: Option<NaiveDate>,
    pub status: OrderStatusType,
    pub buyer_delivery_confirmed: bool,
    pub seller_delivery_confirmed: bool,
    pub buyer_payment_confirmed: bool,
    pub seller_payment_confirmed: bool,
    pub checkout_session_ref: Option<String>,
    pub checkout_url: Option<String>,
    pub paid: bool,
    /// Optimistic concurrency counter. Bumped by every successful write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// The payment option that is currently in force for this order.
    pub fn effective_payment_option(&self) -> PaymentOptionId {
        self.selected_payment_option_id.unwrap_or(self.payment_option_id)
    }

    pub fn item_total(&self) -> Money {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }

    pub fn delivery(&self) -> ConfirmationPair<Delivery> {
        ConfirmationPair::new(self.buyer_delivery_confirmed, self.seller_delivery_confirmed)
    }

    pub fn set_delivery(&mut self, pair: ConfirmationPair<Delivery>) {
        self.buyer_delivery_confirmed = pair.buyer();
        self.seller_delivery_confirmed = pair.seller();
    }

    pub fn payment(&self) -> ConfirmationPair<PaymentConfirmation> {
        ConfirmationPair::new(self.buyer_payment_confirmed, self.seller_payment_confirmed)
    }

    pub fn set_payment(&mut self, pair: ConfirmationPair<PaymentConfirmation>) {
        self.buyer_payment_confirmed = pair.buyer();
        self.seller_payment_confirmed = pair.seller();
    }
}

//--------------------------------------       NewOrder        --------------------------------------------------------
/// A fully resolved order, ready to be stored. Prices, seller and rail have already been looked up from the
/// collaborating services.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub buyer_id: ProfileId,
    pub seller_id: ProfileId,
    pub lines: Vec<NewOrderLine>,
    pub delivery_event_id: DeliveryEventId,
    pub shipping_option_id: Option<ShippingOptionId>,
    pub home_delivery: bool,
    pub comment: Option<String>,
    pub payment_option_id: PaymentOptionId,
    pub rail: PaymentRail,
    pub currency: String,
    pub shipping_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit_price: Money,
}

//--------------------------------------      LedgerEntry      --------------------------------------------------------
/// An immutable record of money that has moved for an order.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub order_id: OrderId,
    pub seller_id: ProfileId,
    pub rail: PaymentRail,
    pub gross: Money,
    pub fee: Money,
    pub net: Money,
    pub currency: String,
    pub settled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub order_id: OrderId,
    pub seller_id: ProfileId,
    pub rail: PaymentRail,
    pub gross: Money,
    pub fee: Money,
    pub net: Money,
    pub currency: String,
}

//--------------------------------------    Collaborator data   -------------------------------------------------------
/// A catalog item, as reported by the item service.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub owner_id: ProfileId,
    pub title: String,
    pub price: Money,
    pub currency: String,
    #[sqlx(skip)]
    #[serde(default)]
    pub accepted_payment_options: Vec<PaymentOptionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentOption {
    pub id: PaymentOptionId,
    pub owner_id: ProfileId,
    /// Free-form kind, e.g. `card` or `bank_transfer`. Mapped onto a [`PaymentRail`] by the rail registry.
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub id: DeliveryEventId,
    pub pickup_location_id: Option<i64>,
    pub pickup_location_name: Option<String>,
    pub starts_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    pub owner_id: ProfileId,
    pub name: String,
    pub price: Money,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockCheck {
    Ok,
    Insufficient { available: i64 },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatusType::Created,
            OrderStatusType::Accepted,
            OrderStatusType::Rejected,
            OrderStatusType::AwaitingPayment,
            OrderStatusType::Paid,
            OrderStatusType::Cancelled,
            OrderStatusType::Completed,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        assert!("Shipped".parse::<OrderStatusType>().is_err());
        assert_eq!(OrderStatusType::from("bogus".to_string()), OrderStatusType::Created);
    }

    #[test]
    fn terminal_states() {
        assert!(OrderStatusType::Rejected.is_terminal());
        assert!(OrderStatusType::Cancelled.is_terminal());
        assert!(OrderStatusType::Completed.is_terminal());
        assert!(!OrderStatusType::Paid.is_terminal());
        assert_eq!(OrderStatusType::Cancelled.progress_rank(), None);
        assert!(OrderStatusType::AwaitingPayment.progress_rank() < OrderStatusType::Paid.progress_rank());
    }

    #[test]
    fn ids_parse_and_display() {
        assert_eq!("#42".parse::<OrderId>().unwrap(), OrderId(42));
        assert_eq!(OrderId(42).to_string(), "#42");
        assert_eq!(ProfileId(7).to_string(), "profile:7");
        assert_eq!(serde_json::to_string(&ItemId(3)).unwrap(), "3");
    }
}
