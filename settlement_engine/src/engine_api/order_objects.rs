use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use mse_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{DeliveryEventId, ItemId, LedgerEntry, Order, OrderStatusType, PaymentOptionId, ProfileId, ShippingOptionId},
    engine_api::errors::LifecycleError,
    traits::CheckoutSession,
};

/// A single line of a buyer's order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub item_id: ItemId,
    pub quantity: i64,
}

/// What a buyer submits to place an order. Prices, seller and payment rail are resolved by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub lines: Vec<OrderLineRequest>,
    pub delivery_event_id: DeliveryEventId,
    #[serde(default)]
    pub shipping_option_id: Option<ShippingOptionId>,
    #[serde(default)]
    pub home_delivery: bool,
    #[serde(default)]
    pub comment: Option<String>,
    pub payment_option_id: PaymentOptionId,
}

impl OrderRequest {
    pub fn new(delivery_event_id: DeliveryEventId, payment_option_id: PaymentOptionId) -> Self {
        Self {
            lines: Vec::new(),
            delivery_event_id,
            shipping_option_id: None,
            home_delivery: false,
            comment: None,
            payment_option_id,
        }
    }

    pub fn with_line(mut self, item_id: ItemId, quantity: i64) -> Self {
        self.lines.push(OrderLineRequest { item_id, quantity });
        self
    }

    pub fn with_shipping(mut self, shipping_option_id: ShippingOptionId) -> Self {
        self.shipping_option_id = Some(shipping_option_id);
        self
    }

    pub fn with_home_delivery(mut self) -> Self {
        self.home_delivery = true;
        self
    }

    pub fn with_comment<S: Into<String>>(mut self, comment: S) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Checks the request for problems that don't need any lookups.
    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.lines.is_empty() {
            return Err(LifecycleError::ValidationError("An order needs at least one line item".into()));
        }
        if let Some(line) = self.lines.iter().find(|l| l.quantity < 1) {
            return Err(LifecycleError::ValidationError(format!(
                "Quantity for item {} must be at least 1, not {}",
                line.item_id, line.quantity
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptOrderRequest {
    #[serde(default)]
    pub estimated_delivery_date: Option<NaiveDate>,
    /// Moves the order onto another of the seller's payment options. Must be accepted by every item in the order.
    #[serde(default)]
    pub selected_payment_option_id: Option<PaymentOptionId>,
}

impl AcceptOrderRequest {
    pub fn with_delivery_date(mut self, date: NaiveDate) -> Self {
        self.estimated_delivery_date = Some(date);
        self
    }

    pub fn with_payment_option(mut self, option: PaymentOptionId) -> Self {
        self.selected_payment_option_id = Some(option);
        self
    }
}

/// The result of asking for a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order: Order,
    pub session: CheckoutSession,
}

/// What a verified webhook did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// The order was settled by this event.
    Settled { order: Order, ledger_entry: LedgerEntry },
    /// The event was valid but required no change, e.g. a redelivery for an order that is already paid.
    Acknowledged { reason: String },
}

pub const PAYMENT_SUCCEEDED: &str = "payment.succeeded";
pub const PAYMENT_FAILED: &str = "payment.failed";
pub const SESSION_EXPIRED: &str = "session.expired";

/// The JSON body of a payment-gateway webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEventData {
    pub session_ref: String,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub buyer_id: Option<ProfileId>,
    pub seller_id: Option<ProfileId>,
    /// Matches orders where this profile is either the buyer or the seller.
    pub participant: Option<ProfileId>,
    pub status: Option<Vec<OrderStatusType>>,
    pub paid: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_buyer(mut self, buyer_id: ProfileId) -> Self {
        self.buyer_id = Some(buyer_id);
        self
    }

    pub fn with_seller(mut self, seller_id: ProfileId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn with_participant(mut self, profile: ProfileId) -> Self {
        self.participant = Some(profile);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_paid(mut self, paid: bool) -> Self {
        self.paid = Some(paid);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// True if the filter only ever matches orders that `profile` takes part in.
    pub fn is_restricted_to(&self, profile: ProfileId) -> bool {
        self.buyer_id == Some(profile) || self.seller_id == Some(profile) || self.participant == Some(profile)
    }

    pub fn is_empty(&self) -> bool {
        self.buyer_id.is_none() &&
            self.seller_id.is_none() &&
            self.participant.is_none() &&
            self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true) &&
            self.paid.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(buyer) = self.buyer_id {
            write!(f, "buyer: {buyer}. ")?;
        }
        if let Some(seller) = self.seller_id {
            write!(f, "seller: {seller}. ")?;
        }
        if let Some(p) = self.participant {
            write!(f, "participant: {p}. ")?;
        }
        if let Some(statuses) = &self.status {
            let s = statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            write!(f, "status in [{s}]. ")?;
        }
        if let Some(paid) = self.paid {
            write!(f, "paid: {paid}. ")?;
        }
        if let Some(since) = self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = self.until {
            write!(f, "until {until}. ")?;
        }
        Ok(())
    }
}
