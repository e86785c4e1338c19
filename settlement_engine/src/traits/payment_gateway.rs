use mse_common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::OrderId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub order_id: OrderId,
    pub amount: Money,
    pub currency: String,
    /// Derived from the order id, so a retried request never opens a second session.
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_ref: String,
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentGatewayError {
    #[error("Could not reach the payment gateway: {0}")]
    Unavailable(String),
    #[error("The payment gateway refused the request: {0}")]
    Rejected(String),
}

/// The outbound half of the card-payment gateway. Inbound webhooks are handled by the settlement API.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentGatewayError>;
}
