use mse_common::Money;
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/checkout/sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCheckoutSession {
    /// Amount in minor units.
    pub amount: Money,
    pub currency: String,
    /// Our order reference. Echoed back in webhooks for reconciliation.
    pub client_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionResponse {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    pub amount: Money,
    pub currency: String,
}
