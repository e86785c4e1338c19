//! Connects the engine's [`PaymentGateway`] contract to the gateway REST client in `gateway_tools`.
use gateway_tools::{GatewayApi, GatewayApiError, GatewayConfig, NewCheckoutSession};
use log::*;
use settlement_engine::traits::{CheckoutRequest, CheckoutSession, PaymentGateway, PaymentGatewayError};

#[derive(Clone)]
pub struct GatewayClient {
    api: GatewayApi,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let api = GatewayApi::new(config)?;
        Ok(Self { api })
    }
}

impl PaymentGateway for GatewayClient {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentGatewayError> {
        let CheckoutRequest { order_id, amount, currency, idempotency_key } = request;
        let session = NewCheckoutSession { amount, currency, client_reference: order_id.value().to_string() };
        let response =
            self.api.create_checkout_session(session, &idempotency_key).await.map_err(to_payment_gateway_error)?;
        if response.amount != amount {
            warn!(
                "💳️ Checkout session {} for order {order_id} was opened for {}, but {amount} was requested",
                response.id, response.amount
            );
        }
        Ok(CheckoutSession { session_ref: response.id, checkout_url: response.url })
    }
}

fn to_payment_gateway_error(e: GatewayApiError) -> PaymentGatewayError {
    if e.is_rejection() {
        PaymentGatewayError::Rejected(e.to_string())
    } else {
        PaymentGatewayError::Unavailable(e.to_string())
    }
}
