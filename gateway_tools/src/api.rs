use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{config::GatewayConfig, CheckoutSessionResponse, GatewayApiError, NewCheckoutSession};

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Client for the card-payment gateway's REST API.
#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.reveal()))
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| GatewayApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    /// Opens a hosted checkout session. Repeating the call with the same `idempotency_key` returns the original
    /// session instead of creating a new one.
    pub async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
        idempotency_key: &str,
    ) -> Result<CheckoutSessionResponse, GatewayApiError> {
        debug!("💳️ Opening checkout session for {} ({} {})", session.client_reference, session.amount, session.currency);
        let headers = [(IDEMPOTENCY_KEY_HEADER, idempotency_key)];
        let result = self
            .rest_query::<CheckoutSessionResponse, _>(Method::POST, "/v1/checkout/sessions", &headers, Some(session))
            .await?;
        info!("💳️ Checkout session {} opened", result.id);
        Ok(result)
    }
}
