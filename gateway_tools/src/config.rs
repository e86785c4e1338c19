use log::*;
use mse_common::Secret;

const DEFAULT_GATEWAY_URL: &str = "https://api.gateway.example";

#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Base URL of the gateway's REST API, without a trailing slash.
    pub base_url: String,
    pub api_key: Secret<String>,
}

impl GatewayConfig {
    pub fn new<S: Into<String>>(base_url: S, api_key: Secret<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, api_key }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("MSE_GATEWAY_URL").unwrap_or_else(|_| {
            warn!("💳️ MSE_GATEWAY_URL not set, using {DEFAULT_GATEWAY_URL} as default");
            DEFAULT_GATEWAY_URL.to_string()
        });
        let api_key = Secret::new(std::env::var("MSE_GATEWAY_API_KEY").unwrap_or_else(|_| {
            warn!("💳️ MSE_GATEWAY_API_KEY not set. Requests to the payment gateway will be refused");
            String::default()
        }));
        Self::new(base_url, api_key)
    }
}
