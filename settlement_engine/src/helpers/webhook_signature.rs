//! Verification of inbound payment-gateway webhooks.
//!
//! The gateway signs the raw request body with a shared secret and sends `base64(HMAC-SHA256(secret, body))` in a
//! header. Verification must run on the exact bytes that arrived, before any JSON parsing.
use hmac::{Hmac, Mac};
use log::*;
use mse_common::Secret;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WebhookSignatureError {
    #[error("The webhook carries no signature")]
    MissingSignature,
    #[error("The webhook signature is not valid base64")]
    MalformedSignature,
    #[error("The webhook signature does not match the payload")]
    InvalidSignature,
    #[error("No webhook secret has been configured")]
    NoSecret,
}

#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: Secret<String>,
}

impl WebhookVerifier {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256, WebhookSignatureError> {
        if self.secret.is_empty() {
            return Err(WebhookSignatureError::NoSecret);
        }
        HmacSha256::new_from_slice(self.secret.reveal().as_bytes()).map_err(|_| WebhookSignatureError::NoSecret)
    }

    /// Produces the signature the gateway would send for `body`.
    pub fn sign(&self, body: &[u8]) -> Result<String, WebhookSignatureError> {
        let mut mac = self.mac()?;
        mac.update(body);
        Ok(base64::encode(mac.finalize().into_bytes()))
    }

    /// Checks `signature` against `body` in constant time.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), WebhookSignatureError> {
        let signature = signature.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
            warn!("🔐️ Webhook received without a signature");
            WebhookSignatureError::MissingSignature
        })?;
        let expected = base64::decode(signature).map_err(|_| {
            warn!("🔐️ Webhook signature is not valid base64");
            WebhookSignatureError::MalformedSignature
        })?;
        let mut mac = self.mac()?;
        mac.update(body);
        mac.verify_slice(&expected).map_err(|_| {
            warn!("🔐️ Webhook signature does not match the payload");
            WebhookSignatureError::InvalidSignature
        })
    }
}
