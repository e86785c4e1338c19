mod idempotency;
mod webhook_signature;

pub use idempotency::checkout_idempotency_key;
pub use webhook_signature::{WebhookSignatureError, WebhookVerifier};
