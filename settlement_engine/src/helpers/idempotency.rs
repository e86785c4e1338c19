use std::fmt::Write;

use blake2::{digest::consts::U32, Blake2b, Digest};

use crate::db_types::OrderId;

const KEY_PREFIX: &str = "order-";
const KEY_HEX_CHARS: usize = 32;

/// The idempotency key sent with every checkout-session request for `order_id`.
///
/// `order-` followed by the first 32 hex characters of `Blake2b-256(order id)`. Retrying a checkout for the same
/// order always produces the same key, so the gateway hands back the existing session instead of opening a new one.
pub fn checkout_idempotency_key(order_id: OrderId) -> String {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(b"checkout-session:");
    hasher.update(order_id.value().to_le_bytes());
    let digest = hasher.finalize();
    let mut key = String::with_capacity(KEY_PREFIX.len() + KEY_HEX_CHARS);
    key.push_str(KEY_PREFIX);
    for byte in digest.iter().take(KEY_HEX_CHARS / 2) {
        let _ = write!(key, "{byte:02x}");
    }
    key
}
