//! Webhook signature verification.
//!
//! The gateway signs every webhook with HMAC-SHA512 over the exact request
//! body and sends the hex digest in [`SIGNATURE_HEADER`]. Verification must run
//! on the raw bytes before any JSON parsing.

use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Check a webhook signature.
///
/// Returns `false` for a missing or non-hex signature and for an empty
/// secret. The digest comparison is constant-time.
#[must_use]
pub fn validate_signature(raw_body: &[u8], provided: Option<&str>, secret: &str) -> bool {
    let Some(provided) = provided else {
        return false;
    };
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(provided.trim()) else {
        return false;
    };

    let mut mac = match HmacSha512::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(raw_body);

    mac.verify_slice(&expected).is_ok()
}

/// Hex HMAC-SHA512 of `raw_body`, as the gateway would send it.
#[must_use]
pub fn sign(raw_body: &[u8], secret: &str) -> String {
    match HmacSha512::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(raw_body);
            hex::encode(mac.finalize().into_bytes())
        },
        Err(_) => String::new(),
    }
}
