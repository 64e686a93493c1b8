//! Gateway callback signatures.
//!
//! The gateway signs `"{intent_id}|{external_payment_id}"` with HMAC-SHA256, keyed with the merchant account's shared
//! secret, and sends the result hex encoded.
use hmac::{digest::InvalidLength, Hmac, Mac};
use log::trace;
use sha2::Sha256;

use fest_common::Secret;

type HmacSha256 = Hmac<Sha256>;

fn signing_payload(intent_id: &str, external_payment_id: &str) -> String {
    format!("{intent_id}|{external_payment_id}")
}

/// Computes the hex-encoded signature the gateway would send for this intent and payment.
pub fn gateway_signature(
    intent_id: &str,
    external_payment_id: &str,
    secret: &Secret<String>,
) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.reveal().as_bytes())?;
    mac.update(signing_payload(intent_id, external_payment_id).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a gateway signature in constant time. Malformed (non-hex) signatures simply fail verification.
pub fn verify_gateway_signature(
    intent_id: &str,
    external_payment_id: &str,
    signature: &str,
    secret: &Secret<String>,
) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        trace!("🧾 Gateway signature for {intent_id} is not valid hex");
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.reveal().as_bytes()) else {
        return false;
    };
    mac.update(signing_payload(intent_id, external_payment_id).as_bytes());
    mac.verify_slice(&expected).is_ok()
}
