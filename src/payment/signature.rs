//! Payment-notification authenticity check.
//!
//! Razorpay signs a completed payment with
//! `HMAC-SHA256(key_secret, "{order_id}|{payment_id}")`, hex encoded. The
//! supplied signature is decoded and compared in constant time; string
//! equality would leak match length through timing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(remote_order_id: &str, remote_payment_id: &str, secret: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(remote_order_id.as_bytes());
    mac.update(b"|");
    mac.update(remote_payment_id.as_bytes());
    mac
}

/// Hex signature the processor is expected to have produced.
pub fn expected_signature(remote_order_id: &str, remote_payment_id: &str, secret: &str) -> String {
    let mac = mac_for(remote_order_id, remote_payment_id, secret);
    hex::encode(mac.finalize().into_bytes())
}

/// True only when `supplied` is a valid hex encoding of the expected MAC.
pub fn verify(
    remote_order_id: &str,
    remote_payment_id: &str,
    supplied: &str,
    secret: &str,
) -> bool {
    let Ok(raw) = hex::decode(supplied) else {
        // Not hex, cannot be a hex-encoded digest.
        return false;
    };
    mac_for(remote_order_id, remote_payment_id, secret)
        .verify_slice(&raw)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_key_secret";

    #[test]
    fn derived_signature_verifies() {
        let sig = expected_signature("order_abc123", "pay_def456", SECRET);
        assert!(verify("order_abc123", "pay_def456", &sig, SECRET));
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = expected_signature("order_abc123", "pay_def456", "other_secret");
        assert!(!verify("order_abc123", "pay_def456", &sig, SECRET));
    }

    #[test]
    fn wrong_payment_id_fails() {
        let sig = expected_signature("order_abc123", "pay_def456", SECRET);
        assert!(!verify("order_abc123", "pay_zzz999", &sig, SECRET));
    }

    #[test]
    fn non_hex_signature_fails() {
        assert!(!verify("order_abc123", "pay_def456", "not hex at all!", SECRET));
        assert!(!verify("order_abc123", "pay_def456", "", SECRET));
    }

    #[test]
    fn concatenation_is_pipe_delimited() {
        // "a|bc" and "ab|c" must not collide.
        let one = expected_signature("a", "bc", SECRET);
        let two = expected_signature("ab", "c", SECRET);
        assert_ne!(one, two);
    }
}
