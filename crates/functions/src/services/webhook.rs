//! Card processor webhook signatures.
//!
//! The processor signs the raw request body with HMAC-SHA256 using the
//! shared secret and sends the lowercase hex digest in `x-signature`.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Hex HMAC-SHA256 of `body`.
#[must_use]
pub fn sign(secret: &SecretString, body: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return String::new();
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check `signature` (hex) against `body` in constant time.
#[must_use]
pub fn verify(secret: &SecretString, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("whsec_4f9Kq2Lm8Zt1Xv7Bn3Rc")
    }

    #[test]
    fn test_sign_then_verify() {
        let body = br#"{"event":"checkout.completed"}"#;
        let signature = sign(&secret(), body);
        assert_eq!(signature.len(), 64);
        assert!(verify(&secret(), body, &signature));
        assert!(verify(&secret(), body, &signature.to_uppercase()));
    }

    #[test]
    fn test_tampered_body_fails() {
        let signature = sign(&secret(), b"amount=100");
        assert!(!verify(&secret(), b"amount=1000", &signature));
    }

    #[test]
    fn test_garbage_signature_fails() {
        assert!(!verify(&secret(), b"body", "not-hex"));
        assert!(!verify(&secret(), b"body", ""));
    }
}
