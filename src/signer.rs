//! HMAC-SHA256 integrity codes for request and response bodies.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded signature.
pub const SIGNATURE_HEADER: &str = "HashSHA256";

/// Keyed signer. There is no "disabled" signer value: callers hold an
/// `Option<Signer>` and skip the header entirely when it is `None`.
#[derive(Clone)]
pub struct Signer {
    // ---
    mac: HmacSha256,
}

impl Signer {
    // ---
    /// Returns `None` for an empty key, which disables signing.
    pub fn new(key: &str) -> Option<Self> {
        // ---
        if key.is_empty() {
            return None;
        }

        HmacSha256::new_from_slice(key.as_bytes())
            .ok()
            .map(|mac| Self { mac })
    }

    /// Hex-encoded HMAC-SHA256 of `payload`.
    pub fn sign(&self, payload: &[u8]) -> String {
        // ---
        let mut mac = self.mac.clone();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recomputes the code and compares it in constant time.
    pub fn verify(&self, signature: &str, payload: &[u8]) -> bool {
        // ---
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };

        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Signer { .. }")
    }
}
