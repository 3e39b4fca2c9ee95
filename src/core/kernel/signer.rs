use crate::core::errors::ExchangeError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Request authentication over a canonical payload string.
///
/// The payload is signed exactly as supplied; canonicalization (parameter
/// ordering, timestamp placement) is the caller's responsibility because the
/// signed bytes must match the transmitted bytes.
pub trait RequestSigner: Send + Sync {
    /// Sign the canonical string, returning a lowercase hex digest.
    fn sign(&self, canonical: &str) -> String;
}

/// HMAC-SHA256 signer producing 64-character lowercase hex signatures.
///
/// The MAC is initialized once at construction: structurally unusable key
/// material is a fatal configuration error, not a per-request condition.
pub struct HmacSha256Signer {
    mac: HmacSha256,
}

impl HmacSha256Signer {
    pub fn new(secret_key: &str) -> Result<Self, ExchangeError> {
        let mac = HmacSha256::new_from_slice(secret_key.as_bytes())
            .map_err(|e| ExchangeError::AuthError(format!("Failed to create HMAC: {}", e)))?;
        Ok(Self { mac })
    }
}

impl RequestSigner for HmacSha256Signer {
    fn sign(&self, canonical: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(canonical.as_bytes());
        // hex::encode zero-pads every byte to two characters; leading zero
        // nibbles are never stripped.
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Known-answer vector from the Binance signed-endpoint documentation.
    const DOC_SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
    const DOC_QUERY: &str = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
    const DOC_SIGNATURE: &str = "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71";

    #[test]
    fn test_known_answer_vector() {
        let signer = HmacSha256Signer::new(DOC_SECRET).unwrap();
        assert_eq!(signer.sign(DOC_QUERY), DOC_SIGNATURE);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let signer = HmacSha256Signer::new("secret").unwrap();
        let first = signer.sign("timestamp=1700000000000");
        let second = signer.sign("timestamp=1700000000000");
        assert_eq!(first, second);
    }

    #[test]
    fn test_signature_length_and_alphabet() {
        let signer = HmacSha256Signer::new("secret").unwrap();
        for message in ["", "a", "timestamp=1", DOC_QUERY] {
            let sig = signer.sign(message);
            assert_eq!(sig.len(), 64, "SHA-256 digest must render as 64 hex chars");
            assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_leading_zero_bytes_preserved() {
        // Brute-force a (key, message) pair whose digest starts with a zero
        // byte, then verify the rendering keeps both hex characters.
        let signer = HmacSha256Signer::new("fixed-test-key").unwrap();
        let mut found = false;
        for i in 0..4096 {
            let message = format!("probe={}", i);
            let sig = signer.sign(&message);
            if sig.starts_with('0') {
                assert_eq!(sig.len(), 64);
                found = true;
                break;
            }
        }
        assert!(found, "expected at least one digest with a leading zero nibble");
    }

    #[test]
    fn test_distinct_messages_distinct_signatures() {
        let signer = HmacSha256Signer::new("secret").unwrap();
        assert_ne!(signer.sign("timestamp=1"), signer.sign("timestamp=2"));
    }
}
