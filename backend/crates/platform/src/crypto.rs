//! Cryptographic Utilities

use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Minimum HMAC key length in bytes
pub const MIN_SIGNING_KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Signing key must be at least {min} bytes (got {actual})")]
    KeyTooShort { min: usize, actual: usize },
}

/// Encode bytes as unpadded base64url
pub fn to_base64url(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded base64url
pub fn from_base64url(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::URL_SAFE_NO_PAD.decode(s)
}

/// HMAC-SHA256 key, validated once at construction
///
/// ```rust
/// use platform::crypto::SigningKey;
///
/// let key = SigningKey::new(&[7u8; 32]).unwrap();
/// let tag = key.sign(b"payload");
/// assert!(key.verify(b"payload", &tag));
/// assert!(!key.verify(b"tampered", &tag));
/// ```
#[derive(Clone)]
pub struct SigningKey {
    mac: HmacSha256,
}

impl SigningKey {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() < MIN_SIGNING_KEY_LEN {
            return Err(CryptoError::KeyTooShort {
                min: MIN_SIGNING_KEY_LEN,
                actual: key.len(),
            });
        }
        // HMAC accepts any key length.
        let mac = HmacSha256::new_from_slice(key).map_err(|_| CryptoError::KeyTooShort {
            min: MIN_SIGNING_KEY_LEN,
            actual: key.len(),
        })?;
        Ok(Self { mac })
    }

    /// Compute HMAC-SHA256 over `data`
    pub fn sign(&self, data: &[u8]) -> [u8; 32] {
        let mut mac = self.mac.clone();
        mac.update(data);
        mac.finalize().into_bytes().into()
    }

    /// Verify a tag in constant time
    pub fn verify(&self, data: &[u8], tag: &[u8]) -> bool {
        let mut mac = self.mac.clone();
        mac.update(data);
        mac.verify_slice(tag).is_ok()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_known_answer() {
        // RFC 4231 test case 6 (131-byte key, longer than the block size)
        let key = [0xaau8; 131];
        let data = b"Test Using Larger Than Block-Size Key - Hash Key First";
        let expected =
            hex::decode("60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54")
                .unwrap();

        let signing_key = SigningKey::new(&key).unwrap();
        assert_eq!(signing_key.sign(data).to_vec(), expected);
    }

    #[test]
    fn test_short_key_rejected() {
        assert_eq!(
            SigningKey::new(b"Jefe").unwrap_err(),
            CryptoError::KeyTooShort { min: 32, actual: 4 }
        );
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let a = SigningKey::new(&[1u8; 32]).unwrap();
        let b = SigningKey::new(&[2u8; 32]).unwrap();
        let tag = a.sign(b"message");
        assert!(a.verify(b"message", &tag));
        assert!(!b.verify(b"message", &tag));
        assert!(!a.verify(b"message", &tag[..16]));
    }

    #[test]
    fn test_base64url_is_unpadded_and_url_safe() {
        let data = [0xfbu8, 0xff, 0xfe];
        let encoded = to_base64url(&data);
        assert_eq!(encoded, "-__-");
        assert_eq!(from_base64url(&encoded).unwrap(), data);
        assert!(from_base64url("+/==").is_err());
    }
}
