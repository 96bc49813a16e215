//! Cryptographic primitives: SHA-256/512 and HMAC-SHA256, used by
//! `gateway-webhooks` to sign and verify delivery payloads.

use crate::error::{Result, SecurityError};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};

/// HMAC-SHA256 type.
type HmacSha256 = Hmac<Sha256>;

/// Stateless hashing/HMAC helpers.
#[derive(Debug, Clone, Default)]
pub struct HashingService;

impl HashingService {
    /// Hash data using SHA-256.
    #[must_use]
    pub fn sha256(data: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.finalize().to_vec()
    }

    /// Hash data using SHA-256 and return hex.
    #[must_use]
    pub fn sha256_hex(data: &[u8]) -> String {
        hex::encode(Self::sha256(data))
    }

    /// Hash data using SHA-512.
    #[must_use]
    pub fn sha512(data: &[u8]) -> Vec<u8> {
        let mut hasher = Sha512::new();
        hasher.update(data);
        hasher.finalize().to_vec()
    }

    /// Hash data using SHA-512 and return hex.
    #[must_use]
    pub fn sha512_hex(data: &[u8]) -> String {
        hex::encode(Self::sha512(data))
    }

    /// Generate HMAC-SHA256.
    ///
    /// # Errors
    /// Returns error if the key is invalid for HMAC construction.
    pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
            .map_err(|e| SecurityError::Internal(format!("invalid HMAC key: {e}")))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Generate HMAC-SHA256 and return hex.
    ///
    /// # Errors
    /// Returns error if the key is invalid for HMAC construction.
    pub fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> Result<String> {
        Self::hmac_sha256(key, data).map(|h| hex::encode(h))
    }

    /// Verify HMAC-SHA256 in constant time.
    ///
    /// # Errors
    /// Returns error if the key is invalid for HMAC construction.
    pub fn verify_hmac_sha256(key: &[u8], data: &[u8], signature: &[u8]) -> Result<bool> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
            .map_err(|e| SecurityError::Internal(format!("invalid HMAC key: {e}")))?;
        mac.update(data);
        Ok(mac.verify_slice(signature).is_ok())
    }

    /// Constant-time comparison of two byte slices.
    #[must_use]
    pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
        if a.len() != b.len() {
            return false;
        }

        let mut result = 0u8;
        for (x, y) in a.iter().zip(b.iter()) {
            result |= x ^ y;
        }
        result == 0
    }
}

/// Generate a secure random hex-encoded token of `length` raw bytes.
#[must_use]
pub fn generate_token(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
