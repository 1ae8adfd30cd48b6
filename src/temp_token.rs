//! One-time opaque tokens for email verification and password reset.
//!
//! The unhashed value is handed to the mail dispatcher and never persisted;
//! only its SHA-256 hash is stored. Verification re-hashes the incoming
//! token and compares for equality.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Temporary token validity window: 20 minutes.
pub const TEMP_TOKEN_TTL_SECS: i64 = 20 * 60;

/// Token size in bytes (32 bytes = 256 bits of entropy).
const TOKEN_BYTES: usize = 32;

/// A freshly generated one-time token.
#[derive(Debug, Clone)]
pub struct TemporaryToken {
    /// The value delivered to the user out-of-band. Never persisted.
    pub unhashed: String,
    /// SHA-256 of `unhashed`, the only form the store ever sees.
    pub hashed: String,
    /// Expiry as Unix seconds.
    pub expires_at: i64,
}

/// Generate a random opaque token, its hash, and its expiry.
pub fn generate() -> TemporaryToken {
    let mut buf = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut buf);
    let unhashed = URL_SAFE_NO_PAD.encode(buf);
    let hashed = hash_token(&unhashed);
    TemporaryToken {
        unhashed,
        hashed,
        expires_at: unix_now() + TEMP_TOKEN_TTL_SECS,
    }
}

/// Hash an incoming token the same way `generate` does.
pub fn hash_token(raw: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(raw.as_bytes()))
}

/// Current time as Unix seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
