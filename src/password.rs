//! Password hashing via bcrypt.
//!
//! The salt is baked into the digest, so hashing the same plaintext twice
//! yields different digests and verification needs only the digest itself.

use bcrypt::BcryptError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a plaintext password. A malformed result is an internal error, never
/// a user-facing one.
pub fn hash_password(plaintext: &str) -> Result<String, BcryptError> {
    bcrypt::hash(plaintext, BCRYPT_COST)
}

/// Verify a plaintext password against a stored digest.
pub fn verify_password(plaintext: &str, digest: &str) -> Result<bool, BcryptError> {
    bcrypt::verify(plaintext, digest)
}
