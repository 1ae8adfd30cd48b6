//! Authenticated user types.

use crate::db::Identity;
use crate::jwt::AccessClaims;

/// The result of a successful pass through the auth gate: the verified
/// claims plus the identity they resolved to, sensitive fields excluded.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: AccessClaims,
    pub identity: Identity,
}
