//! JWT issuance and verification for the dual-token session scheme.
//!
//! Access tokens are short-lived and carry the identity's uuid, email,
//! username, and role. Refresh tokens are long-lived and carry the uuid
//! only. The two kinds are signed with distinct secrets, so a token of one
//! kind never validates as the other.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::UserRole;

/// Access token duration: 15 minutes.
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token duration: 14 days.
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 14 * 24 * 60 * 60;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (identity UUID)
    pub sub: String,
    pub email: String,
    pub username: String,
    pub role: UserRole,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Claims carried by a refresh token. Deliberately minimal: the subject only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (identity UUID)
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// Signing and verification keys for both token kinds.
#[derive(Clone)]
pub struct JwtKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

/// A signed token together with its issue/expiry metadata.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Lifetime in seconds, used for cookie Max-Age
    pub duration: u64,
}

impl JwtKeys {
    /// Create keys from the two secrets.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
        }
    }

    /// Issue an access token for an identity.
    pub fn issue_access_token(
        &self,
        uuid: &str,
        email: &str,
        username: &str,
        role: UserRole,
    ) -> Result<IssuedToken, JwtError> {
        let now = unix_now()?;
        let exp = now + ACCESS_TOKEN_DURATION_SECS;

        let claims = AccessClaims {
            sub: uuid.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            role,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at: exp,
            duration: ACCESS_TOKEN_DURATION_SECS,
        })
    }

    /// Issue a refresh token for an identity.
    pub fn issue_refresh_token(&self, uuid: &str) -> Result<IssuedToken, JwtError> {
        let now = unix_now()?;
        let exp = now + REFRESH_TOKEN_DURATION_SECS;

        let claims = RefreshClaims {
            sub: uuid.to_string(),
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at: exp,
            duration: REFRESH_TOKEN_DURATION_SECS,
        })
    }

    /// Validate and decode an access token.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.access_decoding, &validation)
                .map_err(JwtError::Decoding)?;

        Ok(token_data.claims)
    }

    /// Validate and decode a refresh token.
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<RefreshClaims>(token, &self.refresh_decoding, &validation)
                .map_err(JwtError::Decoding)?;

        Ok(token_data.claims)
    }
}

fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
