//! Axum extractors for authentication.
//!
//! The gate walks NoToken → TokenPresent → Verified → Loaded: pull a bearer
//! token from the cookie or Authorization header, verify it against the
//! access secret, then load the identity projection by the claim subject.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::cookie::bearer_token;
use super::errors::{AuthError, AuthErrorKind};
use super::state::HasAuthState;
use super::types::AuthenticatedUser;
use crate::db::UserRole;

/// Core gate logic shared by the extractors.
async fn authenticate<S>(parts: &Parts, state: &S) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthState + Send + Sync,
{
    let token = bearer_token(&parts.headers).ok_or(AuthErrorKind::NotAuthenticated)?;

    let claims = state
        .jwt()
        .verify_access_token(token)
        .map_err(|_| AuthErrorKind::InvalidToken)?;

    let identity = state
        .db()
        .users()
        .identity_by_uuid(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load identity: {}", e);
            AuthErrorKind::StoreError
        })?
        .ok_or(AuthErrorKind::IdentityNotFound)?;

    Ok(AuthenticatedUser { claims, identity })
}

/// Extractor for endpoints that require an authenticated identity.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await
            .map(Auth)
            .map_err(AuthError::from)
    }
}

/// Extractor for admin-only endpoints. Role mismatch is 403, not 401.
pub struct AdminAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await.map_err(AuthError::from)?;

        if user.identity.role != UserRole::Admin {
            return Err(AuthError::new(AuthErrorKind::InsufficientRole));
        }

        Ok(AdminAuth(user))
    }
}
