//! Authentication and session endpoints.
//!
//! - POST `/register` - Create an identity, issue a token pair, dispatch a verification mail
//! - POST `/login` - Verify credentials and issue a fresh token pair
//! - POST `/logout` - Clear the stored refresh token and expire both cookies
//! - POST `/refresh` - Rotate the refresh token and mint a new pair
//! - GET `/verify-email/{token}` - Consume a verification token
//! - POST `/forgot-password` - Store a reset token hash and dispatch a reset mail
//! - POST `/reset-password/{token}` - Consume a reset token and store a new password
//! - POST `/change-password` - Authenticated password change
//! - GET `/me` - The authenticated identity
//! - POST `/session` - Set the cookie pair from tokens delivered via redirect URL

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use super::error::{ApiError, ResultExt};
use crate::auth::{
    ACCESS_COOKIE_NAME, Auth, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, token_cookie,
};
use crate::db::{Database, Identity, LoginType, NewUser, User};
use crate::impl_has_auth_state;
use crate::jwt::{IssuedToken, JwtKeys};
use crate::mail::MailDispatcher;
use crate::rate_limit::{RateLimitConfig, rate_limit_credentials, rate_limit_signup};
use crate::{password, temp_token};

#[derive(Clone)]
pub struct AuthApiState {
    pub db: Database,
    pub jwt: Arc<JwtKeys>,
    pub mail: MailDispatcher,
    pub secure_cookies: bool,
}

impl_has_auth_state!(AuthApiState);

pub fn router(state: AuthApiState, rate_limits: Option<Arc<RateLimitConfig>>) -> Router {
    let open = Router::new()
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/verify-email/{token}", get(verify_email))
        .route("/reset-password/{token}", post(reset_password))
        .route("/change-password", post(change_password))
        .route("/me", get(current_user))
        .route("/session", post(set_session))
        .with_state(state.clone());

    let signup = Router::new()
        .route("/register", post(register))
        .with_state(state.clone());

    let credentials = Router::new()
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .with_state(state);

    let (signup, credentials) = match rate_limits {
        Some(config) => (
            signup.layer(middleware::from_fn_with_state(
                config.clone(),
                rate_limit_signup,
            )),
            credentials.layer(middleware::from_fn_with_state(
                config,
                rate_limit_credentials,
            )),
        ),
        None => (signup, credentials),
    };

    open.merge(signup).merge(credentials)
}

/// Issue a token pair for an identity.
fn issue_token_pair(
    jwt: &JwtKeys,
    identity: &Identity,
) -> Result<(IssuedToken, IssuedToken), ApiError> {
    let access = jwt
        .issue_access_token(
            &identity.uuid,
            &identity.email,
            &identity.username,
            identity.role,
        )
        .map_err(|e| {
            error!("Failed to issue access token: {}", e);
            ApiError::internal("Failed to issue token")
        })?;
    let refresh = jwt.issue_refresh_token(&identity.uuid).map_err(|e| {
        error!("Failed to issue refresh token: {}", e);
        ApiError::internal("Failed to issue token")
    })?;
    Ok((access, refresh))
}

/// Build the Set-Cookie pair for a freshly issued access/refresh pair.
fn token_pair_cookies(
    access: &IssuedToken,
    refresh: &IssuedToken,
    secure: bool,
) -> AppendHeaders<[(axum::http::HeaderName, String); 2]> {
    AppendHeaders([
        (
            SET_COOKIE,
            token_cookie(ACCESS_COOKIE_NAME, &access.token, access.duration, secure),
        ),
        (
            SET_COOKIE,
            token_cookie(REFRESH_COOKIE_NAME, &refresh.token, refresh.duration, secure),
        ),
    ])
}

// =============================================================================
// Registration and login
// =============================================================================

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    let (local, domain) = email.split_once('@').unwrap_or(("", ""));
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        errors.push("A valid email address is required".to_string());
    }
    if email.len() > 254 {
        errors.push("Email address is too long".to_string());
    }
    if password.len() < 8 {
        errors.push("Password must be at least 8 characters".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(errors))
    }
}

async fn register(
    State(state): State<AuthApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();
    validate_credentials(&email, &payload.password)?;

    let existing = state
        .db
        .users()
        .get_by_email(&email)
        .await
        .db_err("Failed to check existing user")?;
    if existing.is_some() {
        return Err(ApiError::conflict("User with this email already exists"));
    }

    // Username derives from the email local part
    let username = email.split('@').next().unwrap_or(&email).to_string();
    let uuid = uuid::Uuid::new_v4().to_string();

    let password_hash = password::hash_password(&payload.password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to create user")
    })?;

    // Verification token is written in the same insert as the identity
    let verification = temp_token::generate();

    let id = state
        .db
        .users()
        .create(&NewUser {
            uuid: &uuid,
            email: &email,
            username: &username,
            password_hash: &password_hash,
            verification_token: &verification.hashed,
            verification_expiry: verification.expires_at,
        })
        .await
        .db_err("Failed to create user")?;

    let identity = state
        .db
        .users()
        .identity_by_id(id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::internal("Failed to load user"))?;

    let (access, refresh) = issue_token_pair(&state.jwt, &identity)?;
    state
        .db
        .users()
        .set_refresh_token(id, Some(&refresh.token))
        .await
        .db_err("Failed to persist refresh token")?;

    // Fire-and-forget; failures are logged by the dispatcher
    state
        .mail
        .dispatch_verification(&identity.email, &verification.unhashed);

    Ok((
        StatusCode::CREATED,
        token_pair_cookies(&access, &refresh, state.secure_cookies),
        Json(serde_json::json!({ "user": identity })),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AuthApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();
    validate_credentials(&email, &payload.password)?;

    let user: User = state
        .db
        .users()
        .get_by_email(&email)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::not_found("User with this email does not exist"))?;

    if user.login_type != LoginType::EmailPassword {
        return Err(ApiError::bad_request(format!(
            "You have previously registered using {}. Please use that login option to access your account.",
            user.login_type.as_str().to_lowercase()
        )));
    }

    let valid = password::verify_password(&payload.password, &user.password_hash).map_err(|e| {
        error!("Failed to verify password: {}", e);
        ApiError::internal("Failed to verify credentials")
    })?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let identity = Identity::from(&user);
    let (access, refresh) = issue_token_pair(&state.jwt, &identity)?;
    state
        .db
        .users()
        .set_refresh_token(user.id, Some(&refresh.token))
        .await
        .db_err("Failed to persist refresh token")?;

    Ok((
        StatusCode::OK,
        token_pair_cookies(&access, &refresh, state.secure_cookies),
        Json(serde_json::json!({
            "user": identity,
            "accessToken": access.token,
            "refreshToken": refresh.token,
        })),
    ))
}

/// Logout - clear the stored refresh token and expire both cookies.
async fn logout(
    State(state): State<AuthApiState>,
    Auth(auth): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .users()
        .set_refresh_token(auth.identity.id, None)
        .await
        .db_err("Failed to clear refresh token")?;

    let secure = state.secure_cookies;
    Ok((
        StatusCode::OK,
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, secure)),
            (SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, secure)),
        ]),
        Json(serde_json::json!({ "message": "User logged out" })),
    ))
}

// =============================================================================
// Refresh flow
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

/// Exchange a valid refresh token for a new pair, rotating the stored value.
/// The incoming token must equal the single persisted refresh token; a
/// rotated-out token is rejected, which is what makes replay detectable.
///
/// The token comes from the cookie, or from the body for cookie-less clients.
async fn refresh(
    State(state): State<AuthApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let from_body = serde_json::from_slice::<RefreshRequest>(&body)
        .ok()
        .and_then(|p| p.refresh_token);
    let incoming = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .map(str::to_string)
        .or(from_body)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let claims = state
        .jwt
        .verify_refresh_token(&incoming)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;

    let user = state
        .db
        .users()
        .get_by_uuid(&claims.sub)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        return Err(ApiError::unauthorized("Refresh token is expired or used"));
    }

    let identity = Identity::from(&user);
    let (access, new_refresh) = issue_token_pair(&state.jwt, &identity)?;

    // Compare-and-swap: only rotate while the stored token is still the one
    // presented. Losing the race is reported like any stale token.
    let rotated = state
        .db
        .users()
        .rotate_refresh_token(user.id, &incoming, &new_refresh.token)
        .await
        .db_err("Failed to rotate refresh token")?;
    if !rotated {
        return Err(ApiError::unauthorized("Refresh token is expired or used"));
    }

    Ok((
        StatusCode::OK,
        token_pair_cookies(&access, &new_refresh, state.secure_cookies),
        Json(serde_json::json!({
            "accessToken": access.token,
            "refreshToken": new_refresh.token,
        })),
    ))
}

// =============================================================================
// Email verification and password reset
// =============================================================================

async fn verify_email(
    State(state): State<AuthApiState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if token.is_empty() {
        return Err(ApiError::bad_request("Email verification token is missing"));
    }

    let hashed = temp_token::hash_token(&token);
    let identity = state
        .db
        .users()
        .find_by_verification_token(&hashed, temp_token::unix_now())
        .await
        .db_err("Failed to look up verification token")?
        .ok_or_else(|| ApiError::bad_request("Token is invalid or expired"))?;

    state
        .db
        .users()
        .mark_email_verified(identity.id)
        .await
        .db_err("Failed to mark email verified")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Email verified successfully" })),
    ))
}

#[derive(Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

async fn forgot_password(
    State(state): State<AuthApiState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let user = state
        .db
        .users()
        .get_by_email(&email)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::not_found("User with this email does not exist"))?;

    // Overwrites any previous reset token, keeping at most one live
    let reset = temp_token::generate();
    state
        .db
        .users()
        .set_reset_token(user.id, &reset.hashed, reset.expires_at)
        .await
        .db_err("Failed to store reset token")?;

    state
        .mail
        .dispatch_password_reset(&user.email, &reset.unhashed);

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Password reset mail has been sent on your mail id"
        })),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest {
    new_password: String,
}

async fn reset_password(
    State(state): State<AuthApiState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::validation(vec![
            "Password must be at least 8 characters".to_string(),
        ]));
    }

    let hashed = temp_token::hash_token(&token);
    let identity = state
        .db
        .users()
        .find_by_reset_token(&hashed, temp_token::unix_now())
        .await
        .db_err("Failed to look up reset token")?
        .ok_or_else(|| ApiError::bad_request("Token is invalid or expired"))?;

    let password_hash = password::hash_password(&payload.new_password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to reset password")
    })?;

    state
        .db
        .users()
        .reset_password(identity.id, &password_hash)
        .await
        .db_err("Failed to reset password")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Password reset successfully" })),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<AuthApiState>,
    Auth(auth): Auth,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::validation(vec![
            "Password must be at least 8 characters".to_string(),
        ]));
    }

    let user = state
        .db
        .users()
        .get_by_id(auth.identity.id)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid access token"))?;

    let valid =
        password::verify_password(&payload.old_password, &user.password_hash).map_err(|e| {
            error!("Failed to verify password: {}", e);
            ApiError::internal("Failed to verify credentials")
        })?;
    if !valid {
        return Err(ApiError::bad_request("Invalid old password"));
    }

    let password_hash = password::hash_password(&payload.new_password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to change password")
    })?;

    state
        .db
        .users()
        .set_password(user.id, &password_hash)
        .await
        .db_err("Failed to change password")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Password changed successfully" })),
    ))
}

// =============================================================================
// Session helpers
// =============================================================================

async fn current_user(Auth(auth): Auth) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "user": auth.identity })),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetSessionRequest {
    access_token: String,
    refresh_token: String,
}

/// Set the cookie pair from tokens delivered out-of-band (redirect-URL flow
/// for clients that cannot receive cookies from the issuing response).
async fn set_session(
    State(state): State<AuthApiState>,
    Json(payload): Json<SetSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let access_claims = state
        .jwt
        .verify_access_token(&payload.access_token)
        .map_err(|_| ApiError::unauthorized("Invalid access token"))?;
    let refresh_claims = state
        .jwt
        .verify_refresh_token(&payload.refresh_token)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;

    let now = temp_token::unix_now() as u64;
    let secure = state.secure_cookies;

    Ok((
        StatusCode::OK,
        AppendHeaders([
            (
                SET_COOKIE,
                token_cookie(
                    ACCESS_COOKIE_NAME,
                    &payload.access_token,
                    access_claims.exp.saturating_sub(now),
                    secure,
                ),
            ),
            (
                SET_COOKIE,
                token_cookie(
                    REFRESH_COOKIE_NAME,
                    &payload.refresh_token,
                    refresh_claims.exp.saturating_sub(now),
                    secure,
                ),
            ),
        ]),
        Json(serde_json::json!({
            "accessToken": payload.access_token,
            "refreshToken": payload.refresh_token,
        })),
    ))
}
