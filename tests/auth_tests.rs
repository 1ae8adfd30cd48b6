//! Tests for registration, login, email verification, and password flows.

mod common;

use axum::http::StatusCode;
use common::*;
use teambuilder::temp_token;
use tower::ServiceExt;

const EMAIL: &str = "test@example.com";
const PASSWORD: &str = "Password@123";

/// Plant a verification token hash on a user, as the mail link would carry
/// the unhashed form. Returns the unhashed token.
async fn plant_verification_token(t: &TestApp, email: &str, expires_at: i64) -> String {
    let token = temp_token::generate();
    sqlx::query("UPDATE users SET verification_token = ?, verification_expiry = ? WHERE email = ?")
        .bind(&token.hashed)
        .bind(expires_at)
        .bind(email)
        .execute(t.db.pool())
        .await
        .unwrap();
    token.unhashed
}

/// Plant a reset token hash on a user. Returns the unhashed token.
async fn plant_reset_token(t: &TestApp, email: &str, expires_at: i64) -> String {
    let token = temp_token::generate();
    sqlx::query("UPDATE users SET reset_token = ?, reset_expiry = ? WHERE email = ?")
        .bind(&token.hashed)
        .bind(expires_at)
        .bind(email)
        .execute(t.db.pool())
        .await
        .unwrap();
    token.unhashed
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_success() {
    let t = spawn_app().await;

    let response = register(&t.app, EMAIL, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookies = set_cookies(&response);
    assert!(cookie_value(&cookies, "accessToken").is_some());
    assert!(cookie_value(&cookies, "refreshToken").is_some());

    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], EMAIL);
    // Username derives from the email local part
    assert_eq!(body["user"]["username"], "test");
    assert_eq!(body["user"]["role"], "USER");
    assert_eq!(body["user"]["isEmailVerified"], false);
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("passwordHash").is_none());

    let user = t.db.users().get_by_email(EMAIL).await.unwrap().unwrap();
    assert_ne!(user.password_hash, PASSWORD, "password must be stored hashed");
    assert!(user.verification_token.is_some());
    assert!(user.verification_expiry.unwrap() > temp_token::unix_now());
    assert!(user.refresh_token.is_some(), "refresh token persisted at registration");
}

#[tokio::test]
async fn test_register_duplicate_email_conflict() {
    let t = spawn_app().await;

    let response = register(&t.app, EMAIL, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let before = t.db.users().get_by_email(EMAIL).await.unwrap().unwrap();

    let response = register(&t.app, EMAIL, "OtherPassword@456").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The first identity's stored fields are unchanged
    let after = t.db.users().get_by_email(EMAIL).await.unwrap().unwrap();
    assert_eq!(after.uuid, before.uuid);
    assert_eq!(after.password_hash, before.password_hash);
    assert_eq!(after.verification_token, before.verification_token);
}

#[tokio::test]
async fn test_register_duplicate_email_case_insensitive() {
    let t = spawn_app().await;

    register(&t.app, EMAIL, PASSWORD).await;
    let response = register(&t.app, "TEST@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_invalid_email() {
    let t = spawn_app().await;

    let response = register(&t.app, "invalid-email", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["errors"].is_array());
}

#[tokio::test]
async fn test_register_short_password() {
    let t = spawn_app().await;

    let response = register(&t.app, EMAIL, "short").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_success_returns_tokens_and_cookies() {
    let t = spawn_app().await;
    register(&t.app, EMAIL, PASSWORD).await;

    let response = login(&t.app, EMAIL, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert!(cookie_value(&cookies, "accessToken").is_some());
    assert!(cookie_value(&cookies, "refreshToken").is_some());

    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], EMAIL);
    assert!(body["accessToken"].as_str().is_some());
    assert!(body["refreshToken"].as_str().is_some());
    assert!(body["user"].get("password").is_none());

    // The persisted refresh token is the one just issued
    let user = t.db.users().get_by_email(EMAIL).await.unwrap().unwrap();
    assert_eq!(user.refresh_token.as_deref(), body["refreshToken"].as_str());
}

#[tokio::test]
async fn test_login_wrong_password_unauthorized() {
    let t = spawn_app().await;
    register(&t.app, EMAIL, PASSWORD).await;

    let response = login(&t.app, EMAIL, "WrongPassword@1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_unknown_email_not_found() {
    let t = spawn_app().await;

    let response = login(&t.app, "nobody@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_rejects_social_login_identity() {
    let t = spawn_app().await;
    register(&t.app, EMAIL, PASSWORD).await;

    sqlx::query("UPDATE users SET login_type = 'GOOGLE' WHERE email = ?")
        .bind(EMAIL)
        .execute(t.db.pool())
        .await
        .unwrap();

    let response = login(&t.app, EMAIL, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Email verification
// =============================================================================

#[tokio::test]
async fn test_verify_email_consumes_token() {
    let t = spawn_app().await;
    register(&t.app, EMAIL, PASSWORD).await;

    let unhashed = plant_verification_token(&t, EMAIL, temp_token::unix_now() + 600).await;

    let response = request(
        &t.app,
        "GET",
        &format!("/api/v1/auth/verify-email/{}", unhashed),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let user = t.db.users().get_by_email(EMAIL).await.unwrap().unwrap();
    assert!(user.is_email_verified);
    assert!(user.verification_token.is_none());
    assert!(user.verification_expiry.is_none());

    // The token is one-time: replaying it fails
    let response = request(
        &t.app,
        "GET",
        &format!("/api/v1/auth/verify-email/{}", unhashed),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_email_invalid_token() {
    let t = spawn_app().await;
    register(&t.app, EMAIL, PASSWORD).await;

    let response = request(
        &t.app,
        "GET",
        "/api/v1/auth/verify-email/not-a-real-token",
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_email_expired_token() {
    let t = spawn_app().await;
    register(&t.app, EMAIL, PASSWORD).await;

    let unhashed = plant_verification_token(&t, EMAIL, temp_token::unix_now() - 10).await;

    let response = request(
        &t.app,
        "GET",
        &format!("/api/v1/auth/verify-email/{}", unhashed),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let user = t.db.users().get_by_email(EMAIL).await.unwrap().unwrap();
    assert!(!user.is_email_verified);
}

// =============================================================================
// Password reset
// =============================================================================

#[tokio::test]
async fn test_forgot_password_stores_token_hash() {
    let t = spawn_app().await;
    register(&t.app, EMAIL, PASSWORD).await;

    let response = request(
        &t.app,
        "POST",
        "/api/v1/auth/forgot-password",
        None,
        Some(serde_json::json!({ "email": EMAIL })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let user = t.db.users().get_by_email(EMAIL).await.unwrap().unwrap();
    assert!(user.reset_token.is_some());
    assert!(user.reset_expiry.unwrap() > temp_token::unix_now());
}

#[tokio::test]
async fn test_forgot_password_unknown_email() {
    let t = spawn_app().await;

    let response = request(
        &t.app,
        "POST",
        "/api/v1/auth/forgot-password",
        None,
        Some(serde_json::json!({ "email": "nobody@example.com" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset_password_flow() {
    let t = spawn_app().await;
    register(&t.app, EMAIL, PASSWORD).await;

    let unhashed = plant_reset_token(&t, EMAIL, temp_token::unix_now() + 600).await;

    let response = request(
        &t.app,
        "POST",
        &format!("/api/v1/auth/reset-password/{}", unhashed),
        None,
        Some(serde_json::json!({ "newPassword": "NewPassword@456" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Token consumed
    let user = t.db.users().get_by_email(EMAIL).await.unwrap().unwrap();
    assert!(user.reset_token.is_none());

    // Old password no longer works, the new one does
    let response = login(&t.app, EMAIL, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = login(&t.app, EMAIL, "NewPassword@456").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reset_password_invalid_token() {
    let t = spawn_app().await;
    register(&t.app, EMAIL, PASSWORD).await;

    let response = request(
        &t.app,
        "POST",
        "/api/v1/auth/reset-password/bogus-token",
        None,
        Some(serde_json::json!({ "newPassword": "NewPassword@456" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_change_password() {
    let t = spawn_app().await;
    let (_, access, _) = register_and_login(&t.app, EMAIL, PASSWORD).await;

    let response = request(
        &t.app,
        "POST",
        "/api/v1/auth/change-password",
        Some(&access_cookie(&access)),
        Some(serde_json::json!({
            "oldPassword": PASSWORD,
            "newPassword": "NewPassword@456",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = login(&t.app, EMAIL, "NewPassword@456").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_change_password_wrong_old_password() {
    let t = spawn_app().await;
    let (_, access, _) = register_and_login(&t.app, EMAIL, PASSWORD).await;

    let response = request(
        &t.app,
        "POST",
        "/api/v1/auth/change-password",
        Some(&access_cookie(&access)),
        Some(serde_json::json!({
            "oldPassword": "WrongOld@123",
            "newPassword": "NewPassword@456",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Current user and role gate
// =============================================================================

#[tokio::test]
async fn test_me_returns_identity_without_sensitive_fields() {
    let t = spawn_app().await;
    let (uuid, access, _) = register_and_login(&t.app, EMAIL, PASSWORD).await;

    let response = request(
        &t.app,
        "GET",
        "/api/v1/auth/me",
        Some(&access_cookie(&access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user"]["uuid"], uuid);
    assert_eq!(body["user"]["email"], EMAIL);
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("refreshToken").is_none());
    assert!(body["user"].get("verificationToken").is_none());
}

#[tokio::test]
async fn test_me_without_token_unauthorized() {
    let t = spawn_app().await;

    let response = request(&t.app, "GET", "/api/v1/auth/me", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_accepts_authorization_header() {
    let t = spawn_app().await;
    let (_, access, _) = register_and_login(&t.app, EMAIL, PASSWORD).await;

    let response = t
        .app
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .method("GET")
                .uri("/api/v1/auth/me")
                .header("authorization", format!("Bearer {}", access))
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_role_gate_returns_forbidden_for_user() {
    let t = spawn_app().await;
    let (_, access, _) = register_and_login(&t.app, EMAIL, PASSWORD).await;

    // Cohort creation is admin-only: a USER gets 403, not 401
    let response = request(
        &t.app,
        "POST",
        "/api/v1/cohorts",
        Some(&access_cookie(&access)),
        Some(serde_json::json!({ "name": "Fall 2025" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Session endpoint and healthcheck
// =============================================================================

#[tokio::test]
async fn test_session_sets_cookie_pair() {
    let t = spawn_app().await;
    let (uuid, _, _) = register_and_login(&t.app, EMAIL, PASSWORD).await;

    // Tokens delivered out-of-band (redirect-URL flow)
    let access = t
        .jwt
        .issue_access_token(&uuid, EMAIL, "test", teambuilder::db::UserRole::User)
        .unwrap()
        .token;
    let refresh = t.jwt.issue_refresh_token(&uuid).unwrap().token;

    let response = request(
        &t.app,
        "POST",
        "/api/v1/auth/session",
        None,
        Some(serde_json::json!({
            "accessToken": access,
            "refreshToken": refresh,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert_eq!(cookie_value(&cookies, "accessToken").as_deref(), Some(access.as_str()));
    assert_eq!(cookie_value(&cookies, "refreshToken").as_deref(), Some(refresh.as_str()));
}

#[tokio::test]
async fn test_session_rejects_invalid_tokens() {
    let t = spawn_app().await;

    let response = request(
        &t.app,
        "POST",
        "/api/v1/auth/session",
        None,
        Some(serde_json::json!({
            "accessToken": "garbage",
            "refreshToken": "garbage",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_healthcheck() {
    let t = spawn_app().await;

    let response = request(&t.app, "GET", "/api/v1/healthcheck", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
