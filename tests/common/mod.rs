#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use teambuilder::db::{Database, UserRole};
use teambuilder::jwt::JwtKeys;
use teambuilder::mail::MailDispatcher;
use teambuilder::{ServerConfig, create_app, password};
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-0123456789abcdef";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtKeys,
}

/// Build the full router over an in-memory database, with rate limiting off
/// and mail dispatch disabled so tests stay hermetic.
pub async fn spawn_app() -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");

    let config = ServerConfig {
        db: db.clone(),
        access_token_secret: ACCESS_SECRET.to_vec(),
        refresh_token_secret: REFRESH_SECRET.to_vec(),
        secure_cookies: false,
        mail: MailDispatcher::disabled(),
        rate_limiting: false,
    };

    TestApp {
        app: create_app(&config),
        db,
        jwt: JwtKeys::new(ACCESS_SECRET, REFRESH_SECRET),
    }
}

/// Send a request through the router. `cookies` is the raw Cookie header.
pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    cookies: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookies) = cookies {
        builder = builder.header("cookie", cookies);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

/// Parse the response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}

/// Extract Set-Cookie headers from a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Get a cookie value out of a Set-Cookie list.
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookies.iter().find_map(|c| {
        c.strip_prefix(&prefix)
            .map(|rest| rest.split(';').next().unwrap_or("").to_string())
    })
}

/// Check if a Set-Cookie list expires the named cookie (Max-Age=0).
pub fn has_cleared_cookie(cookies: &[String], name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=", name)) && c.contains("Max-Age=0"))
}

/// Cookie header carrying just the access token.
pub fn access_cookie(access: &str) -> String {
    format!("accessToken={}", access)
}

/// Cookie header carrying both tokens.
pub fn auth_cookies(access: &str, refresh: &str) -> String {
    format!("accessToken={}; refreshToken={}", access, refresh)
}

/// Cookie header carrying just the refresh token.
pub fn refresh_cookie(refresh: &str) -> String {
    format!("refreshToken={}", refresh)
}

pub async fn register(app: &Router, email: &str, password: &str) -> Response<Body> {
    request(
        app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    )
    .await
}

pub async fn login(app: &Router, email: &str, password: &str) -> Response<Body> {
    request(
        app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    )
    .await
}

/// Register then log in, returning (user_uuid, access_token, refresh_token).
pub async fn register_and_login(app: &Router, email: &str, password: &str) -> (String, String, String) {
    let response = register(app, email, password).await;
    assert_eq!(response.status(), 201, "registration should succeed");
    let body = body_json(response).await;
    let uuid = body["user"]["uuid"].as_str().unwrap().to_string();

    let response = login(app, email, password).await;
    assert_eq!(response.status(), 200, "login should succeed");
    let body = body_json(response).await;

    (
        uuid,
        body["accessToken"].as_str().unwrap().to_string(),
        body["refreshToken"].as_str().unwrap().to_string(),
    )
}

/// Create a verified admin directly in the store and mint an access token
/// for it. Returns (uuid, access_token).
pub async fn create_admin(t: &TestApp, email: &str) -> (String, String) {
    let uuid = uuid::Uuid::new_v4().to_string();
    let username = email.split('@').next().unwrap_or(email);
    let digest = password::hash_password("Password@123").unwrap();

    t.db.users()
        .create_admin(&uuid, email, username, &digest)
        .await
        .unwrap();

    let access = t
        .jwt
        .issue_access_token(&uuid, email, username, UserRole::Admin)
        .unwrap()
        .token;

    (uuid, access)
}
