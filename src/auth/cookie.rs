//! Cookie handling for the bearer-token pair.

use axum::http::{HeaderMap, header};

/// Cookie name for the access token (short-lived).
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Cookie name for the refresh token (long-lived).
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Extract the bearer access token: `accessToken` cookie first, then the
/// `Authorization: Bearer` header.
pub fn bearer_token<'a>(headers: &'a HeaderMap) -> Option<&'a str> {
    if let Some(token) = get_cookie(headers, ACCESS_COOKIE_NAME) {
        return Some(token);
    }
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Build a Set-Cookie value for a token cookie.
pub fn token_cookie(name: &str, value: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        name, value, max_age, secure
    )
}

/// Build a Set-Cookie value that expires a token cookie.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    token_cookie(name, "", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie_simple() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("accessToken=abc123"));

        assert_eq!(get_cookie(&headers, "accessToken"), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; accessToken=abc123; refreshToken=xyz789"),
        );

        assert_eq!(get_cookie(&headers, "accessToken"), Some("abc123"));
        assert_eq!(get_cookie(&headers, "refreshToken"), Some("xyz789"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
    }

    #[test]
    fn test_get_cookie_not_found() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("foo=bar"));

        assert_eq!(get_cookie(&headers, "accessToken"), None);
    }

    #[test]
    fn test_get_cookie_no_header() {
        let headers = HeaderMap::new();
        assert_eq!(get_cookie(&headers, "accessToken"), None);
    }

    #[test]
    fn test_get_cookie_with_spaces() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("  accessToken = abc123  ; foo=bar"),
        );

        assert_eq!(get_cookie(&headers, "accessToken"), Some("abc123"));
    }

    #[test]
    fn test_bearer_token_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("accessToken=from-cookie"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );

        assert_eq!(bearer_token(&headers), Some("from-cookie"));
    }

    #[test]
    fn test_bearer_token_falls_back_to_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );

        assert_eq!(bearer_token(&headers), Some("from-header"));
    }

    #[test]
    fn test_bearer_token_requires_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );

        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_clear_cookie_expires() {
        let cookie = clear_cookie(ACCESS_COOKIE_NAME, false);
        assert!(cookie.starts_with("accessToken=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_secure_flag() {
        assert!(token_cookie("accessToken", "t", 60, true).contains("; Secure"));
        assert!(!token_cookie("accessToken", "t", 60, false).contains("; Secure"));
    }
}
