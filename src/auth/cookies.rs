//! `accessToken` / `refreshToken` cookie handling.

use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue};

use super::{claims::TokenKind, jwt::JwtKeys};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Reads a cookie value from the `Cookie` request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}

fn build(name: &str, value: &str, max_age: Duration, secure: bool) -> HeaderValue {
    let mut cookie = format!(
        "{name}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        max_age.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    // JWTs and the fixed attributes are plain ASCII
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `Set-Cookie` values carrying a freshly issued token pair.
pub fn session_cookies(
    keys: &JwtKeys,
    access_token: &str,
    refresh_token: &str,
    secure: bool,
) -> [(header::HeaderName, HeaderValue); 2] {
    [
        (
            header::SET_COOKIE,
            build(ACCESS_COOKIE, access_token, keys.ttl(TokenKind::Access), secure),
        ),
        (
            header::SET_COOKIE,
            build(REFRESH_COOKIE, refresh_token, keys.ttl(TokenKind::Refresh), secure),
        ),
    ]
}

/// `Set-Cookie` values expiring both session cookies.
pub fn cleared_cookies(secure: bool) -> [(header::HeaderName, HeaderValue); 2] {
    [
        (header::SET_COOKIE, build(ACCESS_COOKIE, "", Duration::ZERO, secure)),
        (header::SET_COOKIE, build(REFRESH_COOKIE, "", Duration::ZERO, secure)),
    ]
}
