//! Session cookie helpers.
//!
//! The browser flow keeps the session in `sb-access-token` and
//! `sb-refresh-token` cookies and the PKCE verifier in `sb-code-verifier`
//! between the request (OAuth start, sign-up, password recovery) and the
//! callback.

use axum::http::{header, HeaderMap};

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";
pub const CODE_VERIFIER_COOKIE: &str = "sb-code-verifier";

/// Refresh tokens outlive access tokens; the platform rotates them on use.
pub const REFRESH_TOKEN_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;

/// Long enough for an emailed link to be opened; the platform expires the
/// link itself after an hour.
pub const CODE_VERIFIER_MAX_AGE_SECS: i64 = 60 * 60;

/// Reads a cookie from the `Cookie` request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for an HTTP-only cookie scoped to the whole site.
pub fn set_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!("{name}={value}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes a cookie.
pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}
