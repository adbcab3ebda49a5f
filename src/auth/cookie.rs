use axum::http::{header, HeaderMap};

use crate::config::AppConfig;

pub const AUTH_COOKIE_NAME: &str = "jwt";

/// Sentinel written on logout; fails verification like any garbage token,
/// and the short Max-Age makes the client drop it almost immediately.
pub const LOGOUT_SENTINEL: &str = "loggedOut";
const LOGOUT_COOKIE_MAX_AGE_SECS: i64 = 10;

/// Build the `Set-Cookie` value carrying a signed token. HTTP-only always;
/// `Secure` only when running in production.
pub fn create_auth_cookie(token: &str, config: &AppConfig) -> String {
    let max_age = config.jwt.cookie_expires_in_days * 24 * 60 * 60;
    let mut parts = vec![
        format!("{AUTH_COOKIE_NAME}={token}"),
        "Path=/".to_string(),
        "HttpOnly".to_string(),
        format!("Max-Age={max_age}"),
    ];
    if config.is_production() {
        parts.push("Secure".to_string());
    }
    parts.join("; ")
}

pub fn create_logout_cookie() -> String {
    format!("{AUTH_COOKIE_NAME}={LOGOUT_SENTINEL}; Path=/; HttpOnly; Max-Age={LOGOUT_COOKIE_MAX_AGE_SECS}")
}

/// Pull the session token out of the `Cookie` request header, if present.
pub fn token_from_cookie_header(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    for cookie in cookies.split(';') {
        let mut parts = cookie.trim().splitn(2, '=');
        if parts.next() == Some(AUTH_COOKIE_NAME) {
            return parts.next().map(|v| v.to_string());
        }
    }
    None
}
