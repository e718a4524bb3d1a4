// ABOUTME: Builds and parses the HttpOnly refresh-token cookie
// ABOUTME: The refresh token travels in this cookie only, never in a response body
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use axum::http::HeaderMap;

use crate::constants::cookies::{REFRESH_PATH, REFRESH_TOKEN};
use crate::constants::time::REFRESH_TOKEN_EXPIRY_DAYS;

/// Set-Cookie value carrying the refresh token
///
/// `HttpOnly` keeps it away from scripts, `SameSite=Lax` still lets the
/// OAuth redirect flow carry it, and the path scopes it to the auth
/// endpoints.
#[must_use]
pub fn build_refresh_cookie(refresh_token: &str, secure: bool) -> String {
    let max_age = REFRESH_TOKEN_EXPIRY_DAYS * 24 * 60 * 60;
    let mut cookie = format!(
        "{REFRESH_TOKEN}={refresh_token}; HttpOnly; SameSite=Lax; Path={REFRESH_PATH}; Max-Age={max_age}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Set-Cookie value that clears the refresh token
#[must_use]
pub fn clear_refresh_cookie() -> String {
    format!("{REFRESH_TOKEN}=; HttpOnly; SameSite=Lax; Path={REFRESH_PATH}; Max-Age=0")
}

/// Extract a cookie value from request headers
#[must_use]
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = build_refresh_cookie("tok123", true);
        assert!(cookie.starts_with("refresh_token=tok123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/api/auth"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_insecure_dev_cookie_has_no_secure_flag() {
        let cookie = build_refresh_cookie("tok123", false);
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        assert!(clear_refresh_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_get_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "a=1; refresh_token=tok; b=2".parse().unwrap());
        assert_eq!(
            get_cookie_value(&headers, "refresh_token").as_deref(),
            Some("tok")
        );
        assert_eq!(get_cookie_value(&headers, "missing"), None);
    }
}
