// ABOUTME: HTTP route modules and the shared bearer-token authentication helper
// ABOUTME: Token version is checked against the live account row on every request
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

pub mod auth;
pub mod health;
pub mod oauth;

use axum::http::HeaderMap;

use crate::auth::{AuthManager, TokenUse};
use crate::errors::{AuthError, AuthResult};
use crate::models::User;
use crate::server::ServerResources;

/// Authenticate a request from its `Authorization: Bearer` header
///
/// Validates the access token, then re-checks `token_version` against
/// the account row so revoked tokens die even before they expire.
///
/// # Errors
///
/// Returns `InvalidToken` for missing/malformed/revoked tokens or an
/// inactive account.
pub(crate) async fn authenticate(
    resources: &ServerResources,
    headers: &HeaderMap,
) -> AuthResult<User> {
    let token = extract_bearer_token(headers)?;
    let claims = resources
        .auth_manager
        .validate_token(token, TokenUse::Access)?;
    let user_id = AuthManager::user_id_from_claims(&claims)?;

    let user = resources
        .database
        .get_user(user_id)
        .await?
        .ok_or_else(|| AuthError::InvalidToken("unknown account".to_owned()))?;

    if !user.is_active {
        return Err(AuthError::InvalidToken("account is inactive".to_owned()));
    }
    if claims.token_version != user.token_version {
        return Err(AuthError::InvalidToken("token has been revoked".to_owned()));
    }

    Ok(user)
}

/// Pull the bearer token out of the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> AuthResult<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("missing bearer token".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc123");
    }

    #[test]
    fn test_missing_and_malformed_headers_rejected() {
        assert!(extract_bearer_token(&HeaderMap::new()).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic abc123".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_err());
    }
}
