// ABOUTME: JWT issuance and validation for access/refresh token pairs
// ABOUTME: Embeds a per-user token_version so one counter bump revokes everything
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

//! # Token Issuance
//!
//! HS256 JWTs signed with the server secret. Access tokens are
//! short-lived and sent in the `Authorization` header; refresh tokens
//! are long-lived and travel only in an `HttpOnly` cookie. Every token
//! carries the account's `token_version` at issue time; tokens whose
//! version trails the account's current counter are rejected.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::service;
use crate::constants::time::{ACCESS_TOKEN_EXPIRY_MINUTES, REFRESH_TOKEN_EXPIRY_DAYS};
use crate::errors::{AuthError, AuthResult};
use crate::models::User;

/// Which of the two token roles a JWT plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    /// Display name snapshot at issue time
    pub name: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
    /// Audience
    pub aud: String,
    /// Account token version at issue time
    pub token_version: i64,
    /// Token role; refresh tokens are never accepted where an access
    /// token is expected, and vice versa
    pub token_use: TokenUse,
}

/// Access/refresh pair returned to the client
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    /// Delivered via cookie only, never in a JSON body
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
}

/// Signs and validates the service's JWTs
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthManager {
    #[must_use]
    pub fn new(jwt_secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret),
            decoding_key: DecodingKey::from_secret(jwt_secret),
        }
    }

    /// Issue an access/refresh pair for an account
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue_token_pair(&self, user: &User) -> AuthResult<TokenPair> {
        let now = Utc::now();
        let access_expires_at = now + Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES);
        let refresh_expires_at = now + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);

        let access_token =
            self.sign(user, now, access_expires_at, TokenUse::Access)?;
        let refresh_token =
            self.sign(user, now, refresh_expires_at, TokenUse::Refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
        })
    }

    fn sign(
        &self,
        user: &User,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        token_use: TokenUse,
    ) -> AuthResult<String> {
        let claims = Claims {
            sub: user.id.to_string(),
            name: user
                .display_name
                .clone()
                .unwrap_or_else(|| user.username.clone()),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            aud: service::NAME.to_owned(),
            token_version: user.token_version,
            token_use,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }

    /// Validate a token's signature, expiry, audience, and role
    ///
    /// Version checking against the account's current counter happens at
    /// the call site, which has the account row in hand.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` for any signature, expiry, audience, or
    /// role failure.
    pub fn validate_token(&self, token: &str, expected_use: TokenUse) -> AuthResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[service::NAME]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if data.claims.token_use != expected_use {
            return Err(AuthError::InvalidToken(
                "token presented for the wrong use".to_owned(),
            ));
        }

        Ok(data.claims)
    }

    /// Parse the subject claim into an account id
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the subject is not a UUID.
    pub fn user_id_from_claims(claims: &Claims) -> AuthResult<Uuid> {
        Uuid::parse_str(&claims.sub)
            .map_err(|e| AuthError::InvalidToken(format!("malformed subject: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User::new("google_12345678".into(), None, Some("Ada".into()))
    }

    fn manager() -> AuthManager {
        AuthManager::new(b"test-secret-key-for-unit-tests")
    }

    #[test]
    fn test_issue_and_validate_pair() {
        let user = test_user();
        let pair = manager().issue_token_pair(&user).unwrap();

        let access = manager()
            .validate_token(&pair.access_token, TokenUse::Access)
            .unwrap();
        assert_eq!(access.sub, user.id.to_string());
        assert_eq!(access.token_version, 0);
        assert_eq!(access.name, "Ada");

        let refresh = manager()
            .validate_token(&pair.refresh_token, TokenUse::Refresh)
            .unwrap();
        assert_eq!(refresh.sub, user.id.to_string());
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let pair = manager().issue_token_pair(&test_user()).unwrap();
        let err = manager()
            .validate_token(&pair.refresh_token, TokenUse::Access)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let pair = manager().issue_token_pair(&test_user()).unwrap();
        let other = AuthManager::new(b"a-completely-different-secret");
        assert!(other
            .validate_token(&pair.access_token, TokenUse::Access)
            .is_err());
    }

    #[test]
    fn test_token_version_snapshot() {
        let mut user = test_user();
        user.token_version = 3;
        let pair = manager().issue_token_pair(&user).unwrap();
        let claims = manager()
            .validate_token(&pair.access_token, TokenUse::Access)
            .unwrap();
        assert_eq!(claims.token_version, 3);
    }

    #[test]
    fn test_subject_parses_back_to_user_id() {
        let user = test_user();
        let pair = manager().issue_token_pair(&user).unwrap();
        let claims = manager()
            .validate_token(&pair.access_token, TokenUse::Access)
            .unwrap();
        assert_eq!(AuthManager::user_id_from_claims(&claims).unwrap(), user.id);
    }
}
