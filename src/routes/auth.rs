// ABOUTME: Password-credential routes: register, login, refresh, logout
// ABOUTME: Refresh rotates the pair from the HttpOnly cookie; logout bumps token_version
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::authenticate;
use crate::auth::{AuthManager, TokenUse};
use crate::constants::cookies::REFRESH_TOKEN;
use crate::errors::{AuthError, AuthResult};
use crate::models::User;
use crate::security::cookies::{build_refresh_cookie, clear_refresh_cookie, get_cookie_value};
use crate::server::ServerResources;

pub fn router() -> Router<Arc<ServerResources>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/password", post(set_password))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct SetPasswordRequest {
    password: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
    user_id: String,
}

fn token_response(resources: &ServerResources, user: &User) -> AuthResult<Response> {
    let pair = resources.auth_manager.issue_token_pair(user)?;
    let secure = resources.config.base_url.starts_with("https://");
    let cookie = build_refresh_cookie(&pair.refresh_token, secure);

    let body = TokenResponse {
        access_token: pair.access_token,
        expires_at: pair.access_expires_at,
        user_id: user.id.to_string(),
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Register a new password account
async fn register(
    State(resources): State<Arc<ServerResources>>,
    Json(request): Json<RegisterRequest>,
) -> AuthResult<Response> {
    validate_password(&request.password)?;
    if request.username.trim().is_empty() {
        return Err(AuthError::InvalidInput("username is required".to_owned()));
    }
    if !request.email.contains('@') {
        return Err(AuthError::InvalidInput("invalid email address".to_owned()));
    }

    if resources
        .database
        .get_user_by_email(&request.email)
        .await?
        .is_some()
    {
        return Err(AuthError::EmailConflict {
            field: "email".to_owned(),
        });
    }
    if resources
        .database
        .get_user_by_username(&request.username)
        .await?
        .is_some()
    {
        return Err(AuthError::UsernameConflict);
    }

    let hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))?;

    let mut user = User::new(
        request.username,
        Some(request.email),
        request.display_name,
    );
    user.password_hash = Some(hash);
    resources.database.create_user(&user).await?;

    info!(user_id = %user.id, "Registered password account");
    let response = token_response(&resources, &user)?;
    Ok((StatusCode::CREATED, response).into_response())
}

/// Password login
async fn login(
    State(resources): State<Arc<ServerResources>>,
    Json(request): Json<LoginRequest>,
) -> AuthResult<Response> {
    let user = resources
        .database
        .get_user_by_email(&request.email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    // Social-only accounts have no password to check
    let hash = user
        .password_hash
        .as_deref()
        .ok_or(AuthError::InvalidCredentials)?;

    let valid = bcrypt::verify(&request.password, hash)
        .map_err(|e| AuthError::Internal(format!("password verification failed: {e}")))?;
    if !valid || !user.is_active {
        return Err(AuthError::InvalidCredentials);
    }

    resources.database.update_last_active(user.id).await?;
    token_response(&resources, &user)
}

/// Rotate the token pair from the refresh cookie
///
/// The refresh token is read from the `HttpOnly` cookie only; a token in
/// the body or a header is ignored.
async fn refresh(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> AuthResult<Response> {
    let token = get_cookie_value(&headers, REFRESH_TOKEN)
        .ok_or_else(|| AuthError::InvalidToken("missing refresh cookie".to_owned()))?;

    let claims = resources
        .auth_manager
        .validate_token(&token, TokenUse::Refresh)?;
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

    token_response(&resources, &user)
}

/// Log out: revoke every outstanding token and clear the cookie
async fn logout(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> AuthResult<Response> {
    let user = authenticate(&resources, &headers).await?;
    resources.database.increment_token_version(user.id).await?;

    info!(user_id = %user.id, "Logged out, tokens revoked");
    Ok((
        [(header::SET_COOKIE, clear_refresh_cookie())],
        Json(serde_json::json!({ "logged_out": true })),
    )
        .into_response())
}

/// Set a password on the caller's account
///
/// Gives social-only accounts a second credential, which also satisfies
/// the last-credential guard when unlinking.
async fn set_password(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<SetPasswordRequest>,
) -> AuthResult<Response> {
    let user = authenticate(&resources, &headers).await?;
    validate_password(&request.password)?;

    let hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))?;
    resources.database.set_user_password(user.id, &hash).await?;

    Ok(Json(serde_json::json!({ "password_set": true })).into_response())
}

fn validate_password(password: &str) -> AuthResult<()> {
    if password.len() < 8 {
        return Err(AuthError::InvalidInput(
            "password must be at least 8 characters".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_validation() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
