// ABOUTME: OAuth sign-in routes: authorize redirect, callback, unlink, identity listing
// ABOUTME: The callback is the only place a state token is ever consumed
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::authenticate;
use crate::analytics::AuthEvent;
use crate::errors::{AuthError, AuthResult};
use crate::models::{LinkedIdentitySummary, Provider, User};
use crate::security::cookies::build_refresh_cookie;
use crate::server::ServerResources;

pub fn router() -> Router<Arc<ServerResources>> {
    Router::new()
        .route("/api/auth/:provider", get(authorize))
        .route("/api/auth/:provider/callback", get(callback))
        .route("/api/auth/:provider/link", delete(unlink))
        .route("/api/auth/identities", get(list_identities))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    /// Providers report user denial and other upstream failures here
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct SignInResponse {
    access_token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
    user: UserSummary,
    created: bool,
}

#[derive(Debug, Serialize)]
struct UserSummary {
    id: String,
    username: String,
    email: Option<String>,
    display_name: Option<String>,
    avatar_url: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Begin the sign-in or linking flow for a provider
///
/// A valid `Authorization` header turns this into a linking flow: the
/// issued state is bound to the caller's account and the callback will
/// link instead of signing in. Anonymous requests get a plain sign-in
/// state.
async fn authorize(
    State(resources): State<Arc<ServerResources>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> AuthResult<Redirect> {
    let provider: Provider = provider.parse()?;
    let adapter = resources.providers.get(provider)?;

    // Linking flow only when the caller presents a valid token;
    // anonymous and invalid tokens both fall back to plain sign-in
    let bound_user_id = match authenticate(&resources, &headers).await {
        Ok(user) => Some(user.id),
        Err(_) => None,
    };

    let state = resources.state_store.issue(provider, bound_user_id).await?;
    let url = adapter.authorization_url(&state)?;

    resources
        .analytics
        .track(AuthEvent::SignInStarted, Some(provider), None);
    info!(%provider, linking = bound_user_id.is_some(), "Authorization redirect issued");

    Ok(Redirect::temporary(&url))
}

/// Provider callback: consume the state, exchange the code, resolve or
/// link, and issue the token pair
///
/// The state is consumed before any provider call; an invalid state
/// short-circuits the flow without touching the provider.
async fn callback(
    State(resources): State<Arc<ServerResources>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> AuthResult<Response> {
    let provider: Provider = provider.parse()?;

    if let Some(error) = params.error {
        warn!(%provider, error = %error, "Provider reported authorization failure");
        return Err(AuthError::AuthorizationFailed(format!(
            "provider reported: {error}"
        )));
    }

    let state = params
        .state
        .ok_or_else(|| AuthError::InvalidInput("missing state parameter".to_owned()))?;
    let code = params
        .code
        .ok_or_else(|| AuthError::InvalidInput("missing code parameter".to_owned()))?;

    let record = resources.state_store.consume(&state, provider).await?;

    let adapter = resources.providers.get(provider)?;
    let token = adapter.exchange_code(&code).await?;
    let profile = adapter.fetch_profile(&token).await?;

    let (user, created) = match record.bound_user_id {
        Some(user_id) => {
            let user = resources
                .database
                .get_user(user_id)
                .await?
                .ok_or_else(|| AuthError::InvalidToken("unknown account".to_owned()))?;
            resources.linker.link(&user, &profile).await?;
            resources.analytics.track(
                AuthEvent::IdentityLinked,
                Some(provider),
                Some(user.id.to_string()),
            );
            // Re-read so an adopted email shows up in the response
            let user = resources
                .database
                .get_user(user_id)
                .await?
                .ok_or_else(|| AuthError::Internal("account vanished".to_owned()))?;
            (user, false)
        }
        None => {
            let (user, created) = resources.resolver.resolve(&profile).await?;
            let event = if created {
                AuthEvent::SignUpCompleted
            } else {
                AuthEvent::SignInCompleted
            };
            resources
                .analytics
                .track(event, Some(provider), Some(user.id.to_string()));
            (user, created)
        }
    };

    let pair = resources.auth_manager.issue_token_pair(&user)?;
    let secure = resources.config.base_url.starts_with("https://");
    let cookie = build_refresh_cookie(&pair.refresh_token, secure);

    let body = SignInResponse {
        access_token: pair.access_token,
        expires_at: pair.access_expires_at,
        user: UserSummary::from(&user),
        created,
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Unlink the caller's identity for a provider
async fn unlink(
    State(resources): State<Arc<ServerResources>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> AuthResult<Response> {
    let provider: Provider = provider.parse()?;
    let user = authenticate(&resources, &headers).await?;

    resources.linker.unlink(&user, provider).await?;
    resources.analytics.track(
        AuthEvent::IdentityUnlinked,
        Some(provider),
        Some(user.id.to_string()),
    );

    Ok(Json(serde_json::json!({ "unlinked": provider })).into_response())
}

#[derive(Debug, Serialize)]
struct IdentitiesResponse {
    identities: Vec<LinkedIdentitySummary>,
    has_password: bool,
}

/// List the caller's linked identities
async fn list_identities(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> AuthResult<Json<IdentitiesResponse>> {
    let user = authenticate(&resources, &headers).await?;
    let identities = resources.linker.list_linked(user.id).await?;

    Ok(Json(IdentitiesResponse {
        identities,
        has_password: user.has_password(),
    }))
}
