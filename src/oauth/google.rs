// ABOUTME: Google OAuth adapter: POST form exchange, error-on-200 handling, verified emails
// ABOUTME: Forces refresh-token issuance with access_type=offline and prompt=consent
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use serde::Deserialize;
use tracing::warn;
use url::Url;

use super::{GoogleEmail, GoogleProfile, OAuthProvider, ProviderProfile, ProviderToken};
use crate::config::oauth::OAuthProviderConfig;
use crate::constants::endpoints::{
    GOOGLE_AUTHORIZE_URL, GOOGLE_TOKEN_URL, GOOGLE_USERINFO_URL,
};
use crate::errors::{AuthError, AuthResult};
use crate::models::Provider;
use crate::utils::http_client::oauth_client;

/// Google token endpoint response
///
/// Google can return `{error, error_description}` on an HTTP 200 body,
/// so success fields are optional.
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Google v2 userinfo response
#[derive(Debug, Deserialize)]
struct GoogleUserInfoResponse {
    id: Option<String>,
    email: Option<String>,
    verified_email: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
    error: Option<serde_json::Value>,
}

/// Google OAuth adapter
pub struct GoogleOAuthProvider {
    config: OAuthProviderConfig,
    client: reqwest::Client,
}

impl GoogleOAuthProvider {
    #[must_use]
    pub fn new(config: OAuthProviderConfig) -> Self {
        Self {
            config,
            client: oauth_client(),
        }
    }

    fn credentials(&self) -> AuthResult<(&str, &str)> {
        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or_else(|| AuthError::Config("GOOGLE_CLIENT_ID is not configured".to_owned()))?;
        let client_secret = self.config.client_secret.as_deref().ok_or_else(|| {
            AuthError::Config("GOOGLE_CLIENT_SECRET is not configured".to_owned())
        })?;
        Ok((client_id, client_secret))
    }

    /// Parse a token response body, treating an `error` field as failure
    fn parse_token_response(body: &str) -> AuthResult<ProviderToken> {
        let response: GoogleTokenResponse = serde_json::from_str(body).map_err(|e| {
            AuthError::AuthorizationFailed(format!("unparseable Google token response: {e}"))
        })?;

        if let Some(error) = response.error {
            warn!(
                error = %error,
                description = response.error_description.as_deref().unwrap_or(""),
                "Google token exchange rejected"
            );
            return Err(AuthError::AuthorizationFailed(format!(
                "Google error {error}"
            )));
        }

        let access_token = response.access_token.ok_or_else(|| {
            AuthError::AuthorizationFailed("Google response missing access_token".to_owned())
        })?;

        Ok(ProviderToken {
            access_token,
            refresh_token: response.refresh_token,
            openid: None,
            scope: response.scope,
        })
    }

    /// Parse a userinfo response into the structured-email profile
    ///
    /// The single `email`/`verified_email` pair Google returns is
    /// normalized into the email list: trust decisions downstream read
    /// each entry's own verified flag, never the bare field.
    fn parse_userinfo_response(body: &str) -> AuthResult<GoogleProfile> {
        let response: GoogleUserInfoResponse = serde_json::from_str(body).map_err(|e| {
            AuthError::ProfileFetchFailed(format!("unparseable Google userinfo response: {e}"))
        })?;

        if let Some(error) = response.error {
            warn!(error = %error, "Google userinfo rejected");
            return Err(AuthError::ProfileFetchFailed(
                "Google userinfo error".to_owned(),
            ));
        }

        let sub = response.id.ok_or_else(|| {
            AuthError::ProfileFetchFailed("Google userinfo missing subject id".to_owned())
        })?;

        let emails = response
            .email
            .map(|value| {
                vec![GoogleEmail {
                    value,
                    verified: response.verified_email.unwrap_or(false),
                }]
            })
            .unwrap_or_default();

        Ok(GoogleProfile {
            sub,
            name: response.name,
            picture: response.picture,
            emails,
        })
    }
}

#[async_trait::async_trait]
impl OAuthProvider for GoogleOAuthProvider {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn authorization_url(&self, state: &str) -> AuthResult<String> {
        let (client_id, _) = self.credentials()?;
        let redirect_uri = self.config.redirect_uri.as_deref().ok_or_else(|| {
            AuthError::Config("Google redirect URI is not configured".to_owned())
        })?;

        let mut url = Url::parse(GOOGLE_AUTHORIZE_URL)
            .map_err(|e| AuthError::Internal(format!("invalid Google authorize URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state)
            // Force refresh-token issuance on every login
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> AuthResult<ProviderToken> {
        let (client_id, client_secret) = self.credentials()?;
        let redirect_uri = self.config.redirect_uri.as_deref().ok_or_else(|| {
            AuthError::Config("Google redirect URI is not configured".to_owned())
        })?;

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let body = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::AuthorizationFailed(format!("Google token request: {e}")))?
            .text()
            .await
            .map_err(|e| AuthError::AuthorizationFailed(format!("Google token body: {e}")))?;

        Self::parse_token_response(&body)
    }

    async fn fetch_profile(&self, token: &ProviderToken) -> AuthResult<ProviderProfile> {
        let body = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AuthError::ProfileFetchFailed(format!("Google userinfo request: {e}")))?
            .text()
            .await
            .map_err(|e| AuthError::ProfileFetchFailed(format!("Google userinfo body: {e}")))?;

        Ok(ProviderProfile::Google(Self::parse_userinfo_response(
            &body,
        )?))
    }
}
