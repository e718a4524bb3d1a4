// ABOUTME: OAuth provider abstraction: authorization URLs, code exchange, profile fetch
// ABOUTME: Providers register in a registry; profiles are a tagged union, not an untyped blob
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

//! # Provider Adapters
//!
//! Each adapter encapsulates one provider's wire idiosyncrasies behind an
//! identical operation shape. Real protocol differences (WeChat's
//! `#wechat_redirect` fragment and `appid` naming, Google's forced
//! refresh-token issuance) are encoded per adapter rather than normalized
//! away. Both providers signal errors inside HTTP 200 bodies, so a 200
//! status never implies success.

pub mod google;
pub mod wechat;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, AuthResult};
use crate::models::Provider;

/// Token material returned by a provider's code exchange
#[derive(Debug, Clone)]
pub struct ProviderToken {
    /// Provider access token used for the profile fetch
    pub access_token: String,
    /// Refresh token, when the provider issued one
    pub refresh_token: Option<String>,
    /// WeChat returns the `openid` with the token; the userinfo call
    /// requires it alongside the access token
    pub openid: Option<String>,
    /// Granted scopes as reported by the provider
    pub scope: Option<String>,
}

/// Verified user profile, tagged by provider
///
/// The tag makes the identity resolver's per-provider branches
/// exhaustive-checked instead of relying on optional-field probing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderProfile {
    Wechat(WechatProfile),
    Google(GoogleProfile),
}

/// WeChat userinfo payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WechatProfile {
    /// Per-app user id
    pub openid: String,
    /// Cross-app user id, present when the app belongs to an open
    /// platform account
    #[serde(default)]
    pub unionid: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    /// Avatar URL (`headimgurl` on the wire)
    #[serde(default, rename = "avatar", alias = "headimgurl")]
    pub avatar: Option<String>,
}

/// Google userinfo payload, normalized to a structured email list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleProfile {
    /// Google subject id
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    /// Structured emails, each carrying its own verified flag. Trust
    /// decisions read this list, never a bare top-level email field.
    #[serde(default)]
    pub emails: Vec<GoogleEmail>,
}

/// One entry in Google's email list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleEmail {
    pub value: String,
    pub verified: bool,
}

impl GoogleProfile {
    /// First email the provider attests as verified, if any
    #[must_use]
    pub fn verified_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|email| email.verified)
            .map(|email| email.value.as_str())
    }
}

impl ProviderProfile {
    /// Provider that issued this profile
    #[must_use]
    pub const fn provider(&self) -> Provider {
        match self {
            Self::Wechat(_) => Provider::Wechat,
            Self::Google(_) => Provider::Google,
        }
    }

    /// Opaque external user id: `unionid` (falling back to `openid`) for
    /// WeChat, `sub` for Google
    #[must_use]
    pub fn provider_user_id(&self) -> &str {
        match self {
            Self::Wechat(profile) => profile.unionid.as_deref().unwrap_or(&profile.openid),
            Self::Google(profile) => &profile.sub,
        }
    }

    /// Display name with provider-specific fallback defaults
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Wechat(profile) => profile
                .nickname
                .clone()
                .unwrap_or_else(|| "WeChat User".to_owned()),
            Self::Google(profile) => profile
                .name
                .clone()
                .unwrap_or_else(|| "Google User".to_owned()),
        }
    }

    /// Avatar URL, when the provider supplied one
    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        match self {
            Self::Wechat(profile) => profile.avatar.as_deref(),
            Self::Google(profile) => profile.picture.as_deref(),
        }
    }

    /// Tagged JSON blob for persistence
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_value(&self) -> AuthResult<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| AuthError::Internal(format!("profile serialization failed: {e}")))
    }
}

/// Trait for OAuth provider implementations
#[async_trait::async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Which provider this adapter talks to
    fn provider(&self) -> Provider;

    /// Generate a CSRF state token for the authorization URL
    fn generate_state(&self) -> String {
        crate::state::generate_state_token()
    }

    /// Build the browser-redirect authorization URL embedding the state
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is not configured.
    fn authorization_url(&self, state: &str) -> AuthResult<String>;

    /// Exchange an authorization code for provider tokens
    ///
    /// # Errors
    ///
    /// Returns `AuthorizationFailed` on provider rejection or transport
    /// failure; provider error detail is logged, never surfaced.
    async fn exchange_code(&self, code: &str) -> AuthResult<ProviderToken>;

    /// Fetch the user's profile with the exchanged token
    ///
    /// # Errors
    ///
    /// Returns `ProfileFetchFailed` on provider rejection or transport
    /// failure.
    async fn fetch_profile(&self, token: &ProviderToken) -> AuthResult<ProviderProfile>;
}

/// Registry of configured provider adapters
pub struct ProviderRegistry {
    providers: HashMap<Provider, Box<dyn OAuthProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider adapter
    pub fn register(&mut self, provider: Box<dyn OAuthProvider>) {
        self.providers.insert(provider.provider(), provider);
    }

    /// Look up an adapter, failing for unconfigured providers
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedProvider` if no adapter is registered.
    pub fn get(&self, provider: Provider) -> AuthResult<&dyn OAuthProvider> {
        self.providers
            .get(&provider)
            .map(AsRef::as_ref)
            .ok_or_else(|| AuthError::UnsupportedProvider(provider.to_string()))
    }

    /// Providers currently registered
    #[must_use]
    pub fn list(&self) -> Vec<Provider> {
        self.providers.keys().copied().collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
