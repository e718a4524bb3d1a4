// ABOUTME: OAuth provider credential configuration loaded from the environment
// ABOUTME: Handles WeChat and Google client id/secret/redirect settings with safe defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sparkpad

use std::env;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::constants::oauth;

/// OAuth provider configuration for social sign-in
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OAuthConfig {
    /// WeChat open-platform configuration
    pub wechat: OAuthProviderConfig,
    /// Google OAuth configuration
    pub google: OAuthProviderConfig,
}

impl OAuthConfig {
    /// Load OAuth configuration from environment
    #[must_use]
    pub fn from_env(base_url: &str) -> Self {
        Self {
            wechat: OAuthProviderConfig::load_wechat(base_url),
            google: OAuthProviderConfig::load_google(base_url),
        }
    }

    /// Validate both providers and log their startup diagnostics
    pub fn validate_and_log(&self) {
        self.wechat.validate_and_log("wechat");
        self.google.validate_and_log("google");
    }
}

/// OAuth provider-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OAuthProviderConfig {
    /// OAuth client ID (`appid` for WeChat)
    pub client_id: Option<String>,
    /// OAuth client secret
    pub client_secret: Option<String>,
    /// Callback URL registered with the provider
    pub redirect_uri: Option<String>,
    /// OAuth scopes
    pub scopes: Vec<String>,
    /// Enable this provider
    pub enabled: bool,
}

impl OAuthProviderConfig {
    /// Load WeChat configuration from environment
    ///
    /// WeChat calls the client id an `appid`; the env names follow that.
    #[must_use]
    pub fn load_wechat(base_url: &str) -> Self {
        Self {
            client_id: env::var("WECHAT_APP_ID").ok(),
            client_secret: env::var("WECHAT_APP_SECRET").ok(),
            redirect_uri: Some(
                env::var("WECHAT_REDIRECT_URI")
                    .unwrap_or_else(|_| format!("{base_url}/api/auth/wechat/callback")),
            ),
            scopes: parse_scopes(oauth::WECHAT_DEFAULT_SCOPES),
            enabled: env::var("WECHAT_APP_ID").is_ok() && env::var("WECHAT_APP_SECRET").is_ok(),
        }
    }

    /// Load Google configuration from environment
    #[must_use]
    pub fn load_google(base_url: &str) -> Self {
        Self {
            client_id: env::var("GOOGLE_CLIENT_ID").ok(),
            client_secret: env::var("GOOGLE_CLIENT_SECRET").ok(),
            redirect_uri: Some(
                env::var("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|_| format!("{base_url}/api/auth/google/callback")),
            ),
            scopes: parse_scopes(oauth::GOOGLE_DEFAULT_SCOPES),
            enabled: env::var("GOOGLE_CLIENT_ID").is_ok()
                && env::var("GOOGLE_CLIENT_SECRET").is_ok(),
        }
    }

    /// Compute SHA256 fingerprint of the client secret (first 8 hex chars)
    ///
    /// Lets operators compare configured secrets without logging values.
    #[must_use]
    pub fn secret_fingerprint(&self) -> Option<String> {
        self.client_secret.as_ref().map(|secret| {
            let mut hasher = Sha256::new();
            hasher.update(secret.as_bytes());
            let result = hasher.finalize();
            format!("{result:x}").chars().take(8).collect()
        })
    }

    /// Validate credentials and log diagnostics at startup
    pub fn validate_and_log(&self, provider_name: &str) -> bool {
        if !self.enabled {
            info!("OAuth provider {provider_name} is disabled (credentials not set)");
            return true;
        }

        let Some(client_id) = self.client_id.as_deref().filter(|id| !id.is_empty()) else {
            warn!("OAuth provider {provider_name}: client_id is missing or empty");
            return false;
        };

        let Some(client_secret) = self
            .client_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
        else {
            warn!("OAuth provider {provider_name}: client_secret is missing or empty");
            return false;
        };

        let fingerprint = self
            .secret_fingerprint()
            .unwrap_or_else(|| "none".to_owned());
        info!(
            "OAuth provider {provider_name}: enabled=true, client_id={client_id}, \
             secret_length={}, secret_fingerprint={fingerprint}",
            client_secret.len()
        );
        true
    }
}

/// Split a space-separated scope string into a vector
fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scopes() {
        assert_eq!(
            parse_scopes("openid email profile"),
            vec!["openid", "email", "profile"]
        );
        assert_eq!(parse_scopes("snsapi_login"), vec!["snsapi_login"]);
    }

    #[test]
    fn test_secret_fingerprint_is_stable_and_short() {
        let config = OAuthProviderConfig {
            client_secret: Some("super-secret".to_owned()),
            ..Default::default()
        };
        let fp = config.secret_fingerprint().unwrap();
        assert_eq!(fp.len(), 8);
        assert_eq!(fp, config.secret_fingerprint().unwrap());
    }
}
