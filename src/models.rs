// ABOUTME: Core domain models for local accounts and linked provider identities
// ABOUTME: Defines User, ProviderIdentity, and the Provider enum shared across modules
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::AuthError;

/// Supported third-party sign-in providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Wechat,
    Google,
}

impl Provider {
    /// Stable lowercase name used in URLs, database rows, and state records
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wechat => "wechat",
            Self::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wechat" => Ok(Self::Wechat),
            "google" => Ok(Self::Google),
            other => Err(AuthError::UnsupportedProvider(other.to_owned())),
        }
    }
}

/// Local user account
///
/// An account must always retain at least one authentication method:
/// either `password_hash` is set or at least one `ProviderIdentity` is
/// linked. The account linker enforces this on unlink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique account identifier
    pub id: Uuid,
    /// Unique username (synthesized for social sign-ups)
    pub username: String,
    /// Email address, unique when present. Social accounts may have none.
    pub email: Option<String>,
    /// Display name shown in the UI
    pub display_name: Option<String>,
    /// Avatar URL
    pub avatar_url: Option<String>,
    /// Bcrypt password hash; `None` for accounts created via social sign-in
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Monotonic counter embedded in every issued token. Bumping it
    /// invalidates all previously issued tokens without a blacklist.
    pub token_version: i64,
    /// Whether the account is active
    pub is_active: bool,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// Last time the account authenticated
    pub last_active: DateTime<Utc>,
}

impl User {
    /// Whether the account has a password credential
    #[must_use]
    pub const fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Build a fresh account shell with no credentials attached
    #[must_use]
    pub fn new(username: String, email: Option<String>, display_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            display_name,
            avatar_url: None,
            password_hash: None,
            token_version: 0,
            is_active: true,
            created_at: now,
            last_active: now,
        }
    }
}

/// A third-party identity bound to a local account
///
/// `(provider, provider_user_id)` is globally unique: at most one local
/// account may claim it. A user holds at most one identity per provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderIdentity {
    /// Row identifier
    pub id: Uuid,
    /// Which provider issued this identity
    pub provider: Provider,
    /// Opaque external id: `unionid` (or `openid`) for WeChat, `sub` for Google
    pub provider_user_id: String,
    /// Profile blob as returned by the provider, stored as tagged JSON
    pub profile: serde_json::Value,
    /// Owning local account
    pub user_id: Uuid,
    /// When the identity was linked
    pub linked_at: DateTime<Utc>,
}

/// Read-only projection of a linked identity for UI display
#[derive(Debug, Clone, Serialize)]
pub struct LinkedIdentitySummary {
    pub provider: Provider,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub email: Option<String>,
    pub linked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_round_trip() {
        assert_eq!("wechat".parse::<Provider>().unwrap(), Provider::Wechat);
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Google);
        assert!("github".parse::<Provider>().is_err());
        assert_eq!(Provider::Wechat.to_string(), "wechat");
    }

    #[test]
    fn test_new_user_has_no_credentials() {
        let user = User::new("wechat_ab12cd34".into(), None, Some("nick".into()));
        assert!(!user.has_password());
        assert_eq!(user.token_version, 0);
        assert!(user.is_active);
    }
}
