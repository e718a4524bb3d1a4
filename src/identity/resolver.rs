// ABOUTME: Resolves a verified provider profile to a local account, creating one if needed
// ABOUTME: Applies per-provider trust rules before any email is used for matching
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

//! # Identity Resolution
//!
//! Given a verified provider profile, find or create the local account:
//!
//! 1. Fast path: the `(provider, provider_user_id)` pair is already
//!    linked, so this is a returning user.
//! 2. Email match: only a provider-verified email may claim an existing
//!    account, and only when that account has no conflicting owner.
//!    WeChat supplies no email, so WeChat sign-ins never email-match.
//! 3. Otherwise a fresh account is created together with the identity,
//!    in one transaction.

use tracing::info;
use uuid::Uuid;

use crate::database::Database;
use crate::errors::{AuthError, AuthResult};
use crate::models::{ProviderIdentity, User};
use crate::oauth::ProviderProfile;

/// Resolves provider profiles to local accounts
#[derive(Clone)]
pub struct IdentityResolver {
    database: Database,
}

impl IdentityResolver {
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    /// Resolve a profile to an account, creating one on first sign-in
    ///
    /// Returns the account and whether it was created by this call.
    ///
    /// # Errors
    ///
    /// - `UnverifiedEmail` when a Google profile carries no
    ///   provider-verified email
    /// - `EmailConflict` when the verified email belongs to an account
    ///   that cannot be claimed through this flow
    /// - `Database` on persistence failure
    pub async fn resolve(&self, profile: &ProviderProfile) -> AuthResult<(User, bool)> {
        let provider = profile.provider();
        let provider_user_id = profile.provider_user_id();

        // Fast path: returning user
        if let Some((_, user)) = self
            .database
            .get_identity_with_owner(provider, provider_user_id)
            .await?
        {
            self.database.update_last_active(user.id).await?;
            info!(%provider, user_id = %user.id, "Returning user signed in");
            return Ok((user, false));
        }

        // Trust rule: Google identities must carry a verified email
        // before we will match or create anything with it
        let verified_email = match profile {
            ProviderProfile::Google(google) => {
                let email = google.verified_email().ok_or(AuthError::UnverifiedEmail)?;
                Some(email.to_owned())
            }
            ProviderProfile::Wechat(_) => None,
        };

        // A verified email that already belongs to an account never
        // claims it through sign-in; the owner links this provider from
        // settings instead.
        if let Some(email) = &verified_email {
            if self.database.get_user_by_email(email).await?.is_some() {
                return Err(AuthError::EmailConflict {
                    field: "email".to_owned(),
                });
            }
        }

        // First sign-in: create the account and identity atomically
        let username = synthesize_username(provider.as_str());
        let mut user = User::new(username, verified_email, Some(profile.display_name()));
        user.avatar_url = profile.avatar_url().map(str::to_owned);

        let identity = ProviderIdentity {
            id: Uuid::new_v4(),
            provider,
            provider_user_id: provider_user_id.to_owned(),
            profile: profile.to_value()?,
            user_id: user.id,
            linked_at: user.created_at,
        };

        self.database
            .create_user_with_identity(&user, &identity)
            .await?;

        info!(%provider, user_id = %user.id, "Created account from first sign-in");
        Ok((user, true))
    }
}

/// Synthesize a unique username for social sign-ups, e.g. `wechat_a1b2c3d4`
fn synthesize_username(provider: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{provider}_{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_username_shape() {
        let name = synthesize_username("wechat");
        assert!(name.starts_with("wechat_"));
        assert_eq!(name.len(), "wechat_".len() + 8);
    }

    #[test]
    fn test_synthesized_usernames_unique() {
        assert_ne!(synthesize_username("google"), synthesize_username("google"));
    }
}
