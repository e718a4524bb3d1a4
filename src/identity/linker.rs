// ABOUTME: Links and unlinks provider identities on an authenticated account
// ABOUTME: Enforces the one-per-provider rule and the last-credential guard
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

//! # Account Linking
//!
//! Linking attaches a freshly verified provider identity to the
//! authenticated account. Unlinking removes one, but never the last
//! sign-in method: an account must always keep a password or at least
//! one linked identity.

use tracing::info;
use uuid::Uuid;

use crate::database::Database;
use crate::errors::{AuthError, AuthResult};
use crate::models::{LinkedIdentitySummary, Provider, ProviderIdentity, User};
use crate::oauth::ProviderProfile;

/// Manages the linked-identity set of an account
#[derive(Clone)]
pub struct AccountLinker {
    database: Database,
}

impl AccountLinker {
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    /// Link a verified provider identity to `user`, returning the linked
    /// identity
    ///
    /// Linking the identity the account already holds is idempotent and
    /// returns the existing row. A Google identity's verified email is
    /// adopted as the account email when the account has none; the
    /// identity insert and the adoption commit as one transaction.
    ///
    /// # Errors
    ///
    /// - `AlreadyLinkedElsewhere` when the identity belongs to a
    ///   different account
    /// - `ProviderAlreadyLinked` when this account already holds a
    ///   different identity for the provider
    /// - `UnverifiedEmail` for a Google identity with no verified email
    /// - `EmailConflict` when the identity's email belongs to another
    ///   account
    pub async fn link(
        &self,
        user: &User,
        profile: &ProviderProfile,
    ) -> AuthResult<ProviderIdentity> {
        let provider = profile.provider();
        let provider_user_id = profile.provider_user_id();

        if let Some(existing) = self.database.get_identity(provider, provider_user_id).await? {
            if existing.user_id == user.id {
                // Re-linking the same identity is a no-op
                return Ok(existing);
            }
            return Err(AuthError::AlreadyLinkedElsewhere);
        }

        if self
            .database
            .get_identity_for_user_provider(user.id, provider)
            .await?
            .is_some()
        {
            return Err(AuthError::ProviderAlreadyLinked);
        }

        let adopted_email = match profile {
            ProviderProfile::Google(google) => {
                let email = google.verified_email().ok_or(AuthError::UnverifiedEmail)?;
                if let Some(owner) = self.database.get_user_by_email(email).await? {
                    if owner.id != user.id {
                        return Err(AuthError::EmailConflict {
                            field: "email".to_owned(),
                        });
                    }
                }
                Some(email.to_owned())
            }
            ProviderProfile::Wechat(_) => None,
        };

        let identity = ProviderIdentity {
            id: Uuid::new_v4(),
            provider,
            provider_user_id: provider_user_id.to_owned(),
            profile: profile.to_value()?,
            user_id: user.id,
            linked_at: chrono::Utc::now(),
        };

        let adopt = if user.email.is_none() {
            adopted_email.as_deref()
        } else {
            None
        };
        self.database
            .create_identity_adopting_email(&identity, adopt)
            .await?;

        info!(%provider, user_id = %user.id, "Linked provider identity");
        Ok(identity)
    }

    /// Unlink the account's identity for `provider`
    ///
    /// The existence check, the guard, and the delete run inside one
    /// database transaction.
    ///
    /// # Errors
    ///
    /// - `NotLinked` when the account holds no identity for the provider
    /// - `LastCredentialGuard` when removal would leave the account with
    ///   no password and no remaining identity
    pub async fn unlink(&self, user: &User, provider: Provider) -> AuthResult<()> {
        self.database
            .delete_identity_guarded(user.id, provider)
            .await?;
        info!(%provider, user_id = %user.id, "Unlinked provider identity");
        Ok(())
    }

    /// Linked identities projected for display
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    pub async fn list_linked(&self, user_id: Uuid) -> AuthResult<Vec<LinkedIdentitySummary>> {
        let identities = self.database.get_identities_for_user(user_id).await?;
        Ok(identities.iter().map(summarize).collect())
    }
}

/// Project an identity row to its display summary
///
/// The stored blob is the tagged profile union; unparseable blobs
/// degrade to an empty summary rather than failing the listing.
fn summarize(identity: &ProviderIdentity) -> LinkedIdentitySummary {
    let profile: Option<ProviderProfile> =
        serde_json::from_value(identity.profile.clone()).ok();

    let (display_name, avatar, email) = match &profile {
        Some(p) => {
            let email = match p {
                ProviderProfile::Google(google) => {
                    google.verified_email().map(str::to_owned)
                }
                ProviderProfile::Wechat(_) => None,
            };
            (
                Some(p.display_name()),
                p.avatar_url().map(str::to_owned),
                email,
            )
        }
        None => (None, None, None),
    };

    LinkedIdentitySummary {
        provider: identity.provider,
        display_name,
        avatar,
        email,
        linked_at: identity.linked_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::WechatProfile;
    use chrono::Utc;

    #[test]
    fn test_summarize_wechat_blob() {
        let profile = ProviderProfile::Wechat(WechatProfile {
            openid: "oid".into(),
            unionid: None,
            nickname: Some("nick".into()),
            avatar: Some("https://img".into()),
        });
        let identity = ProviderIdentity {
            id: Uuid::new_v4(),
            provider: Provider::Wechat,
            provider_user_id: "oid".into(),
            profile: profile.to_value().unwrap(),
            user_id: Uuid::new_v4(),
            linked_at: Utc::now(),
        };
        let summary = summarize(&identity);
        assert_eq!(summary.display_name.as_deref(), Some("nick"));
        assert_eq!(summary.avatar.as_deref(), Some("https://img"));
        assert_eq!(summary.email, None);
    }

    #[test]
    fn test_summarize_unparseable_blob_degrades() {
        let identity = ProviderIdentity {
            id: Uuid::new_v4(),
            provider: Provider::Google,
            provider_user_id: "sub".into(),
            profile: serde_json::json!({"unexpected": true}),
            user_id: Uuid::new_v4(),
            linked_at: Utc::now(),
        };
        let summary = summarize(&identity);
        assert!(summary.display_name.is_none());
        assert!(summary.email.is_none());
    }
}
