// ABOUTME: Provider identity queries: link rows, lookups by external id, unlink, counting
// ABOUTME: Link, unlink, and first-sign-in paths each commit as one transaction
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use sqlx::Row;
use uuid::Uuid;

use super::users::{parse_timestamp, row_to_user};
use super::Database;
use crate::errors::{AuthError, AuthResult};
use crate::models::{Provider, ProviderIdentity, User};

impl Database {
    /// Insert a provider identity and optionally adopt its email, in one
    /// transaction
    ///
    /// The email update is guarded by `email IS NULL`, so a concurrently
    /// set address turns adoption into a no-op. If another account claims
    /// the address mid-flight the unique constraint fails the transaction
    /// and the identity insert rolls back with it.
    ///
    /// # Errors
    ///
    /// Returns an error if a uniqueness constraint is violated or the
    /// commit fails.
    pub async fn create_identity_adopting_email(
        &self,
        identity: &ProviderIdentity,
        adopt_email: Option<&str>,
    ) -> AuthResult<()> {
        let mut tx = self.pool().begin().await?;

        insert_identity(&mut tx, identity).await?;

        if let Some(email) = adopt_email {
            sqlx::query("UPDATE users SET email = ? WHERE id = ? AND email IS NULL")
                .bind(email)
                .bind(identity.user_id.to_string())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Look up an identity by its external `(provider, provider_user_id)` key
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    pub async fn get_identity(
        &self,
        provider: Provider,
        provider_user_id: &str,
    ) -> AuthResult<Option<ProviderIdentity>> {
        let row = sqlx::query(
            "SELECT * FROM provider_identities WHERE provider = ? AND provider_user_id = ?",
        )
        .bind(provider.as_str())
        .bind(provider_user_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| row_to_identity(&r)).transpose()
    }

    /// All identities linked to an account, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    pub async fn get_identities_for_user(&self, user_id: Uuid) -> AuthResult<Vec<ProviderIdentity>> {
        let rows =
            sqlx::query("SELECT * FROM provider_identities WHERE user_id = ? ORDER BY linked_at")
                .bind(user_id.to_string())
                .fetch_all(self.pool())
                .await?;

        rows.iter().map(row_to_identity).collect()
    }

    /// The identity an account holds for one provider, if any
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    pub async fn get_identity_for_user_provider(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> AuthResult<Option<ProviderIdentity>> {
        let row = sqlx::query("SELECT * FROM provider_identities WHERE user_id = ? AND provider = ?")
            .bind(user_id.to_string())
            .bind(provider.as_str())
            .fetch_optional(self.pool())
            .await?;

        row.map(|r| row_to_identity(&r)).transpose()
    }

    /// Remove an account's identity for one provider, refusing to strand
    /// the account
    ///
    /// The existence check, credential count, and delete run inside one
    /// transaction; the password hash is re-read there rather than
    /// trusted from the caller's snapshot.
    ///
    /// # Errors
    ///
    /// - `NotLinked` when the account holds no identity for the provider
    /// - `LastCredentialGuard` when removal would leave the account with
    ///   no password and no remaining identity
    pub async fn delete_identity_guarded(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> AuthResult<()> {
        let mut tx = self.pool().begin().await?;

        let linked =
            sqlx::query("SELECT id FROM provider_identities WHERE user_id = ? AND provider = ?")
                .bind(user_id.to_string())
                .bind(provider.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        if linked.is_none() {
            return Err(AuthError::NotLinked);
        }

        let user_row = sqlx::query("SELECT password_hash FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        let password_hash: Option<String> = user_row.get("password_hash");

        let count_row =
            sqlx::query("SELECT COUNT(*) as count FROM provider_identities WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_one(&mut *tx)
                .await?;
        let linked_count: i64 = count_row.get("count");

        // Count what would remain after removal
        if linked_count - 1 == 0 && password_hash.is_none() {
            return Err(AuthError::LastCredentialGuard);
        }

        sqlx::query("DELETE FROM provider_identities WHERE user_id = ? AND provider = ?")
            .bind(user_id.to_string())
            .bind(provider.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// How many identities an account has linked
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    pub async fn count_identities_for_user(&self, user_id: Uuid) -> AuthResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM provider_identities WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(self.pool())
            .await?;

        Ok(row.get("count"))
    }

    /// Create an account and its first identity in one transaction
    ///
    /// First social sign-ins must never leave a credential-less account
    /// behind, so both inserts commit or neither does.
    ///
    /// # Errors
    ///
    /// Returns an error if either insert or the commit fails; the
    /// transaction rolls back on drop.
    pub async fn create_user_with_identity(
        &self,
        user: &User,
        identity: &ProviderIdentity,
    ) -> AuthResult<()> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r"
            INSERT INTO users (id, username, email, display_name, avatar_url,
                               password_hash, token_version, is_active, created_at, last_active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .bind(&user.password_hash)
        .bind(user.token_version)
        .bind(user.is_active)
        .bind(user.created_at.to_rfc3339())
        .bind(user.last_active.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        insert_identity(&mut tx, identity).await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn insert_identity(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    identity: &ProviderIdentity,
) -> AuthResult<()> {
    sqlx::query(
        r"
        INSERT INTO provider_identities (id, provider, provider_user_id, profile, user_id, linked_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(identity.id.to_string())
    .bind(identity.provider.as_str())
    .bind(&identity.provider_user_id)
    .bind(identity.profile.to_string())
    .bind(identity.user_id.to_string())
    .bind(identity.linked_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn row_to_identity(row: &sqlx::sqlite::SqliteRow) -> AuthResult<ProviderIdentity> {
    let id_str: String = row.get("id");
    let provider_str: String = row.get("provider");
    let user_id_str: String = row.get("user_id");
    let profile_str: String = row.get("profile");
    let linked_at_str: String = row.get("linked_at");

    Ok(ProviderIdentity {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| AuthError::Database(format!("invalid identity id {id_str}: {e}")))?,
        provider: provider_str.parse()?,
        provider_user_id: row.get("provider_user_id"),
        profile: serde_json::from_str(&profile_str)
            .map_err(|e| AuthError::Database(format!("invalid profile blob: {e}")))?,
        user_id: Uuid::parse_str(&user_id_str)
            .map_err(|e| AuthError::Database(format!("invalid user id {user_id_str}: {e}")))?,
        linked_at: parse_timestamp(&linked_at_str)?,
    })
}

impl Database {
    /// Fetch the owner of an identity together with the identity row
    ///
    /// Backs the resolver's returning-user fast path.
    ///
    /// # Errors
    ///
    /// Returns an error on query failure or if the owning user row is
    /// missing (schema guarantees it exists).
    pub async fn get_identity_with_owner(
        &self,
        provider: Provider,
        provider_user_id: &str,
    ) -> AuthResult<Option<(ProviderIdentity, User)>> {
        let Some(identity) = self.get_identity(provider, provider_user_id).await? else {
            return Ok(None);
        };

        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(identity.user_id.to_string())
            .fetch_one(self.pool())
            .await?;

        let user = row_to_user(&row)?;
        Ok(Some((identity, user)))
    }
}
