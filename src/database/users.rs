// ABOUTME: User account queries: creation, lookup, credential and token-version updates
// ABOUTME: Rows are mapped by hand; timestamps are stored as RFC 3339 text
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::Database;
use crate::errors::{AuthError, AuthResult};
use crate::models::User;

impl Database {
    /// Insert a new user account
    ///
    /// # Errors
    ///
    /// Returns an error if a username or email uniqueness constraint is
    /// violated or the insert otherwise fails.
    pub async fn create_user(&self, user: &User) -> AuthResult<()> {
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
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Look up a user by id
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    pub async fn get_user(&self, user_id: Uuid) -> AuthResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(self.pool())
            .await?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Look up a user by email
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    pub async fn get_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Look up a user by username
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    pub async fn get_user_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.pool())
            .await?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Set an account's password hash
    ///
    /// # Errors
    ///
    /// Returns an error on update failure.
    pub async fn set_user_password(&self, user_id: Uuid, password_hash: &str) -> AuthResult<()> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id.to_string())
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// Bump the account's token version, revoking every outstanding token
    ///
    /// # Errors
    ///
    /// Returns an error on update failure.
    pub async fn increment_token_version(&self, user_id: Uuid) -> AuthResult<()> {
        sqlx::query("UPDATE users SET token_version = token_version + 1 WHERE id = ?")
            .bind(user_id.to_string())
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// Record an authentication on this account
    ///
    /// # Errors
    ///
    /// Returns an error on update failure.
    pub async fn update_last_active(&self, user_id: Uuid) -> AuthResult<()> {
        sqlx::query("UPDATE users SET last_active = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(user_id.to_string())
            .execute(self.pool())
            .await?;

        Ok(())
    }
}

/// Map a `users` row into the domain model
pub(super) fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> AuthResult<User> {
    let id_str: String = row.get("id");
    let created_at_str: String = row.get("created_at");
    let last_active_str: String = row.get("last_active");

    Ok(User {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| AuthError::Database(format!("invalid user id {id_str}: {e}")))?,
        username: row.get("username"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        avatar_url: row.get("avatar_url"),
        password_hash: row.get("password_hash"),
        token_version: row.get("token_version"),
        is_active: row.get("is_active"),
        created_at: parse_timestamp(&created_at_str)?,
        last_active: parse_timestamp(&last_active_str)?,
    })
}

pub(super) fn parse_timestamp(value: &str) -> AuthResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AuthError::Database(format!("invalid timestamp {value}: {e}")))
}
