// ABOUTME: SQLite persistence layer built on sqlx with inline schema migrations
// ABOUTME: Owns the users and provider_identities tables and their uniqueness rules
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

//! # Database Layer
//!
//! SQLite via `sqlx`, created on first connect (`mode=rwc`). Two
//! uniqueness rules matter for correctness and are enforced at the
//! schema level, not just in application code:
//!
//! - `(provider, provider_user_id)` is globally unique: one external
//!   identity belongs to at most one local account
//! - `(user_id, provider)` is unique: an account holds at most one
//!   identity per provider

pub mod provider_identities;
pub mod users;

use sqlx::sqlite::SqlitePool;
use tracing::info;

use crate::errors::AuthResult;

/// Database connection manager
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or any migration fails.
    pub async fn new(database_url: &str) -> AuthResult<Self> {
        // rwc creates the database file on first run
        let connect_url = if database_url.starts_with("sqlite:")
            && !database_url.contains('?')
            && !database_url.contains(":memory:")
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        let pool = SqlitePool::connect(&connect_url).await?;
        let database = Self { pool };
        database.migrate().await?;

        info!("Database connected and migrated");
        Ok(database)
    }

    /// Underlying connection pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run all schema migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails.
    pub async fn migrate(&self) -> AuthResult<()> {
        self.migrate_users().await?;
        self.migrate_provider_identities().await?;
        Ok(())
    }

    async fn migrate_users(&self) -> AuthResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE,
                display_name TEXT,
                avatar_url TEXT,
                password_hash TEXT,
                token_version INTEGER NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                last_active TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn migrate_provider_identities(&self) -> AuthResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS provider_identities (
                id TEXT PRIMARY KEY,
                provider TEXT NOT NULL,
                provider_user_id TEXT NOT NULL,
                profile TEXT NOT NULL,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                linked_at TEXT NOT NULL,
                UNIQUE(provider, provider_user_id),
                UNIQUE(user_id, provider)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_provider_identities_user_id
             ON provider_identities(user_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
