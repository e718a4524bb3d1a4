// ABOUTME: Environment-sourced server configuration with documented safe defaults
// ABOUTME: Covers HTTP port, database URL, JWT secret, and state-store connection tuning
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::config::oauth::OAuthConfig;
use crate::constants::time::STATE_TTL_SECS;
use crate::errors::{AuthError, AuthResult};

/// Top-level server configuration, environment-only
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// External base URL used to build default redirect URIs
    pub base_url: String,
    /// Database connection URL
    pub database_url: String,
    /// Secret used to sign access and refresh tokens
    pub jwt_secret: String,
    /// OAuth provider credentials
    pub oauth: OAuthConfig,
    /// State store connection settings
    pub state_store: StateStoreSettings,
    /// Optional analytics collector endpoint; events are dropped when unset
    pub analytics_endpoint: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing outside development, or
    /// if numeric variables fail to parse.
    pub fn from_env() -> AuthResult<Self> {
        let http_port = parse_env_or("HTTP_PORT", 8081)?;
        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://localhost:{http_port}"));

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                let environment =
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_owned());
                if environment == "production" {
                    return Err(AuthError::Config(
                        "JWT_SECRET must be set in production".to_owned(),
                    ));
                }
                warn!("JWT_SECRET not set, using insecure development default");
                "sparkpad-dev-secret-do-not-use-in-production".to_owned()
            }
        };

        Ok(Self {
            http_port,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/sparkpad_auth.db".to_owned()),
            jwt_secret,
            oauth: OAuthConfig::from_env(&base_url),
            state_store: StateStoreSettings::from_env()?,
            analytics_endpoint: env::var("ANALYTICS_ENDPOINT").ok(),
            base_url,
        })
    }
}

/// State store connection settings
///
/// The TTL is fixed at 600 s by the protocol; only the connection surface
/// is configurable.
#[derive(Debug, Clone)]
pub struct StateStoreSettings {
    /// Redis connection URL; when unset the in-memory backend is used
    pub redis_url: Option<String>,
    /// State record time-to-live
    pub ttl: Duration,
    /// Redis connection and retry tuning
    pub connection: RedisConnectionConfig,
}

impl StateStoreSettings {
    /// Load state store settings from environment
    ///
    /// `STATE_STORE_REDIS_URL` takes precedence; `REDIS_URL` is honored as
    /// the shared fallback. Host defaults to local when neither is set and
    /// `STATE_STORE_BACKEND=redis` is requested.
    ///
    /// # Errors
    ///
    /// Returns an error if numeric tuning variables fail to parse.
    pub fn from_env() -> AuthResult<Self> {
        let redis_url = env::var("STATE_STORE_REDIS_URL")
            .or_else(|_| env::var("REDIS_URL"))
            .ok()
            .or_else(|| {
                (env::var("STATE_STORE_BACKEND").as_deref() == Ok("redis"))
                    .then(|| "redis://127.0.0.1:6379".to_owned())
            });

        Ok(Self {
            redis_url,
            ttl: Duration::from_secs(STATE_TTL_SECS),
            connection: RedisConnectionConfig::from_env()?,
        })
    }
}

impl Default for StateStoreSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl: Duration::from_secs(STATE_TTL_SECS),
            connection: RedisConnectionConfig::default(),
        }
    }
}

/// Redis connection and retry tuning knobs
#[derive(Debug, Clone)]
pub struct RedisConnectionConfig {
    /// TCP connect timeout in seconds
    pub connection_timeout_secs: u64,
    /// Per-command response timeout in seconds
    pub response_timeout_secs: u64,
    /// Retries during initial connection establishment
    pub initial_connection_retries: u64,
    /// First retry delay in milliseconds
    pub initial_retry_delay_ms: u64,
    /// Retry delay cap in milliseconds
    pub max_retry_delay_ms: u64,
    /// Reconnection retries after an established connection drops
    pub reconnection_retries: usize,
}

impl Default for RedisConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 5,
            response_timeout_secs: 3,
            initial_connection_retries: 3,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 2000,
            reconnection_retries: 6,
        }
    }
}

impl RedisConnectionConfig {
    /// Load Redis tuning from environment, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable fails to parse.
    pub fn from_env() -> AuthResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            connection_timeout_secs: parse_env_or(
                "REDIS_CONNECTION_TIMEOUT_SECS",
                defaults.connection_timeout_secs,
            )?,
            response_timeout_secs: parse_env_or(
                "REDIS_RESPONSE_TIMEOUT_SECS",
                defaults.response_timeout_secs,
            )?,
            initial_connection_retries: parse_env_or(
                "REDIS_INITIAL_CONNECTION_RETRIES",
                defaults.initial_connection_retries,
            )?,
            initial_retry_delay_ms: parse_env_or(
                "REDIS_INITIAL_RETRY_DELAY_MS",
                defaults.initial_retry_delay_ms,
            )?,
            max_retry_delay_ms: parse_env_or(
                "REDIS_MAX_RETRY_DELAY_MS",
                defaults.max_retry_delay_ms,
            )?,
            reconnection_retries: parse_env_or(
                "REDIS_RECONNECTION_RETRIES",
                defaults.reconnection_retries,
            )?,
        })
    }
}

/// Parse an environment variable, using the default when unset
fn parse_env_or<T: std::str::FromStr>(name: &str, default: T) -> AuthResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AuthError::Config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}
