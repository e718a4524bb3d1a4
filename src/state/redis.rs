// ABOUTME: Redis state store implementation with script-based atomic consume
// ABOUTME: Provider check and delete happen server-side in one step; mismatch leaves the record
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sparkpad

use std::time::Duration;

use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use tracing::{info, warn};
use uuid::Uuid;

use super::{generate_state_token, StateRecord, StateStoreProvider};
use crate::config::environment::{RedisConnectionConfig, StateStoreSettings};
use crate::constants::state_store::STATE_KEY_PREFIX;
use crate::errors::{AuthError, AuthResult};
use crate::models::Provider;

/// Atomic get-and-delete with a provider check, evaluated server-side.
///
/// Returns nil when the key is absent, the literal `MISMATCH` when the
/// stored provider differs (key untouched), and the record JSON after
/// deleting the key on a match. Running this as one script is what makes
/// concurrent redemption of the same token impossible.
const CONSUME_SCRIPT: &str = r"
local value = redis.call('GET', KEYS[1])
if not value then
    return nil
end
local record = cjson.decode(value)
if record.provider ~= ARGV[1] then
    return 'MISMATCH'
end
redis.call('DEL', KEYS[1])
return value
";

/// Redis-backed state store
///
/// Records expire via Redis TTL; `consume` uses a Lua script so no two
/// callers can redeem the same token even across server instances. Any
/// Redis error fails closed as `StateServiceUnavailable`.
#[derive(Clone)]
pub struct RedisStateStore {
    manager: ConnectionManager,
    ttl: Duration,
}

impl std::fmt::Debug for RedisStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStateStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl RedisStateStore {
    /// Connect to Redis and build the store
    ///
    /// # Errors
    ///
    /// Returns `StateServiceUnavailable` if the connection cannot be
    /// established after the configured retries.
    pub async fn new(settings: &StateStoreSettings) -> AuthResult<Self> {
        let redis_url = settings.redis_url.as_ref().ok_or_else(|| {
            AuthError::Config("Redis URL is required for the Redis state store".to_owned())
        })?;

        let conn_config = &settings.connection;
        info!(
            "Connecting to state store at {} (timeout={}s, response_timeout={}s, retries={})",
            redis_url,
            conn_config.connection_timeout_secs,
            conn_config.response_timeout_secs,
            conn_config.initial_connection_retries
        );

        let client = redis::Client::open(redis_url.as_str()).map_err(|e| {
            AuthError::StateServiceUnavailable(format!("failed to create Redis client: {e}"))
        })?;

        let manager = Self::connect_with_retry(&client, conn_config).await?;
        info!("Successfully connected to state store");

        Ok(Self {
            manager,
            ttl: settings.ttl,
        })
    }

    /// Connect with exponential backoff retry on failure
    async fn connect_with_retry(
        client: &redis::Client,
        conn_config: &RedisConnectionConfig,
    ) -> AuthResult<ConnectionManager> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(conn_config.connection_timeout_secs))
            .set_response_timeout(Duration::from_secs(conn_config.response_timeout_secs))
            .set_number_of_retries(conn_config.reconnection_retries)
            .set_max_delay(conn_config.max_retry_delay_ms);

        let max_retries = conn_config.initial_connection_retries;
        let mut delay_ms = conn_config.initial_retry_delay_ms;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await {
                Ok(manager) => {
                    if attempt > 0 {
                        info!("State store connection established after {} retries", attempt);
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < max_retries {
                        warn!(
                            "State store connection attempt {}/{} failed, retrying in {}ms",
                            attempt + 1,
                            max_retries + 1,
                            delay_ms
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(conn_config.max_retry_delay_ms);
                    }
                }
            }
        }

        Err(AuthError::StateServiceUnavailable(format!(
            "failed to connect to Redis after {} attempts: {}",
            max_retries + 1,
            last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
        )))
    }

    fn build_key(token: &str) -> String {
        format!("{STATE_KEY_PREFIX}{token}")
    }
}

#[async_trait::async_trait]
impl StateStoreProvider for RedisStateStore {
    async fn issue(&self, provider: Provider, bound_user_id: Option<Uuid>) -> AuthResult<String> {
        let token = generate_state_token();
        let record = StateRecord {
            provider,
            issued_at: chrono::Utc::now(),
            bound_user_id,
        };
        let serialized = serde_json::to_string(&record)
            .map_err(|e| AuthError::Internal(format!("state serialization failed: {e}")))?;

        let mut conn = self.manager.clone();
        // SETEX writes value and TTL in one atomic operation
        conn.set_ex::<_, _, ()>(Self::build_key(&token), serialized, self.ttl.as_secs())
            .await
            .map_err(|e| AuthError::StateServiceUnavailable(format!("Redis SETEX failed: {e}")))?;

        Ok(token)
    }

    async fn consume(&self, token: &str, expected_provider: Provider) -> AuthResult<StateRecord> {
        let mut conn = self.manager.clone();

        let result: Option<String> = redis::Script::new(CONSUME_SCRIPT)
            .key(Self::build_key(token))
            .arg(expected_provider.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                AuthError::StateServiceUnavailable(format!("Redis consume script failed: {e}"))
            })?;

        match result.as_deref() {
            None => Err(AuthError::InvalidState),
            Some("MISMATCH") => Err(AuthError::ProviderMismatch),
            Some(value) => serde_json::from_str(value)
                .map_err(|e| AuthError::Internal(format!("state deserialization failed: {e}"))),
        }
    }

    async fn cleanup(&self) -> AuthResult<u64> {
        let pattern = format!("{STATE_KEY_PREFIX}*");
        let mut conn = self.manager.clone();
        let mut count = 0u64;
        let mut cursor = 0u64;

        // Cursor-based SCAN, safe against large keyspaces
        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    AuthError::StateServiceUnavailable(format!("Redis SCAN failed: {e}"))
                })?;

            if !keys.is_empty() {
                let deleted: u64 = conn.del(&keys).await.map_err(|e| {
                    AuthError::StateServiceUnavailable(format!("Redis DEL failed: {e}"))
                })?;
                count += deleted;
            }

            cursor = new_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(count)
    }
}
