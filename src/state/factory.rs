// ABOUTME: State store factory for settings-based backend selection
// ABOUTME: Wraps the in-memory and Redis backends behind one delegating type
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use uuid::Uuid;

use super::memory::InMemoryStateStore;
use super::redis::RedisStateStore;
use super::{StateRecord, StateStoreProvider};
use crate::config::environment::StateStoreSettings;
use crate::errors::AuthResult;
use crate::models::Provider;

/// Unified state store handle
///
/// Constructed once at startup with an explicit lifecycle and injected
/// into the components that need it; there is no ambient global client.
#[derive(Clone)]
pub enum StateStore {
    /// Single-instance in-memory backend
    Memory(InMemoryStateStore),
    /// Distributed Redis backend
    Redis(RedisStateStore),
}

impl StateStore {
    /// Create a state store from settings
    ///
    /// Uses Redis when a URL is configured, otherwise the in-memory
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis connection cannot be established.
    pub async fn new(settings: &StateStoreSettings) -> AuthResult<Self> {
        if settings.redis_url.is_some() {
            Ok(Self::Redis(RedisStateStore::new(settings).await?))
        } else {
            tracing::info!(
                "Initializing in-memory state store (ttl: {}s)",
                settings.ttl.as_secs()
            );
            Ok(Self::Memory(InMemoryStateStore::new(settings.ttl)))
        }
    }

    /// Issue a fresh state token for the provider
    ///
    /// # Errors
    ///
    /// Returns `StateServiceUnavailable` if the backend cannot be reached.
    pub async fn issue(
        &self,
        provider: Provider,
        bound_user_id: Option<Uuid>,
    ) -> AuthResult<String> {
        match self {
            Self::Memory(store) => store.issue(provider, bound_user_id).await,
            Self::Redis(store) => store.issue(provider, bound_user_id).await,
        }
    }

    /// Atomically redeem a state token
    ///
    /// # Errors
    ///
    /// See [`StateStoreProvider::consume`].
    pub async fn consume(
        &self,
        token: &str,
        expected_provider: Provider,
    ) -> AuthResult<StateRecord> {
        match self {
            Self::Memory(store) => store.consume(token, expected_provider).await,
            Self::Redis(store) => store.consume(token, expected_provider).await,
        }
    }

    /// Delete all records, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns `StateServiceUnavailable` if the backend cannot be reached.
    pub async fn cleanup(&self) -> AuthResult<u64> {
        match self {
            Self::Memory(store) => store.cleanup().await,
            Self::Redis(store) => store.cleanup().await,
        }
    }
}
