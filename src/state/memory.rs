// ABOUTME: In-memory state store implementation with lazy TTL expiry
// ABOUTME: Consume-once semantics guaranteed by a single write lock over check-and-remove
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{generate_state_token, StateRecord, StateStoreProvider};
use crate::errors::{AuthError, AuthResult};
use crate::models::Provider;

/// Stored record plus its expiry deadline
#[derive(Debug, Clone)]
struct StoredState {
    record: StateRecord,
    expires_at: Instant,
}

impl StoredState {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory state store
///
/// Suitable for single-instance deployments and tests. The whole
/// check-provider-then-remove sequence in `consume` happens under one
/// write lock, which is what makes the get-and-delete atomic here.
#[derive(Clone)]
pub struct InMemoryStateStore {
    records: Arc<RwLock<HashMap<String, StoredState>>>,
    ttl: Duration,
}

impl InMemoryStateStore {
    /// Create a new in-memory store with the given record TTL
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }
}

#[async_trait::async_trait]
impl StateStoreProvider for InMemoryStateStore {
    async fn issue(&self, provider: Provider, bound_user_id: Option<Uuid>) -> AuthResult<String> {
        let token = generate_state_token();
        let stored = StoredState {
            record: StateRecord {
                provider,
                issued_at: chrono::Utc::now(),
                bound_user_id,
            },
            expires_at: Instant::now() + self.ttl,
        };

        let mut records = self.records.write().await;
        // Expired entries are cleaned up lazily on issue
        records.retain(|_, state| !state.is_expired());
        records.insert(token.clone(), stored);
        drop(records);

        Ok(token)
    }

    async fn consume(&self, token: &str, expected_provider: Provider) -> AuthResult<StateRecord> {
        let mut records = self.records.write().await;

        let Some(stored) = records.get(token) else {
            return Err(AuthError::InvalidState);
        };

        if stored.is_expired() {
            records.remove(token);
            return Err(AuthError::InvalidState);
        }

        if stored.record.provider != expected_provider {
            // Record stays in place: a retry with the correct provider
            // can still redeem it within the TTL.
            return Err(AuthError::ProviderMismatch);
        }

        let stored = records
            .remove(token)
            .ok_or(AuthError::InvalidState)?;
        drop(records);

        Ok(stored.record)
    }

    async fn cleanup(&self) -> AuthResult<u64> {
        let mut records = self.records.write().await;
        let count = records.len() as u64;
        records.clear();
        drop(records);
        Ok(count)
    }
}
