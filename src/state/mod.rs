// ABOUTME: One-time OAuth state store abstraction for CSRF protection
// ABOUTME: Pluggable backend support (in-memory, Redis) with atomic consume-once semantics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sparkpad

//! # OAuth State Store
//!
//! Short-lived, atomically consumable records keyed by a random state
//! token. A token binds an authorization request to its callback and may
//! be redeemed at most once:
//!
//! ```text
//! ISSUED --consume(success)--> CONSUMED (record deleted)
//! ISSUED --TTL expiry-------> EXPIRED  (record deleted)
//! ```
//!
//! There is no retry or reissue transition. A failed consume always
//! requires a fresh `issue`. Missing, expired, and already-consumed
//! tokens are deliberately indistinguishable to callers.

pub mod factory;
pub mod memory;
pub mod redis;

pub use factory::StateStore;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::state_store::STATE_TOKEN_BYTES;
use crate::errors::AuthResult;
use crate::models::Provider;

/// Ephemeral record bound to a state token
///
/// Owned exclusively by the state store; no other component reads or
/// writes these directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Provider the authorization request was issued for
    pub provider: Provider,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// Present only for "link existing account" flows
    pub bound_user_id: Option<Uuid>,
}

/// Pluggable state store backend
///
/// `consume` is the only operation requiring an explicit atomicity
/// guarantee: two callers racing to redeem the same token must never both
/// succeed, so get and delete are one primitive, never two calls.
#[async_trait::async_trait]
pub trait StateStoreProvider: Send + Sync {
    /// Generate a random token, persist a record with the configured TTL,
    /// and return the token.
    ///
    /// # Errors
    ///
    /// Returns `StateServiceUnavailable` if the backend cannot be reached.
    async fn issue(&self, provider: Provider, bound_user_id: Option<Uuid>) -> AuthResult<String>;

    /// Atomically redeem a token.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the token does not exist (never issued, already
    ///   consumed, or expired; indistinguishable by design)
    /// - `ProviderMismatch` if the stored provider differs from
    ///   `expected_provider`; the record is left in place so a retry with
    ///   the correct provider can still succeed
    /// - `StateServiceUnavailable` if the backend cannot be reached; the
    ///   flow fails closed
    async fn consume(&self, token: &str, expected_provider: Provider) -> AuthResult<StateRecord>;

    /// Administrative sweep deleting all records irrespective of TTL.
    /// Used for testing and operations, not part of the security protocol.
    ///
    /// # Errors
    ///
    /// Returns `StateServiceUnavailable` if the backend cannot be reached.
    async fn cleanup(&self) -> AuthResult<u64>;
}

/// Generate a cryptographically random state token
///
/// The token is a CSRF nonce, never an identity credential: uniqueness
/// and unguessability are the only requirements, the format carries no
/// meaning.
#[must_use]
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; STATE_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_state_tokens_are_unique_and_opaque() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_state_token()).collect();
        assert_eq!(tokens.len(), 1000);
        for token in &tokens {
            assert_eq!(token.len(), STATE_TOKEN_BYTES * 2);
        }
    }
}
