// ABOUTME: Integration tests for state store consume-once semantics
// ABOUTME: Covers races, provider mismatch, TTL expiry, and cleanup
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::time::Duration;

use anyhow::Result;
use sparkpad_auth::errors::AuthError;
use sparkpad_auth::models::Provider;
use sparkpad_auth::state::memory::InMemoryStateStore;
use sparkpad_auth::state::StateStoreProvider;
use uuid::Uuid;

fn store() -> InMemoryStateStore {
    InMemoryStateStore::new(Duration::from_secs(600))
}

#[tokio::test]
async fn test_consume_succeeds_exactly_once() -> Result<()> {
    let store = store();
    let token = store.issue(Provider::Wechat, None).await?;

    let record = store.consume(&token, Provider::Wechat).await?;
    assert_eq!(record.provider, Provider::Wechat);
    assert!(record.bound_user_id.is_none());

    // Second redemption of the same token must fail
    let err = store.consume(&token, Provider::Wechat).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidState));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_consume_has_one_winner() -> Result<()> {
    let store = store();
    let token = store.issue(Provider::Google, None).await?;

    let (a, b) = tokio::join!(
        store.consume(&token, Provider::Google),
        store.consume(&token, Provider::Google)
    );

    let successes = usize::from(a.is_ok()) + usize::from(b.is_ok());
    assert_eq!(successes, 1, "exactly one concurrent consume may win");
    Ok(())
}

#[tokio::test]
async fn test_provider_mismatch_leaves_record_redeemable() -> Result<()> {
    let store = store();
    let token = store.issue(Provider::Wechat, None).await?;

    let err = store.consume(&token, Provider::Google).await.unwrap_err();
    assert!(matches!(err, AuthError::ProviderMismatch));

    // The mismatch must not have burned the token
    let record = store.consume(&token, Provider::Wechat).await?;
    assert_eq!(record.provider, Provider::Wechat);
    Ok(())
}

#[tokio::test]
async fn test_expired_state_rejected() -> Result<()> {
    let store = InMemoryStateStore::new(Duration::from_millis(20));
    let token = store.issue(Provider::Wechat, None).await?;

    tokio::time::sleep(Duration::from_millis(60)).await;

    let err = store.consume(&token, Provider::Wechat).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidState));
    Ok(())
}

#[tokio::test]
async fn test_unknown_token_rejected() {
    let err = store()
        .consume("no-such-token", Provider::Wechat)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidState));
}

#[tokio::test]
async fn test_bound_user_id_round_trips() -> Result<()> {
    let store = store();
    let user_id = Uuid::new_v4();
    let token = store.issue(Provider::Google, Some(user_id)).await?;

    let record = store.consume(&token, Provider::Google).await?;
    assert_eq!(record.bound_user_id, Some(user_id));
    Ok(())
}

#[tokio::test]
async fn test_cleanup_counts_removed_records() -> Result<()> {
    let store = store();
    store.issue(Provider::Wechat, None).await?;
    store.issue(Provider::Google, None).await?;

    assert_eq!(store.cleanup().await?, 2);
    assert_eq!(store.cleanup().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_tokens_are_unique_and_opaque() -> Result<()> {
    let store = store();
    let a = store.issue(Provider::Wechat, None).await?;
    let b = store.issue(Provider::Wechat, None).await?;

    assert_ne!(a, b);
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    Ok(())
}
