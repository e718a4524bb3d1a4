// ABOUTME: Redis state store tests, gated behind REDIS_TEST_URL
// ABOUTME: Exercises the Lua-script consume path against a real Redis instance
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::env;
use std::time::Duration;

use anyhow::Result;
use sparkpad_auth::config::{RedisConnectionConfig, StateStoreSettings};
use sparkpad_auth::errors::AuthError;
use sparkpad_auth::models::Provider;
use sparkpad_auth::state::redis::RedisStateStore;
use sparkpad_auth::state::StateStoreProvider;

/// Connect to the test Redis, or skip when none is configured
async fn test_store() -> Result<Option<RedisStateStore>> {
    let Ok(url) = env::var("REDIS_TEST_URL") else {
        eprintln!("REDIS_TEST_URL not set, skipping Redis state store test");
        return Ok(None);
    };

    let settings = StateStoreSettings {
        redis_url: Some(url),
        ttl: Duration::from_secs(600),
        ..Default::default()
    };
    Ok(Some(RedisStateStore::new(&settings).await?))
}

// Runs unconditionally: an unreachable backend needs no Redis at all
#[tokio::test]
async fn test_unreachable_backend_fails_closed() {
    let settings = StateStoreSettings {
        // Port 1 refuses connections everywhere
        redis_url: Some("redis://127.0.0.1:1".to_owned()),
        ttl: Duration::from_secs(600),
        connection: RedisConnectionConfig {
            connection_timeout_secs: 1,
            response_timeout_secs: 1,
            initial_connection_retries: 0,
            initial_retry_delay_ms: 1,
            max_retry_delay_ms: 1,
            reconnection_retries: 0,
        },
    };

    let err = RedisStateStore::new(&settings).await.unwrap_err();
    assert!(matches!(err, AuthError::StateServiceUnavailable(_)));
}

#[tokio::test]
async fn test_redis_consume_succeeds_exactly_once() -> Result<()> {
    let Some(store) = test_store().await? else {
        return Ok(());
    };

    let token = store.issue(Provider::Wechat, None).await?;
    let record = store.consume(&token, Provider::Wechat).await?;
    assert_eq!(record.provider, Provider::Wechat);

    let err = store.consume(&token, Provider::Wechat).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidState));
    Ok(())
}

#[tokio::test]
async fn test_redis_mismatch_leaves_record() -> Result<()> {
    let Some(store) = test_store().await? else {
        return Ok(());
    };

    let token = store.issue(Provider::Google, None).await?;

    // The script must return MISMATCH without deleting the key
    let err = store.consume(&token, Provider::Wechat).await.unwrap_err();
    assert!(matches!(err, AuthError::ProviderMismatch));

    let record = store.consume(&token, Provider::Google).await?;
    assert_eq!(record.provider, Provider::Google);
    Ok(())
}

#[tokio::test]
async fn test_redis_concurrent_consume_has_one_winner() -> Result<()> {
    let Some(store) = test_store().await? else {
        return Ok(());
    };

    let token = store.issue(Provider::Google, None).await?;
    let (a, b) = tokio::join!(
        store.consume(&token, Provider::Google),
        store.consume(&token, Provider::Google)
    );

    let successes = usize::from(a.is_ok()) + usize::from(b.is_ok());
    assert_eq!(successes, 1);
    Ok(())
}
