// ABOUTME: Integration tests for identity resolution against a real SQLite database
// ABOUTME: Covers the fast path, trust rules, email conflicts, and first sign-ins
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use anyhow::Result;
use sparkpad_auth::database::Database;
use sparkpad_auth::errors::AuthError;
use sparkpad_auth::identity::IdentityResolver;
use sparkpad_auth::models::User;
use sparkpad_auth::oauth::{GoogleEmail, GoogleProfile, ProviderProfile, WechatProfile};
use tempfile::TempDir;

async fn test_database() -> Result<(Database, TempDir)> {
    let dir = TempDir::new()?;
    let url = format!("sqlite:{}", dir.path().join("test.db").display());
    let database = Database::new(&url).await?;
    Ok((database, dir))
}

fn wechat_profile(openid: &str) -> ProviderProfile {
    ProviderProfile::Wechat(WechatProfile {
        openid: openid.to_owned(),
        unionid: None,
        nickname: Some("小明".to_owned()),
        avatar: Some("https://wx.example.com/avatar".to_owned()),
    })
}

fn google_profile(sub: &str, email: &str, verified: bool) -> ProviderProfile {
    ProviderProfile::Google(GoogleProfile {
        sub: sub.to_owned(),
        name: Some("Ada Lovelace".to_owned()),
        picture: Some("https://lh3.example.com/photo".to_owned()),
        emails: vec![GoogleEmail {
            value: email.to_owned(),
            verified,
        }],
    })
}

#[tokio::test]
async fn test_first_wechat_sign_in_creates_account() -> Result<()> {
    let (database, _dir) = test_database().await?;
    let resolver = IdentityResolver::new(database.clone());

    let (user, created) = resolver.resolve(&wechat_profile("openid-1")).await?;
    assert!(created);
    assert!(user.username.starts_with("wechat_"));
    assert_eq!(user.email, None);
    assert_eq!(user.display_name.as_deref(), Some("小明"));
    assert!(!user.has_password());

    // Account and identity landed together
    assert_eq!(database.count_identities_for_user(user.id).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_returning_user_takes_fast_path() -> Result<()> {
    let (database, _dir) = test_database().await?;
    let resolver = IdentityResolver::new(database);

    let (first, created_first) = resolver.resolve(&wechat_profile("openid-2")).await?;
    let (second, created_second) = resolver.resolve(&wechat_profile("openid-2")).await?;

    assert!(created_first);
    assert!(!created_second);
    assert_eq!(first.id, second.id);
    Ok(())
}

#[tokio::test]
async fn test_google_without_verified_email_rejected() -> Result<()> {
    let (database, _dir) = test_database().await?;
    let resolver = IdentityResolver::new(database.clone());

    let err = resolver
        .resolve(&google_profile("sub-1", "ada@example.com", false))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UnverifiedEmail));

    // Nothing may have been created
    assert!(database.get_user_by_email("ada@example.com").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_google_sign_in_adopts_verified_email() -> Result<()> {
    let (database, _dir) = test_database().await?;
    let resolver = IdentityResolver::new(database);

    let (user, created) = resolver
        .resolve(&google_profile("sub-2", "ada@example.com", true))
        .await?;
    assert!(created);
    assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    Ok(())
}

#[tokio::test]
async fn test_existing_email_owner_is_a_conflict() -> Result<()> {
    let (database, _dir) = test_database().await?;
    let resolver = IdentityResolver::new(database.clone());

    // A password account already owns the address
    let mut existing = User::new(
        "ada".to_owned(),
        Some("ada@example.com".to_owned()),
        None,
    );
    existing.password_hash = Some("$2b$12$fakehash".to_owned());
    database.create_user(&existing).await?;

    let err = resolver
        .resolve(&google_profile("sub-3", "ada@example.com", true))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailConflict { .. }));
    Ok(())
}

#[tokio::test]
async fn test_distinct_wechat_identities_get_distinct_accounts() -> Result<()> {
    let (database, _dir) = test_database().await?;
    let resolver = IdentityResolver::new(database);

    let (a, _) = resolver.resolve(&wechat_profile("openid-a")).await?;
    let (b, _) = resolver.resolve(&wechat_profile("openid-b")).await?;
    assert_ne!(a.id, b.id);
    assert_ne!(a.username, b.username);
    Ok(())
}

#[tokio::test]
async fn test_unionid_identifies_user_across_openids() -> Result<()> {
    let (database, _dir) = test_database().await?;
    let resolver = IdentityResolver::new(database);

    let with_unionid = |openid: &str| {
        ProviderProfile::Wechat(WechatProfile {
            openid: openid.to_owned(),
            unionid: Some("union-1".to_owned()),
            nickname: None,
            avatar: None,
        })
    };

    // Same open-platform user from two apps: different openids, same unionid
    let (first, _) = resolver.resolve(&with_unionid("app-a-openid")).await?;
    let (second, created) = resolver.resolve(&with_unionid("app-b-openid")).await?;

    assert_eq!(first.id, second.id);
    assert!(!created);
    Ok(())
}
