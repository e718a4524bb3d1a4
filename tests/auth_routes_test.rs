// ABOUTME: HTTP-level tests for the password credential routes and health endpoint
// ABOUTME: Drives the real router with tower::ServiceExt::oneshot
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use sparkpad_auth::config::{OAuthConfig, ServerConfig, StateStoreSettings};
use sparkpad_auth::server::{router, ServerResources};
use tempfile::TempDir;
use tower::ServiceExt;

async fn test_app() -> Result<(Router, TempDir)> {
    let dir = TempDir::new()?;
    let config = ServerConfig {
        http_port: 0,
        base_url: "http://localhost:8081".to_owned(),
        database_url: format!("sqlite:{}", dir.path().join("test.db").display()),
        jwt_secret: "routes-test-secret".to_owned(),
        oauth: OAuthConfig::default(),
        state_store: StateStoreSettings::default(),
        analytics_endpoint: None,
    };
    let resources = Arc::new(ServerResources::new(config).await?);
    Ok((router(resources), dir))
}

async fn body_json(response: axum::response::Response) -> Result<serde_json::Value> {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_service() -> Result<()> {
    let (app, _dir) = test_app().await?;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "sparkpad-auth");
    Ok(())
}

#[tokio::test]
async fn test_register_login_refresh_logout_flow() -> Result<()> {
    let (app, _dir) = test_app().await?;

    // Register
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({
                "username": "ada",
                "email": "ada@example.com",
                "password": "correct horse battery",
                "display_name": "Ada"
            }),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("refresh cookie set on register")
        .to_str()?
        .to_owned();
    assert!(cookie.starts_with("refresh_token="));
    assert!(cookie.contains("HttpOnly"));

    // Login
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            serde_json::json!({
                "email": "ada@example.com",
                "password": "correct horse battery"
            }),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()?
        .to_owned();
    let body = body_json(response).await?;
    let access_token = body["access_token"].as_str().unwrap().to_owned();
    assert!(!body.as_object().unwrap().contains_key("refresh_token"));

    // Refresh from the cookie rotates the pair; a short sleep moves iat
    // so the new token differs
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let cookie_pair = cookie.split(';').next().unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/auth/refresh")
                .header(header::COOKIE, cookie_pair)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_ne!(body["access_token"].as_str().unwrap(), access_token);

    // Logout revokes everything
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/auth/logout")
                .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // The old refresh cookie is version-revoked now
    let response = app
        .oneshot(
            Request::post("/api/auth/refresh")
                .header(header::COOKIE, cookie_pair)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_login_wrong_password_rejected() -> Result<()> {
    let (app, _dir) = test_app().await?;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({
                "username": "ada",
                "email": "ada@example.com",
                "password": "correct horse battery"
            }),
        ))
        .await?;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            serde_json::json!({
                "email": "ada@example.com",
                "password": "wrong"
            }),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await?;
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
    Ok(())
}

#[tokio::test]
async fn test_duplicate_email_registration_conflicts() -> Result<()> {
    let (app, _dir) = test_app().await?;

    let register = || {
        json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({
                "username": "ada",
                "email": "ada@example.com",
                "password": "correct horse battery"
            }),
        )
    };

    app.clone().oneshot(register()).await?;
    let response = app.oneshot(register()).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await?;
    assert_eq!(body["error"]["code"], "EMAIL_CONFLICT");
    assert_eq!(body["error"]["details"]["field"], "email");
    Ok(())
}

#[tokio::test]
async fn test_duplicate_username_registration_conflicts() -> Result<()> {
    let (app, _dir) = test_app().await?;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({
                "username": "ada",
                "email": "ada@example.com",
                "password": "correct horse battery"
            }),
        ))
        .await?;

    // Same username, different email: the code must name the username
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({
                "username": "ada",
                "email": "other@example.com",
                "password": "correct horse battery"
            }),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await?;
    assert_eq!(body["error"]["code"], "USERNAME_CONFLICT");
    Ok(())
}

#[tokio::test]
async fn test_unknown_provider_is_bad_request() -> Result<()> {
    let (app, _dir) = test_app().await?;

    let response = app
        .oneshot(Request::get("/api/auth/github").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await?;
    assert_eq!(body["error"]["code"], "UNSUPPORTED_PROVIDER");
    Ok(())
}

#[tokio::test]
async fn test_callback_without_state_rejected() -> Result<()> {
    let (app, _dir) = test_app().await?;

    let response = app
        .oneshot(Request::get("/api/auth/wechat/callback?code=abc").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_callback_with_forged_state_rejected() -> Result<()> {
    let (app, _dir) = test_app().await?;

    let response = app
        .oneshot(
            Request::get("/api/auth/wechat/callback?code=abc&state=forged")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await?;
    assert_eq!(body["error"]["code"], "INVALID_STATE");
    Ok(())
}

#[tokio::test]
async fn test_identities_requires_authentication() -> Result<()> {
    let (app, _dir) = test_app().await?;

    let response = app
        .oneshot(Request::get("/api/auth/identities").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
