// ABOUTME: Liveness endpoint reporting service name, version, and configured providers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::constants::service;
use crate::server::ServerResources;

pub fn router() -> Router<Arc<ServerResources>> {
    Router::new().route("/health", get(health))
}

async fn health(State(resources): State<Arc<ServerResources>>) -> Json<serde_json::Value> {
    let providers: Vec<String> = resources
        .providers
        .list()
        .into_iter()
        .map(|p| p.to_string())
        .collect();

    Json(serde_json::json!({
        "status": "ok",
        "service": service::NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "providers": providers,
    }))
}
