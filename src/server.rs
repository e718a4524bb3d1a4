// ABOUTME: HTTP server assembly: shared resources, router construction, and serve loop
// ABOUTME: All route handlers share one Arc<ServerResources> via axum State
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::analytics::AnalyticsClient;
use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::{AuthError, AuthResult};
use crate::identity::{AccountLinker, IdentityResolver};
use crate::oauth::google::GoogleOAuthProvider;
use crate::oauth::wechat::WechatOAuthProvider;
use crate::oauth::ProviderRegistry;
use crate::routes;
use crate::state::StateStore;

/// Shared resources handed to every route handler
///
/// Constructed once at startup; handlers receive `Arc<ServerResources>`
/// through axum's `State` extractor.
pub struct ServerResources {
    pub database: Database,
    pub auth_manager: AuthManager,
    pub state_store: StateStore,
    pub providers: ProviderRegistry,
    pub resolver: IdentityResolver,
    pub linker: AccountLinker,
    pub analytics: AnalyticsClient,
    pub config: ServerConfig,
}

impl ServerResources {
    /// Assemble all resources from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the database or state store cannot be
    /// initialized.
    pub async fn new(config: ServerConfig) -> AuthResult<Self> {
        config.oauth.validate_and_log();

        let database = Database::new(&config.database_url).await?;
        let state_store = StateStore::new(&config.state_store).await?;
        let auth_manager = AuthManager::new(config.jwt_secret.as_bytes());

        let mut providers = ProviderRegistry::new();
        if config.oauth.wechat.enabled {
            providers.register(Box::new(WechatOAuthProvider::new(
                config.oauth.wechat.clone(),
            )));
        }
        if config.oauth.google.enabled {
            providers.register(Box::new(GoogleOAuthProvider::new(
                config.oauth.google.clone(),
            )));
        }

        Ok(Self {
            resolver: IdentityResolver::new(database.clone()),
            linker: AccountLinker::new(database.clone()),
            analytics: AnalyticsClient::new(config.analytics_endpoint.clone()),
            database,
            auth_manager,
            state_store,
            providers,
            config,
        })
    }
}

/// Build the application router
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(routes::oauth::router())
        .merge(routes::auth::router())
        .merge(routes::health::router())
        .layer(TraceLayer::new_for_http())
        .with_state(resources)
}

/// Bind and serve until shutdown
///
/// # Errors
///
/// Returns an error if binding or serving fails.
pub async fn serve(resources: Arc<ServerResources>) -> AuthResult<()> {
    let port = resources.config.http_port;
    let app = router(resources);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| AuthError::Internal(format!("failed to bind port {port}: {e}")))?;

    info!(port, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AuthError::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown signal handler");
        return;
    }
    info!("Shutdown signal received");
}
