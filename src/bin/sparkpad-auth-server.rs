// ABOUTME: Server binary: loads configuration, assembles resources, serves HTTP
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use sparkpad_auth::config::ServerConfig;
use sparkpad_auth::logging::init_logging;
use sparkpad_auth::server::{serve, ServerResources};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = ServerConfig::from_env()?;
    info!(
        port = config.http_port,
        database = %config.database_url,
        "Starting sparkpad-auth"
    );

    let resources = Arc::new(ServerResources::new(config).await?);
    serve(resources).await?;
    Ok(())
}
