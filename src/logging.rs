// ABOUTME: Tracing subscriber initialization driven by environment variables
// ABOUTME: Supports json, pretty, and compact output via LOG_FORMAT
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::env;

use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::{AuthError, AuthResult};

/// Initialize structured logging
///
/// `RUST_LOG` controls the filter (default `info`), `LOG_FORMAT` the
/// output format: `json`, `pretty`, or `compact` (default).
///
/// # Errors
///
/// Returns an error if a subscriber is already installed.
pub fn init_logging() -> AuthResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let format = env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_owned());

    let result = match format.as_str() {
        "json" => fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .try_init(),
        "pretty" => fmt().with_env_filter(filter).pretty().try_init(),
        _ => fmt().with_env_filter(filter).compact().try_init(),
    };

    result.map_err(|e| AuthError::Config(format!("logging initialization failed: {e}")))
}
