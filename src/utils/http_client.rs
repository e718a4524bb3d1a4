// ABOUTME: Shared HTTP client construction with timeout configuration
// ABOUTME: Provides the bounded-timeout client used for all provider requests
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::constants::time::{PROVIDER_CONNECT_TIMEOUT_SECS, PROVIDER_REQUEST_TIMEOUT_SECS};

/// Create a new HTTP client with custom timeout settings
#[must_use]
pub fn create_client_with_timeout(timeout_secs: u64, connect_timeout_secs: u64) -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// HTTP client for OAuth provider calls
///
/// Token exchanges and profile fetches carry a hard 5 s timeout: a slow
/// provider must not block the caller, and a timeout fails the flow the
/// same way a provider error would.
#[must_use]
pub fn oauth_client() -> Client {
    create_client_with_timeout(
        PROVIDER_REQUEST_TIMEOUT_SECS,
        PROVIDER_CONNECT_TIMEOUT_SECS,
    )
}
