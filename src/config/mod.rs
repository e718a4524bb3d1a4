// ABOUTME: Configuration module organizing environment-sourced server settings
// ABOUTME: Splits general server config from OAuth provider credential loading
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

pub mod environment;
pub mod oauth;

pub use environment::{RedisConnectionConfig, ServerConfig, StateStoreSettings};
pub use oauth::{OAuthConfig, OAuthProviderConfig};
