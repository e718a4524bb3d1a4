// ABOUTME: Centralized constants for OAuth endpoints, token lifetimes, and service identity
// ABOUTME: Single source of truth for protocol URLs and timing values used across modules
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

/// Service identity constants
pub mod service {
    /// Service name used in logs and JWT audience claims
    pub const NAME: &str = "sparkpad-auth";
}

/// OAuth provider protocol endpoints
pub mod endpoints {
    /// WeChat authorization endpoint (browser redirect target)
    pub const WECHAT_AUTHORIZE_URL: &str = "https://open.weixin.qq.com/connect/oauth2/authorize";
    /// WeChat code-for-token exchange endpoint (GET with query parameters)
    pub const WECHAT_TOKEN_URL: &str = "https://api.weixin.qq.com/sns/oauth2/access_token";
    /// WeChat user profile endpoint (requires openid alongside the access token)
    pub const WECHAT_USERINFO_URL: &str = "https://api.weixin.qq.com/sns/userinfo";

    /// Google authorization endpoint (browser redirect target)
    pub const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
    /// Google code-for-token exchange endpoint (POST form)
    pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
    /// Google user profile endpoint
    pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
}

/// Timing and lifetime constants
pub mod time {
    /// One-time OAuth state token lifetime in seconds
    pub const STATE_TTL_SECS: u64 = 600;
    /// Access token validity in minutes
    pub const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;
    /// Refresh token validity in days
    pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;
    /// Hard timeout for provider token/profile requests in seconds
    pub const PROVIDER_REQUEST_TIMEOUT_SECS: u64 = 5;
    /// Connect timeout for provider requests in seconds
    pub const PROVIDER_CONNECT_TIMEOUT_SECS: u64 = 3;
}

/// State store constants
pub mod state_store {
    /// Redis key namespace for OAuth state records
    pub const STATE_KEY_PREFIX: &str = "sparkpad:oauth:state:";
    /// Random bytes per state token (32 bytes = 256 bits, hex encoded)
    pub const STATE_TOKEN_BYTES: usize = 32;
}

/// OAuth scope defaults per provider
pub mod oauth {
    /// WeChat scope for the web QR sign-in flow
    pub const WECHAT_DEFAULT_SCOPES: &str = "snsapi_login";
    /// Google scopes needed for profile and verified email
    pub const GOOGLE_DEFAULT_SCOPES: &str = "openid email profile";
}

/// Cookie names and attributes
pub mod cookies {
    /// Refresh token cookie name (HttpOnly, never surfaced in JSON bodies)
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Path scope for the refresh cookie
    pub const REFRESH_PATH: &str = "/api/auth";
}
