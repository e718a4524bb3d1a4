// ABOUTME: Unified error taxonomy for OAuth, identity, and token operations
// ABOUTME: Maps every failure category to an HTTP status and a structured JSON body
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

//! # Unified Error Handling
//!
//! Every failure the sign-in core can produce is one of the variants below.
//! Client-facing messages are deliberately generic at the category level:
//! raw provider error strings are logged server-side only and never echoed
//! back, so provider implementation details cannot leak through the API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error categories surfaced to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "INVALID_STATE")]
    InvalidState,
    #[serde(rename = "PROVIDER_MISMATCH")]
    ProviderMismatch,
    #[serde(rename = "STATE_SERVICE_UNAVAILABLE")]
    StateServiceUnavailable,
    #[serde(rename = "AUTHORIZATION_FAILED")]
    AuthorizationFailed,
    #[serde(rename = "PROFILE_FETCH_FAILED")]
    ProfileFetchFailed,
    #[serde(rename = "UNVERIFIED_EMAIL")]
    UnverifiedEmail,
    #[serde(rename = "EMAIL_CONFLICT")]
    EmailConflict,
    #[serde(rename = "USERNAME_CONFLICT")]
    UsernameConflict,
    #[serde(rename = "ALREADY_LINKED_ELSEWHERE")]
    AlreadyLinkedElsewhere,
    #[serde(rename = "PROVIDER_ALREADY_LINKED")]
    ProviderAlreadyLinked,
    #[serde(rename = "NOT_LINKED")]
    NotLinked,
    #[serde(rename = "LAST_CREDENTIAL_GUARD")]
    LastCredentialGuard,
    #[serde(rename = "INVALID_CREDENTIALS")]
    InvalidCredentials,
    #[serde(rename = "INVALID_TOKEN")]
    InvalidToken,
    #[serde(rename = "UNSUPPORTED_PROVIDER")]
    UnsupportedProvider,
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput,
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError,
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this error category
    ///
    /// Authorization and identity failures are 401, conflicts are 409.
    /// State-store unavailability fails closed but gets an honest 503 so
    /// clients can tell "restart the flow" from "try again later".
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::InvalidState
            | Self::ProviderMismatch
            | Self::AuthorizationFailed
            | Self::ProfileFetchFailed
            | Self::UnverifiedEmail
            | Self::InvalidCredentials
            | Self::InvalidToken => StatusCode::UNAUTHORIZED,

            Self::EmailConflict
            | Self::UsernameConflict
            | Self::AlreadyLinkedElsewhere
            | Self::ProviderAlreadyLinked
            | Self::NotLinked
            | Self::LastCredentialGuard => StatusCode::CONFLICT,

            Self::UnsupportedProvider | Self::InvalidInput => StatusCode::BAD_REQUEST,

            Self::StateServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            Self::ConfigError | Self::DatabaseError | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Unified error type for the sign-in core
///
/// Variants carrying a `String` keep server-side detail for logging; the
/// client-facing body is built from the category alone (see
/// [`AuthError::client_message`]).
#[derive(Debug, Error)]
pub enum AuthError {
    /// State token missing, expired, or already consumed. One opaque
    /// category: the three cases are indistinguishable to callers.
    #[error("invalid or expired state token")]
    InvalidState,

    /// Stored state record was issued for a different provider
    #[error("state token was issued for a different provider")]
    ProviderMismatch,

    /// State store backend unreachable. The flow fails closed: an
    /// unavailable store is treated as an invalid state, never bypassed.
    #[error("state service unavailable: {0}")]
    StateServiceUnavailable(String),

    /// Provider rejected the authorization code, or the exchange failed
    /// at the transport level
    #[error("provider authorization failed: {0}")]
    AuthorizationFailed(String),

    /// Provider profile fetch failed
    #[error("provider profile fetch failed: {0}")]
    ProfileFetchFailed(String),

    /// Google identity without a provider-verified email
    #[error("provider did not supply a verified email")]
    UnverifiedEmail,

    /// Another account already owns the conflicting field
    #[error("{field} already belongs to another account")]
    EmailConflict {
        /// Name of the conflicting field, surfaced to the client so it
        /// can tell the user to sign in by the original method and link
        /// afterward
        field: String,
    },

    /// Another account already owns the requested username
    #[error("username already belongs to another account")]
    UsernameConflict,

    /// The provider identity is bound to a different local account
    #[error("identity already linked to another account")]
    AlreadyLinkedElsewhere,

    /// The account already has an identity linked for this provider
    #[error("an identity for this provider is already linked to this account")]
    ProviderAlreadyLinked,

    /// No linked identity exists for this provider
    #[error("no linked identity for this provider")]
    NotLinked,

    /// Unlinking would leave the account with no way to authenticate
    #[error("account would be left without any sign-in method")]
    LastCredentialGuard,

    /// Password login failed
    #[error("invalid credentials")]
    InvalidCredentials,

    /// JWT missing, malformed, expired, or version-revoked
    #[error("authentication token rejected: {0}")]
    InvalidToken(String),

    /// Provider name not recognized or not configured
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Request validation failure
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Missing or malformed configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence layer failure
    #[error("database error: {0}")]
    Database(String),

    /// Catch-all internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Error category for this variant
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidState => ErrorCode::InvalidState,
            Self::ProviderMismatch => ErrorCode::ProviderMismatch,
            Self::StateServiceUnavailable(_) => ErrorCode::StateServiceUnavailable,
            Self::AuthorizationFailed(_) => ErrorCode::AuthorizationFailed,
            Self::ProfileFetchFailed(_) => ErrorCode::ProfileFetchFailed,
            Self::UnverifiedEmail => ErrorCode::UnverifiedEmail,
            Self::EmailConflict { .. } => ErrorCode::EmailConflict,
            Self::UsernameConflict => ErrorCode::UsernameConflict,
            Self::AlreadyLinkedElsewhere => ErrorCode::AlreadyLinkedElsewhere,
            Self::ProviderAlreadyLinked => ErrorCode::ProviderAlreadyLinked,
            Self::NotLinked => ErrorCode::NotLinked,
            Self::LastCredentialGuard => ErrorCode::LastCredentialGuard,
            Self::InvalidCredentials => ErrorCode::InvalidCredentials,
            Self::InvalidToken(_) => ErrorCode::InvalidToken,
            Self::UnsupportedProvider(_) => ErrorCode::UnsupportedProvider,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// HTTP status for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        self.code().http_status()
    }

    /// Category-level message safe to send to clients
    ///
    /// Provider and infrastructure detail stays in the server logs.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidState => {
                "Sign-in session is invalid or has expired. Please start again.".to_owned()
            }
            Self::ProviderMismatch => {
                "Sign-in session does not match this provider.".to_owned()
            }
            Self::StateServiceUnavailable(_) => {
                "Sign-in is temporarily unavailable. Please try again shortly.".to_owned()
            }
            Self::AuthorizationFailed(_) => {
                "The provider rejected the sign-in attempt. Please start again.".to_owned()
            }
            Self::ProfileFetchFailed(_) => {
                "Could not retrieve your profile from the provider.".to_owned()
            }
            Self::EmailConflict { field } => format!(
                "An account with this {field} already exists. Sign in with your original method, then link this provider from settings."
            ),
            Self::UsernameConflict => {
                "This username is already taken. Please choose another.".to_owned()
            }
            Self::InvalidToken(_) => "Authentication token rejected.".to_owned(),
            Self::InvalidInput(msg) => msg.clone(),
            Self::UnsupportedProvider(name) => format!("Unsupported provider: {name}"),
            Self::Config(_) | Self::Database(_) | Self::Internal(_) => {
                "An internal error occurred.".to_owned()
            }
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type alias for the sign-in core
pub type AuthResult<T> = Result<T, AuthError>;

/// Structured HTTP error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorResponseDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl From<&AuthError> for ErrorResponse {
    fn from(error: &AuthError) -> Self {
        let details = match error {
            AuthError::EmailConflict { field } => serde_json::json!({ "field": field }),
            _ => serde_json::Value::Null,
        };
        Self {
            error: ErrorResponseDetails {
                code: error.code(),
                message: error.client_message(),
                details,
            },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}
