// ABOUTME: Fire-and-forget sign-in analytics events
// ABOUTME: Failures are logged at debug and swallowed; auth flows never block on analytics
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use serde::Serialize;
use tracing::debug;

use crate::models::Provider;
use crate::utils::http_client::create_client_with_timeout;

/// Sign-in funnel events
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEvent {
    SignInStarted,
    SignInCompleted,
    SignUpCompleted,
    IdentityLinked,
    IdentityUnlinked,
}

#[derive(Debug, Serialize)]
struct EventPayload {
    event: AuthEvent,
    provider: Option<Provider>,
    user_id: Option<String>,
    timestamp: i64,
}

/// Posts auth events to an optional analytics endpoint
#[derive(Clone)]
pub struct AnalyticsClient {
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl AnalyticsClient {
    #[must_use]
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            endpoint,
            client: create_client_with_timeout(3, 2),
        }
    }

    /// Record an event without waiting for delivery
    ///
    /// When no endpoint is configured the event is dropped silently.
    /// Delivery errors are logged at debug and never propagate.
    pub fn track(&self, event: AuthEvent, provider: Option<Provider>, user_id: Option<String>) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };

        let client = self.client.clone();
        let payload = EventPayload {
            event,
            provider,
            user_id,
            timestamp: chrono::Utc::now().timestamp(),
        };

        tokio::spawn(async move {
            if let Err(e) = client.post(&endpoint).json(&payload).send().await {
                debug!(error = %e, "analytics event delivery failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_track_without_endpoint_is_noop() {
        let client = AnalyticsClient::new(None);
        client.track(AuthEvent::SignInStarted, Some(Provider::Wechat), None);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&AuthEvent::SignInCompleted).unwrap();
        assert_eq!(json, "\"sign_in_completed\"");
    }
}
