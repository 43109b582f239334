//! Push notification delivery.
//!
//! [`PushNotifier`] posts a JSON notification payload plus the subscription
//! descriptor to the configured push delivery endpoint. The endpoint handles
//! the actual web-push protocol; this side only observes per-call
//! success/failure and flags subscriptions whose endpoint is gone.

use std::time::Duration;

use serde::Serialize;

use rvois_db::models::notification::PushSubscription;

/// HTTP request timeout for a single push attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default badge icon shipped with the web app.
const DEFAULT_ICON: &str = "/icons/icon-192.png";
const DEFAULT_BADGE: &str = "/icons/badge-72.png";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for push delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The push service returned a non-2xx status code.
    #[error("Push service returned HTTP {0}")]
    HttpStatus(u16),

    /// The subscription endpoint no longer exists (HTTP 404/410); the
    /// subscription should be deactivated.
    #[error("Push endpoint gone (HTTP {0})")]
    EndpointGone(u16),
}

// ---------------------------------------------------------------------------
// PushPayload
// ---------------------------------------------------------------------------

/// JSON body shown by the service worker: `{ title, body, icon, badge, data }`.
#[derive(Debug, Clone, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub data: serde_json::Value,
}

impl PushPayload {
    /// Build a payload with the default app icons and an empty data object.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_BADGE.to_string(),
            data: serde_json::Value::Object(Default::default()),
        }
    }

    /// Attach click-through data for the service worker.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

// ---------------------------------------------------------------------------
// PushConfig / PushNotifier
// ---------------------------------------------------------------------------

/// Configuration for the push delivery endpoint.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// URL of the push delivery service.
    pub service_url: String,
}

impl PushConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `PUSH_SERVICE_URL` is not set, signalling that push
    /// delivery is not configured.
    pub fn from_env() -> Option<Self> {
        let service_url = std::env::var("PUSH_SERVICE_URL").ok()?;
        Some(Self { service_url })
    }
}

/// Sends push messages to registered device endpoints.
pub struct PushNotifier {
    client: reqwest::Client,
    config: PushConfig,
}

impl PushNotifier {
    /// Create a notifier with a pre-configured HTTP client.
    pub fn new(config: PushConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, config }
    }

    /// Send one payload to one subscription.
    ///
    /// No retry here: per-device retry belongs to the push service. The
    /// caller records the outcome in the delivery tracker.
    pub async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), PushError> {
        let body = serde_json::json!({
            "subscription": {
                "endpoint": subscription.endpoint,
                "keys": { "p256dh": subscription.p256dh, "auth": subscription.auth },
            },
            "payload": payload,
        });

        let response = self
            .client
            .post(&self.config.service_url)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        match status {
            200..=299 => Ok(()),
            404 | 410 => Err(PushError::EndpointGone(status)),
            _ => Err(PushError::HttpStatus(status)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
