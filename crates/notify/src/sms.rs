//! SMS gateway contract and HTTP adapter.
//!
//! The SMS subsystem (templating, provider retry, its own audit logging) is
//! external; the engine only speaks its contract: send a templated message to
//! a phone number with a context block for downstream audit. [`SmsGateway`]
//! is the seam, [`HttpSmsGateway`] the production adapter.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use rvois_core::types::DbId;

/// HTTP request timeout for a single gateway call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for SMS gateway failures.
#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway returned a non-2xx status code.
    #[error("SMS gateway returned HTTP {0}")]
    HttpStatus(u16),

    /// The gateway accepted the request but reported a send failure.
    #[error("SMS send failed: {0}")]
    Gateway(String),

    /// No gateway is configured in this deployment.
    #[error("SMS gateway not configured")]
    NotConfigured,
}

// ---------------------------------------------------------------------------
// Templates and context
// ---------------------------------------------------------------------------

/// Message templates the engine references, resolved by the SMS subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsTemplate {
    /// First-tier escalation: assignment went unacknowledged.
    VolunteerFallback,
    /// Second-tier escalation: still unacknowledged after the fallback.
    VolunteerReminder,
}

impl SmsTemplate {
    /// Template code understood by the SMS subsystem.
    pub fn code(self) -> &'static str {
        match self {
            Self::VolunteerFallback => "volunteer_assignment_fallback",
            Self::VolunteerReminder => "volunteer_assignment_reminder",
        }
    }
}

/// Audit context forwarded to the SMS subsystem with every send.
#[derive(Debug, Clone, Serialize)]
pub struct SmsContext {
    pub incident_id: DbId,
    pub reference_code: String,
    /// Label for what triggered the send (e.g. `"fallback_timeout"`).
    pub triggered_by: &'static str,
    pub recipient_user_id: DbId,
}

// ---------------------------------------------------------------------------
// SmsGateway
// ---------------------------------------------------------------------------

/// Contract for the external SMS subsystem.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Deliver a templated message to a phone number.
    async fn send_sms(
        &self,
        phone_number: &str,
        template: SmsTemplate,
        params: &serde_json::Value,
        context: &SmsContext,
    ) -> Result<(), SmsError>;
}

// ---------------------------------------------------------------------------
// HttpSmsGateway
// ---------------------------------------------------------------------------

/// Configuration for the HTTP SMS gateway adapter.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    /// Base URL of the SMS subsystem's send endpoint.
    pub gateway_url: String,
    /// Optional bearer token for the gateway.
    pub api_token: Option<String>,
}

impl SmsConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMS_GATEWAY_URL` is not set, signalling that SMS
    /// delivery is not configured and sends should fail soft.
    pub fn from_env() -> Option<Self> {
        let gateway_url = std::env::var("SMS_GATEWAY_URL").ok()?;
        Some(Self {
            gateway_url,
            api_token: std::env::var("SMS_GATEWAY_TOKEN").ok(),
        })
    }
}

/// Production adapter: POSTs sends to the SMS subsystem over HTTP.
pub struct HttpSmsGateway {
    client: reqwest::Client,
    config: SmsConfig,
}

impl HttpSmsGateway {
    /// Create an adapter with a pre-configured HTTP client.
    pub fn new(config: SmsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, config }
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    async fn send_sms(
        &self,
        phone_number: &str,
        template: SmsTemplate,
        params: &serde_json::Value,
        context: &SmsContext,
    ) -> Result<(), SmsError> {
        let body = serde_json::json!({
            "phone_number": phone_number,
            "template": template.code(),
            "params": params,
            "context": context,
        });

        let mut request = self.client.post(&self.config.gateway_url).json(&body);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SmsError::HttpStatus(response.status().as_u16()));
        }

        // The gateway reports per-message success in the response body.
        let result: serde_json::Value = response.json().await?;
        if result.get("success").and_then(|v| v.as_bool()) == Some(false) {
            let error = result
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown gateway error")
                .to_string();
            return Err(SmsError::Gateway(error));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DisabledSmsGateway
// ---------------------------------------------------------------------------

/// Stand-in gateway for deployments without SMS configured.
///
/// Every send fails with [`SmsError::NotConfigured`], which the fallback
/// engine logs as a failed escalation rather than crashing.
pub struct DisabledSmsGateway;

#[async_trait]
impl SmsGateway for DisabledSmsGateway {
    async fn send_sms(
        &self,
        _phone_number: &str,
        _template: SmsTemplate,
        _params: &serde_json::Value,
        _context: &SmsContext,
    ) -> Result<(), SmsError> {
        Err(SmsError::NotConfigured)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
