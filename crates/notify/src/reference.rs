//! Incident reference-code resolution.
//!
//! SMS bodies use a short human-readable reference code instead of the full
//! incident UUID. The lookup service owns the canonical codes; when it is
//! unreachable (or not deployed) a deterministic short code derived from the
//! incident id is used instead — good enough for a readable SMS body, not
//! guaranteed unique.

use std::time::Duration;

use async_trait::async_trait;

use rvois_core::types::DbId;

/// HTTP request timeout for a single lookup.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for reference-code lookups.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Reference service returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Reference service reported no code for incident")]
    NoCode,
}

/// Contract for the reference-code lookup service.
#[async_trait]
pub trait ReferenceCodes: Send + Sync {
    /// Resolve the canonical reference code for an incident.
    async fn reference_id(&self, incident_id: DbId) -> Result<String, ReferenceError>;
}

/// Derive a short local code from the incident id: uppercased prefix and
/// suffix of the UUID's hex form.
pub fn local_reference_code(incident_id: DbId) -> String {
    let hex = incident_id.simple().to_string().to_uppercase();
    format!("INC-{}{}", &hex[..4], &hex[hex.len() - 4..])
}

// ---------------------------------------------------------------------------
// HttpReferenceCodes
// ---------------------------------------------------------------------------

/// Production client for the reference-code lookup service.
pub struct HttpReferenceCodes {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReferenceCodes {
    /// Create a client from the service base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Build a client from `REFERENCE_SERVICE_URL`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var("REFERENCE_SERVICE_URL")
            .ok()
            .map(Self::new)
    }
}

#[async_trait]
impl ReferenceCodes for HttpReferenceCodes {
    async fn reference_id(&self, incident_id: DbId) -> Result<String, ReferenceError> {
        let url = format!("{}/reference/{}", self.base_url.trim_end_matches('/'), incident_id);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ReferenceError::HttpStatus(response.status().as_u16()));
        }

        let body: serde_json::Value = response.json().await?;
        if body.get("success").and_then(|v| v.as_bool()) != Some(true) {
            return Err(ReferenceError::NoCode);
        }
        body.get("referenceId")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or(ReferenceError::NoCode)
    }
}

// ---------------------------------------------------------------------------
// LocalReferenceCodes
// ---------------------------------------------------------------------------

/// Stand-in resolver for deployments without the lookup service: always
/// answers with the locally derived code.
pub struct LocalReferenceCodes;

#[async_trait]
impl ReferenceCodes for LocalReferenceCodes {
    async fn reference_id(&self, incident_id: DbId) -> Result<String, ReferenceError> {
        Ok(local_reference_code(incident_id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
