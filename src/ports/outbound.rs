//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    AnalysisError, AnalysisRequest, AnalysisResult, Fingerprint, NetworkClassification, ProviderId,
};
use std::time::Duration;
use tokio::sync::mpsc;

/// Raw HTTP outcome of one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One AI provider. Translates a canonical request into one HTTP call and the
/// response body back into the model's answer text.
#[async_trait::async_trait]
pub trait ProviderClient: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Perform exactly one attempt. Only transport failures are `Err`;
    /// any HTTP status comes back as a [`RawResponse`].
    async fn call(
        &self,
        request: &AnalysisRequest,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<RawResponse, AnalysisError>;

    /// Pull the model's answer text out of a 2xx body.
    fn extract_text(&self, body: &str) -> Result<String, AnalysisError>;

    /// Map a non-2xx response to a typed error.
    fn classify_error(&self, status: u16, body: &str) -> AnalysisError;

    /// Answer text for 2xx responses, typed error otherwise.
    fn interpret(&self, raw: &RawResponse) -> Result<String, AnalysisError> {
        if raw.is_success() {
            self.extract_text(&raw.body)
        } else {
            Err(self.classify_error(raw.status, &raw.body))
        }
    }
}

/// Result cache keyed by content fingerprint.
#[async_trait::async_trait]
pub trait CachePort: Send + Sync {
    /// `None` on miss or when the entry has expired.
    async fn get(&self, fingerprint: &Fingerprint) -> Option<AnalysisResult>;

    async fn put(&self, fingerprint: Fingerprint, result: AnalysisResult);
}

/// Supplies per-provider API keys. Absent key removes the provider from a call.
pub trait CredentialProvider: Send + Sync {
    fn api_key(&self, provider: ProviderId) -> Option<String>;
}

/// Platform connectivity signal.
pub trait ConnectivitySource: Send + Sync {
    /// Start observing. Each message is a new classification; the stream ends
    /// when the source stops.
    fn subscribe(&self) -> mpsc::Receiver<NetworkClassification>;
}
