//! Domain errors. Used by ports and use cases.
//!
//! Adapters map HTTP/provider failures into these.

use super::providers::ProviderId;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Image processing failed: {0}")]
    ImageProcessingFailed(String),

    #[error("Failed to create request: {0}")]
    RequestCreationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse provider response: {0}")]
    ResponseParsingFailed(String),

    #[error("No API credential configured for any eligible provider")]
    NoCredential,

    #[error("{0} rate limit reached, try again shortly")]
    RateLimited(ProviderId),

    #[error("{0} quota exceeded")]
    QuotaExceeded(ProviderId),

    #[error("{0} account has no credits left")]
    CreditsExhausted(ProviderId),

    #[error("{0} rejected the API key")]
    InvalidCredential(ProviderId),

    /// Synthesized by the orchestrator's timeout race, never by the network layer.
    #[error("Analysis timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl AnalysisError {
    /// How much the error tells the user. Used to pick one representative
    /// error when every raced provider fails.
    pub fn specificity(&self) -> u8 {
        match self {
            AnalysisError::CreditsExhausted(_)
            | AnalysisError::QuotaExceeded(_)
            | AnalysisError::InvalidCredential(_) => 6,
            AnalysisError::RateLimited(_) => 5,
            AnalysisError::Api { .. } => 4,
            AnalysisError::InvalidResponse(_)
            | AnalysisError::ResponseParsingFailed(_)
            | AnalysisError::ImageProcessingFailed(_)
            | AnalysisError::RequestCreationFailed(_) => 3,
            AnalysisError::Network(_) => 2,
            AnalysisError::Timeout(_) => 1,
            AnalysisError::NoCredential => 0,
        }
    }

    /// Connection-level failures the orchestrator may retry on the same provider.
    pub fn is_transient(&self) -> bool {
        matches!(self, AnalysisError::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_errors_outrank_transport_errors() {
        let quota = AnalysisError::QuotaExceeded(ProviderId::OpenAi);
        let timeout = AnalysisError::Timeout(Duration::from_secs(25));
        let network = AnalysisError::Network("reset".to_string());
        assert!(quota.specificity() > network.specificity());
        assert!(network.specificity() > timeout.specificity());
    }

    #[test]
    fn test_display_names_provider() {
        let err = AnalysisError::RateLimited(ProviderId::Gemini);
        assert_eq!(err.to_string(), "Gemini rate limit reached, try again shortly");
    }
}
