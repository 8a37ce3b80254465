//! Scripted provider for testing without API calls.
//!
//! Returns a fixed answer, a fixed HTTP error or a transport failure after a
//! configurable delay, and counts what happened.

use super::error_mapping::classify;
use crate::domain::{AnalysisError, AnalysisRequest, ProviderId};
use crate::ports::{ProviderClient, RawResponse};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
enum Behavior {
    Respond(String),
    Status(u16, String),
    NetworkFailure,
    /// Transport failure for the first `failures` calls, then the answer.
    Flaky { failures: usize, answer: String },
}

/// Mock provider.
pub struct MockProvider {
    id: ProviderId,
    behavior: Behavior,
    delay: Duration,
    calls: AtomicUsize,
    completed: AtomicUsize,
    call_log: Option<Arc<Mutex<Vec<ProviderId>>>>,
}

impl MockProvider {
    fn with_behavior(id: ProviderId, behavior: Behavior) -> Self {
        Self {
            id,
            behavior,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            call_log: None,
        }
    }

    /// Answers 200 with `answer` as the model text.
    pub fn responding(id: ProviderId, answer: impl Into<String>) -> Self {
        Self::with_behavior(id, Behavior::Respond(answer.into()))
    }

    pub fn failing_with_status(id: ProviderId, status: u16, body: impl Into<String>) -> Self {
        Self::with_behavior(id, Behavior::Status(status, body.into()))
    }

    pub fn network_failure(id: ProviderId) -> Self {
        Self::with_behavior(id, Behavior::NetworkFailure)
    }

    pub fn flaky(id: ProviderId, failures: usize, answer: impl Into<String>) -> Self {
        Self::with_behavior(
            id,
            Behavior::Flaky {
                failures,
                answer: answer.into(),
            },
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Record every call start into a log shared between mocks.
    pub fn with_call_log(mut self, log: Arc<Mutex<Vec<ProviderId>>>) -> Self {
        self.call_log = Some(log);
        self
    }

    /// Calls started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that ran to the end of their delay. Cancelled calls never complete.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProviderClient for MockProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn call(
        &self,
        request: &AnalysisRequest,
        _api_key: Option<&str>,
        _timeout: Duration,
    ) -> Result<RawResponse, AnalysisError> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.call_log {
            if let Ok(mut log) = log.lock() {
                log.push(self.id);
            }
        }
        info!(provider = %self.id, kind = ?request.kind(), "[MOCK] simulating provider call");

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            Behavior::Respond(answer) => Ok(RawResponse::new(200, answer.clone())),
            Behavior::Status(status, body) => Ok(RawResponse::new(*status, body.clone())),
            Behavior::NetworkFailure => Err(AnalysisError::Network(format!(
                "[MOCK] {} connection reset",
                self.id
            ))),
            Behavior::Flaky { failures, answer } => {
                if attempt < *failures {
                    Err(AnalysisError::Network(format!(
                        "[MOCK] {} connection reset",
                        self.id
                    )))
                } else {
                    Ok(RawResponse::new(200, answer.clone()))
                }
            }
        }
    }

    fn classify_error(&self, status: u16, body: &str) -> AnalysisError {
        classify(self.id(), status, body)
    }

    fn extract_text(&self, body: &str) -> Result<String, AnalysisError> {
        Ok(body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_counts() {
        let mock = MockProvider::responding(ProviderId::OpenAi, "{}");
        let req = AnalysisRequest::text("banana", "p");

        let raw = mock.call(&req, None, Duration::from_secs(1)).await.unwrap();

        assert_eq!(raw.status, 200);
        assert_eq!(mock.calls(), 1);
        assert_eq!(mock.completed(), 1);
    }

    #[tokio::test]
    async fn test_flaky_recovers() {
        let mock = MockProvider::flaky(ProviderId::Claude, 1, "{}");
        let req = AnalysisRequest::text("banana", "p");
        assert!(mock.call(&req, None, Duration::from_secs(1)).await.is_err());
        assert!(mock.call(&req, None, Duration::from_secs(1)).await.is_ok());
    }

    #[test]
    fn test_status_goes_through_classification() {
        let mock = MockProvider::failing_with_status(ProviderId::Gemini, 429, "slow down");
        let raw = RawResponse::new(429, "slow down");
        assert_eq!(
            mock.interpret(&raw),
            Err(AnalysisError::RateLimited(ProviderId::Gemini))
        );
    }
}
