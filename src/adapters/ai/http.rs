//! One-shot HTTP send shared by the network providers.

use crate::domain::{AnalysisError, ProviderId};
use crate::ports::RawResponse;
use std::time::Duration;
use tracing::debug;

/// Send once and read the whole body. Any HTTP status is returned as-is;
/// only transport failures become errors.
pub async fn send_once(
    provider: ProviderId,
    builder: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<RawResponse, AnalysisError> {
    let response = builder
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| AnalysisError::Network(format!("{} request failed: {}", provider, e)))?;

    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| {
        AnalysisError::Network(format!("{} response body could not be read: {}", provider, e))
    })?;

    debug!(provider = %provider, status, body_len = body.len(), "provider responded");
    Ok(RawResponse { status, body })
}

/// Non-empty API key or `NoCredential`.
pub fn require_key(api_key: Option<&str>) -> Result<&str, AnalysisError> {
    api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(AnalysisError::NoCredential)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_key() {
        assert_eq!(require_key(Some(" sk-1 ")), Ok("sk-1"));
        assert_eq!(require_key(Some("  ")), Err(AnalysisError::NoCredential));
        assert_eq!(require_key(None), Err(AnalysisError::NoCredential));
    }
}
