//! Map provider error responses to typed errors.
//!
//! Providers do not return machine-stable codes for billing conditions, so
//! quota/credit/credential detection relies on substrings of their own error
//! message. This is a heuristic: when a provider rewords a message the
//! classification silently falls back to a generic `Api` error.

use crate::domain::{AnalysisError, ProviderId};
use serde_json::Value;

/// Gemini reports its per-minute throttle with quota wording on a 429.
const PER_MINUTE_MARKERS: &[&str] = &[
    "resource has been exhausted",
    "resource_exhausted",
    "per minute",
    "per_minute",
];

/// Markers that mean a real allowance is spent, even on a 429.
const HARD_QUOTA_MARKERS: &[&str] = &[
    "insufficient_quota",
    "exceeded your current quota",
    "per day",
    "per_day",
];

const QUOTA_MARKERS: &[&str] = &[
    "insufficient_quota",
    "exceeded your current quota",
    "quota exceeded",
    "quota",
    "resource_exhausted",
    "resource has been exhausted",
];

const CREDIT_MARKERS: &[&str] = &[
    "credit balance",
    "insufficient credits",
    "out of credits",
    "purchase credits",
    "billing hard limit",
    "payment required",
];

const CREDENTIAL_MARKERS: &[&str] = &[
    "invalid api key",
    "incorrect api key",
    "invalid x-api-key",
    "api key not valid",
    "api_key_invalid",
    "invalid_api_key",
    "invalid authentication",
];

const RATE_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "too many requests",
    "overloaded",
];

const MESSAGE_LIMIT: usize = 200;

/// Classify a non-2xx response from `provider`.
pub fn classify(provider: ProviderId, status: u16, body: &str) -> AnalysisError {
    let message = error_message(body);
    let lower = message.to_lowercase();

    if status == 429
        && contains_any(&lower, PER_MINUTE_MARKERS)
        && !contains_any(&lower, HARD_QUOTA_MARKERS)
    {
        AnalysisError::RateLimited(provider)
    } else if contains_any(&lower, QUOTA_MARKERS) {
        AnalysisError::QuotaExceeded(provider)
    } else if status == 402 || contains_any(&lower, CREDIT_MARKERS) {
        AnalysisError::CreditsExhausted(provider)
    } else if status == 401 || status == 403 || contains_any(&lower, CREDENTIAL_MARKERS) {
        AnalysisError::InvalidCredential(provider)
    } else if status == 429 || contains_any(&lower, RATE_MARKERS) {
        AnalysisError::RateLimited(provider)
    } else {
        AnalysisError::Api {
            status,
            message: truncate(&message, MESSAGE_LIMIT),
        }
    }
}

/// Human-readable message from a provider error body.
///
/// OpenAI, Anthropic and Gemini all nest it under `error.message`; plain-text
/// bodies are returned as-is.
pub fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("error").filter(|e| e.is_string()))
            .or_else(|| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    from_json.unwrap_or_else(|| body.trim().to_string())
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_insufficient_quota() {
        let body = r#"{"error": {"message": "You exceeded your current quota, please check your plan and billing details.", "type": "insufficient_quota"}}"#;
        assert_eq!(
            classify(ProviderId::OpenAi, 429, body),
            AnalysisError::QuotaExceeded(ProviderId::OpenAi)
        );
    }

    #[test]
    fn test_gemini_per_minute_throttle_is_rate_limited() {
        let body = r#"{"error": {"code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            classify(ProviderId::Gemini, 429, body),
            AnalysisError::RateLimited(ProviderId::Gemini)
        );
    }

    #[test]
    fn test_gemini_daily_quota_is_quota_exceeded() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded for quota metric 'Generate Content API requests per day'.", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            classify(ProviderId::Gemini, 429, body),
            AnalysisError::QuotaExceeded(ProviderId::Gemini)
        );
    }

    #[test]
    fn test_anthropic_low_credit() {
        let body = r#"{"type": "error", "error": {"type": "invalid_request_error", "message": "Your credit balance is too low to access the Anthropic API. Please go to Plans & Billing to upgrade or purchase credits."}}"#;
        assert_eq!(
            classify(ProviderId::Claude, 400, body),
            AnalysisError::CreditsExhausted(ProviderId::Claude)
        );
    }

    #[test]
    fn test_gemini_invalid_key_on_400() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            classify(ProviderId::Gemini, 400, body),
            AnalysisError::InvalidCredential(ProviderId::Gemini)
        );
    }

    #[test]
    fn test_status_driven_classes() {
        assert_eq!(
            classify(ProviderId::OpenAi, 401, "nope"),
            AnalysisError::InvalidCredential(ProviderId::OpenAi)
        );
        assert_eq!(
            classify(ProviderId::OpenAi, 429, r#"{"error": {"message": "Slow down"}}"#),
            AnalysisError::RateLimited(ProviderId::OpenAi)
        );
        assert_eq!(
            classify(ProviderId::Claude, 529, r#"{"error": {"message": "Overloaded"}}"#),
            AnalysisError::RateLimited(ProviderId::Claude)
        );
    }

    #[test]
    fn test_unknown_wording_falls_back_to_api_error() {
        let err = classify(ProviderId::Gemini, 500, r#"{"error": {"message": "Internal error"}}"#);
        assert_eq!(
            err,
            AnalysisError::Api {
                status: 500,
                message: "Internal error".to_string()
            }
        );
    }

    #[test]
    fn test_plain_text_body() {
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }
}
