//! Google Gemini `generateContent` adapter.

use super::error_mapping::classify;
use super::http::{require_key, send_once};
use super::payload::{TEMPERATURE, compose_prompt, encode_image, max_output_tokens};
use crate::domain::{AnalysisError, AnalysisRequest, ProviderId};
use crate::ports::{ProviderClient, RawResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    fn build_request(request: &AnalysisRequest) -> Result<GenerateRequest, AnalysisError> {
        let mut parts = vec![Part::Text {
            text: compose_prompt(request),
        }];
        if let Some(image) = encode_image(request)? {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type,
                    data: image.data,
                },
            });
        }

        Ok(GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: max_output_tokens(request.mode()),
                response_mime_type: "application/json",
            },
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[async_trait::async_trait]
impl ProviderClient for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn call(
        &self,
        request: &AnalysisRequest,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<RawResponse, AnalysisError> {
        let api_key = require_key(api_key)?;
        let body = Self::build_request(request)?;
        let model = ProviderId::Gemini.descriptor().model_for(request.mode());

        info!(
            model,
            kind = ?request.kind(),
            timeout_secs = timeout.as_secs(),
            "sending analysis request to Gemini"
        );

        let builder = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", api_key)
            .json(&body);
        send_once(self.id(), builder, timeout).await
    }

    fn classify_error(&self, status: u16, body: &str) -> AnalysisError {
        classify(self.id(), status, body)
    }

    fn extract_text(&self, body: &str) -> Result<String, AnalysisError> {
        let response: GenerateResponse = serde_json::from_str(body).map_err(|e| {
            AnalysisError::ResponseParsingFailed(format!("Gemini envelope: {}", e))
        })?;

        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            warn!(reason = %reason, "Gemini blocked the prompt");
            return Err(AnalysisError::InvalidResponse(format!(
                "Gemini blocked the request: {}",
                reason
            )));
        }

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalysisError::InvalidResponse(
                "Gemini returned no candidate text".to_string(),
            ));
        }
        debug!(content_len = text.len(), "received Gemini answer");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> GeminiAdapter {
        GeminiAdapter::new(reqwest::Client::new())
    }

    #[test]
    fn test_endpoint() {
        let a = adapter().with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(
            a.endpoint("gemini-1.5-flash"),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_is_camel_case() {
        let req = AnalysisRequest::image(b"GIF89a".to_vec(), "Analyse");
        let body = serde_json::to_value(GeminiAdapter::build_request(&req).unwrap()).unwrap();

        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2500);
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert!(parts[0]["text"].is_string());
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/gif");
    }

    #[test]
    fn test_extract_concatenates_parts() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "{\"total_carbohydrates\""}, {"text": ": 12}"}]}}]}"#;
        assert_eq!(
            adapter().extract_text(body).unwrap(),
            r#"{"total_carbohydrates": 12}"#
        );
    }

    #[test]
    fn test_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        assert!(matches!(
            adapter().extract_text(body),
            Err(AnalysisError::InvalidResponse(msg)) if msg.contains("SAFETY")
        ));
    }

    #[test]
    fn test_per_minute_exhaustion_is_rate_limited() {
        let raw = RawResponse::new(
            429,
            r#"{"error": {"code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED"}}"#,
        );
        assert_eq!(
            adapter().interpret(&raw),
            Err(AnalysisError::RateLimited(ProviderId::Gemini))
        );
    }
}
