//! OpenAI chat-completions adapter.
//!
//! Sends the prompt and optional image as content parts and asks for a JSON
//! object response. Any OpenAI-compatible endpoint works via [`OpenAiAdapter::with_api_url`].

use super::error_mapping::classify;
use super::http::{require_key, send_once};
use super::payload::{TEMPERATURE, compose_prompt, encode_image, max_output_tokens};
use crate::domain::{AnalysisError, AnalysisMode, AnalysisRequest, ProviderId};
use crate::ports::{ProviderClient, RawResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_url: String,
}

impl OpenAiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Point at Azure OpenAI, a proxy or a local compatible server.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn build_request(request: &AnalysisRequest) -> Result<ChatRequest, AnalysisError> {
        let mode = request.mode();
        let mut content = vec![ContentPart::Text {
            text: compose_prompt(request),
        }];
        if let Some(image) = encode_image(request)? {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                    detail: match mode {
                        AnalysisMode::Standard => "high",
                        AnalysisMode::Fast => "low",
                    },
                },
            });
        }

        Ok(ChatRequest {
            model: ProviderId::OpenAi.descriptor().model_for(mode).to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
            max_tokens: max_output_tokens(mode),
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        })
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: Option<String>,
}

#[async_trait::async_trait]
impl ProviderClient for OpenAiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    async fn call(
        &self,
        request: &AnalysisRequest,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<RawResponse, AnalysisError> {
        let api_key = require_key(api_key)?;
        let body = Self::build_request(request)?;

        info!(
            model = %body.model,
            kind = ?request.kind(),
            timeout_secs = timeout.as_secs(),
            "sending analysis request to OpenAI"
        );

        let builder = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body);
        send_once(self.id(), builder, timeout).await
    }

    fn classify_error(&self, status: u16, body: &str) -> AnalysisError {
        classify(self.id(), status, body)
    }

    fn extract_text(&self, body: &str) -> Result<String, AnalysisError> {
        let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
            AnalysisError::ResponseParsingFailed(format!("OpenAI envelope: {}", e))
        })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                AnalysisError::InvalidResponse("OpenAI returned no answer content".to_string())
            })?;

        debug!(content_len = content.len(), "received OpenAI answer");
        Ok(content)
    }
}
