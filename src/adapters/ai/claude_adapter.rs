//! Anthropic Messages API adapter.

use super::error_mapping::classify;
use super::http::{require_key, send_once};
use super::payload::{TEMPERATURE, compose_prompt, encode_image, max_output_tokens};
use crate::domain::{AnalysisError, AnalysisRequest, ProviderId};
use crate::ports::{ProviderClient, RawResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct ClaudeAdapter {
    client: reqwest::Client,
    api_url: String,
}

impl ClaudeAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn build_request(request: &AnalysisRequest) -> Result<MessagesRequest, AnalysisError> {
        let mode = request.mode();
        let mut content = Vec::with_capacity(2);
        // Anthropic recommends the image before the instructions.
        if let Some(image) = encode_image(request)? {
            content.push(ContentBlock::Image {
                source: ImageSource {
                    source_type: "base64",
                    media_type: image.mime_type,
                    data: image.data,
                },
            });
        }
        content.push(ContentBlock::Text {
            text: compose_prompt(request),
        });

        Ok(MessagesRequest {
            model: ProviderId::Claude.descriptor().model_for(mode).to_string(),
            max_tokens: max_output_tokens(mode),
            temperature: TEMPERATURE,
            messages: vec![Message {
                role: "user",
                content,
            }],
        })
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'static str,
    data: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[async_trait::async_trait]
impl ProviderClient for ClaudeAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Claude
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
            "sending analysis request to Claude"
        );

        let builder = self
            .client
            .post(&self.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        send_once(self.id(), builder, timeout).await
    }

    fn classify_error(&self, status: u16, body: &str) -> AnalysisError {
        classify(self.id(), status, body)
    }

    fn extract_text(&self, body: &str) -> Result<String, AnalysisError> {
        let response: MessagesResponse = serde_json::from_str(body).map_err(|e| {
            AnalysisError::ResponseParsingFailed(format!("Claude envelope: {}", e))
        })?;

        let text = response
            .content
            .into_iter()
            .filter(|b| b.block_type == "text")
            .find_map(|b| b.text.filter(|t| !t.trim().is_empty()))
            .ok_or_else(|| {
                AnalysisError::InvalidResponse("Claude returned no text block".to_string())
            })?;

        debug!(content_len = text.len(), "received Claude answer");
        Ok(text)
    }
}
