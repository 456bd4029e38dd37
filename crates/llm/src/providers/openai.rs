//! OpenAI-compatible chat provider.
//!
//! Talks to any server implementing `POST {base}/chat/completions`: the
//! hosted OpenAI API and Ollama's `/v1` compatibility layer both qualify.

use crate::client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::ProviderType;
use grounded_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat completions API request format.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Chat completions API response format.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    /// Null for refusals and some tool-call responses
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// OpenAI-compatible chat client.
pub struct OpenAiClient {
    /// Which provider this client fronts
    provider: ProviderType,

    /// API root, without trailing slash
    base_url: String,

    /// Bearer token, if the provider wants one
    api_key: Option<String>,

    /// HTTP client
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for the hosted OpenAI API.
    pub fn new(api_key: impl Into<String>) -> AppResult<Self> {
        Self::with_options(ProviderType::OpenAI, None, Some(api_key.into()), None)
    }

    /// Create a client with an explicit provider, base URL, key and timeout.
    pub fn with_options(
        provider: ProviderType,
        base_url: Option<&str>,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url
            .unwrap_or(provider.default_base_url())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            provider,
            base_url,
            api_key,
            client,
        })
    }

    fn to_chat_request<'a>(&self, request: &'a LlmRequest) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    /// Keep only the first choice; empty text counts as no content.
    fn convert_response(response: ChatCompletionResponse) -> LlmResponse {
        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.is_empty());

        LlmResponse {
            content,
            model: response.model,
            usage,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        self.provider.as_str()
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(provider = self.provider.as_str(), model = %request.model, "Sending chat completion request");
        tracing::debug!("Request: {:?}", request);

        let url = format!("{}/chat/completions", self.base_url);
        let mut http_request = self.client.post(&url).json(&self.to_chat_request(request));
        if let Some(ref api_key) = self.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send chat request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(AppError::Llm(format!(
                "Chat API error ({}): {}",
                status, message
            )));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse chat response: {}", e)))?;

        let converted = Self::convert_response(body);
        tracing::info!(
            total_tokens = converted.usage.total_tokens,
            has_content = converted.content.is_some(),
            "Received chat completion"
        );

        Ok(converted)
    }
}
