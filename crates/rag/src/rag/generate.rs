//! Answer generator.

use crate::types::{Query, RetrievedDocument};
use grounded_core::config::DEFAULT_FALLBACK_ANSWER;
use grounded_core::AppResult;
use grounded_llm::{ChatMessage, LlmClient, LlmRequest};
use grounded_prompt::{build_prompt, PersonaDefinition};
use std::sync::Arc;

/// Chat model used when none is configured.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Separator placed between passages in the context block.
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Join passage contents in ranking order. An empty set yields `""`.
pub fn build_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(|doc| doc.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Produces one answer per query from a chat model.
#[derive(Clone)]
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    persona: PersonaDefinition,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    fallback: String,
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            persona: PersonaDefinition::default(),
            temperature: None,
            max_tokens: None,
            fallback: DEFAULT_FALLBACK_ANSWER.to_string(),
        }
    }

    pub fn with_persona(mut self, persona: PersonaDefinition) -> Self {
        self.persona = persona;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Answer returned when the model produces no content.
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the chat request for `query` over `documents`.
    pub fn request_for(
        &self,
        query: &Query,
        documents: &[RetrievedDocument],
    ) -> AppResult<LlmRequest> {
        let context = build_context(documents);
        let prompt = build_prompt(&self.persona, &context, query.as_str())?;

        let mut request = LlmRequest::new(
            self.model.clone(),
            vec![ChatMessage::system(prompt.system), ChatMessage::user(prompt.user)],
        );
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        Ok(request)
    }

    /// Generate an answer. Runs even when `documents` is empty.
    pub async fn generate(
        &self,
        query: &Query,
        documents: &[RetrievedDocument],
    ) -> AppResult<String> {
        let request = self.request_for(query, documents)?;

        tracing::debug!(
            provider = self.client.provider_name(),
            model = %self.model,
            passages = documents.len(),
            "Requesting completion"
        );

        let response = self.client.complete(&request).await?;

        tracing::debug!(
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Completion received"
        );

        match response.content {
            Some(content) => Ok(content),
            None => {
                tracing::warn!("Model returned no content, using fallback answer");
                Ok(self.fallback.clone())
            }
        }
    }
}
