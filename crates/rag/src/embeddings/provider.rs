//! Embedding provider trait and factory.

use grounded_core::config::EmbeddingSettings;
use grounded_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "openai", "mock")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider from the `embedding` configuration section.
pub fn create_provider(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "openai" => {
            let api_key = settings.api_key.clone().ok_or_else(|| {
                AppError::Config(format!(
                    "OpenAI embedding provider requires API key ({})",
                    settings.api_key_env
                ))
            })?;
            let provider = super::providers::openai::OpenAiEmbeddingProvider::new(
                api_key,
                settings.model.clone(),
                settings.dimensions,
                settings.endpoint.as_deref(),
                settings.timeout_secs.map(Duration::from_secs),
            )?;
            Ok(Arc::new(provider))
        }

        "mock" => {
            let provider = super::providers::mock::MockProvider::new(settings.dimensions);
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: openai, mock",
            settings.provider
        ))),
    }
}
