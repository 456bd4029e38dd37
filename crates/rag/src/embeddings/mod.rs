//! Query embedding.
//!
//! Turns the caller's question into the fixed-length vector the hybrid-search
//! index was built with. One provider call per query, no caching.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use crate::types::Query;
use grounded_core::{AppError, AppResult};
use std::sync::Arc;

/// Embeds queries and enforces the agreed dimensionality.
#[derive(Clone)]
pub struct QueryEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
}

impl QueryEmbedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Vector length every embedding must have.
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed one query.
    ///
    /// Fails if the provider errors, returns nothing, or returns a vector of
    /// the wrong length.
    pub async fn embed(&self, query: &Query) -> AppResult<Vec<f32>> {
        tracing::debug!(
            provider = self.provider.provider_name(),
            model = self.provider.model_name(),
            dimensions = self.provider.dimensions(),
            "Embedding query"
        );

        let embedding = self.provider.embed(query.as_str()).await?;

        if embedding.len() != self.provider.dimensions() {
            return Err(AppError::Embedding(format!(
                "Unexpected embedding dimensions: got {}, expected {}",
                embedding.len(),
                self.provider.dimensions()
            )));
        }

        Ok(embedding)
    }
}
