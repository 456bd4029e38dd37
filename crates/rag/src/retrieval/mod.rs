//! Hybrid retrieval.
//!
//! Ranking is delegated entirely to the store: the raw query text drives the
//! lexical side and the embedding drives the vector side. Results come back
//! as-is, with no filtering, deduplication or re-ranking here.

pub mod supabase;

pub use supabase::SupabaseStore;

use crate::types::{Query, RetrievedDocument, DEFAULT_MATCH_COUNT};
use grounded_core::AppResult;
use serde::Serialize;
use std::sync::Arc;

/// Arguments of the store's hybrid-search procedure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridSearchRequest {
    pub query_text: String,
    pub query_embedding: Vec<f32>,
    pub match_count: usize,
}

/// A store that ranks passages by combined lexical and vector relevance.
#[async_trait::async_trait]
pub trait HybridSearch: Send + Sync {
    /// Store name for logs.
    fn store_name(&self) -> &str;

    /// Ranked passages, best first.
    async fn hybrid_search(&self, request: &HybridSearchRequest)
        -> AppResult<Vec<RetrievedDocument>>;
}

/// Fetches the top passages for a query.
#[derive(Clone)]
pub struct HybridRetriever {
    store: Arc<dyn HybridSearch>,
    match_count: usize,
}

impl HybridRetriever {
    pub fn new(store: Arc<dyn HybridSearch>) -> Self {
        Self {
            store,
            match_count: DEFAULT_MATCH_COUNT,
        }
    }

    pub fn with_match_count(mut self, match_count: usize) -> Self {
        self.match_count = match_count;
        self
    }

    pub fn match_count(&self) -> usize {
        self.match_count
    }

    /// Retrieve passages for `query`. An empty result is not an error.
    pub async fn retrieve(
        &self,
        query: &Query,
        embedding: &[f32],
    ) -> AppResult<Vec<RetrievedDocument>> {
        let request = HybridSearchRequest {
            query_text: query.as_str().to_string(),
            query_embedding: embedding.to_vec(),
            match_count: self.match_count,
        };

        let documents = self.store.hybrid_search(&request).await.map_err(|e| {
            tracing::error!(store = self.store.store_name(), "Error in hybrid search: {}", e);
            e
        })?;

        tracing::debug!(
            store = self.store.store_name(),
            documents = documents.len(),
            "Hybrid search returned"
        );

        Ok(documents)
    }
}
