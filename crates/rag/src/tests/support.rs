//! Recording collaborators shared by the scenario tests.

use crate::admission::{AdmissionController, RateLimitPolicy, RateLimiter, SlidingWindowLimiter};
use crate::embeddings::{EmbeddingProvider, QueryEmbedder};
use crate::rag::{AnswerGenerator, DEFAULT_CHAT_MODEL};
use crate::retrieval::{HybridRetriever, HybridSearch, HybridSearchRequest};
use crate::types::{RateLimitDecision, RetrievedDocument};
use crate::Pipeline;
use grounded_core::{AppError, AppResult};
use grounded_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered log of collaborator calls across one test.
pub type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug)]
pub struct RecordingEmbedder {
    pub log: CallLog,
    pub dimensions: usize,
    pub fail: bool,
    pub texts: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl EmbeddingProvider for RecordingEmbedder {
    fn provider_name(&self) -> &str {
        "recording"
    }

    fn model_name(&self) -> &str {
        "text-embedding-3-large"
    }

    fn dimensions(&self) -> usize {
        384
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.log.lock().unwrap().push("embed".to_string());
        self.texts.lock().unwrap().extend(texts.iter().cloned());
        if self.fail {
            return Err(AppError::Embedding("Incorrect API key provided".to_string()));
        }
        Ok(texts.iter().map(|_| vec![0.5; self.dimensions]).collect())
    }
}

pub struct RecordingStore {
    pub log: CallLog,
    pub rows: Vec<RetrievedDocument>,
    pub fail: bool,
    pub requests: Mutex<Vec<HybridSearchRequest>>,
}

#[async_trait::async_trait]
impl HybridSearch for RecordingStore {
    fn store_name(&self) -> &str {
        "recording"
    }

    async fn hybrid_search(
        &self,
        request: &HybridSearchRequest,
    ) -> AppResult<Vec<RetrievedDocument>> {
        self.log.lock().unwrap().push("retrieve".to_string());
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(AppError::Retrieval(
                "Could not find the function public.hybrid_search".to_string(),
            ));
        }
        Ok(self.rows.clone())
    }
}

/// Counter store that cannot be reached.
pub struct UnreachableLimiter;

#[async_trait::async_trait]
impl RateLimiter for UnreachableLimiter {
    fn backend_name(&self) -> &str {
        "unreachable"
    }

    async fn limit(&self, _identifier: &str) -> AppResult<RateLimitDecision> {
        Err(AppError::RateLimit(
            "Failed to reach rate limit store: connection refused".to_string(),
        ))
    }
}

pub struct RecordingChat {
    pub log: CallLog,
    pub content: Option<String>,
    pub fail: bool,
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[async_trait::async_trait]
impl LlmClient for RecordingChat {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.log.lock().unwrap().push("generate".to_string());
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(AppError::Llm(
                "That model is currently overloaded with other requests.".to_string(),
            ));
        }
        Ok(LlmResponse {
            content: self.content.clone(),
            model: request.model.clone(),
            usage: LlmUsage::new(40, 12),
        })
    }
}

/// A pipeline wired to recording collaborators, with handles to inspect them.
pub struct Harness {
    pub log: CallLog,
    pub embedder: Arc<RecordingEmbedder>,
    pub store: Arc<RecordingStore>,
    pub chat: Arc<RecordingChat>,
    pub pipeline: Pipeline,
}

pub struct HarnessBuilder {
    rows: Vec<RetrievedDocument>,
    content: Option<String>,
    dimensions: usize,
    embed_fails: bool,
    store_fails: bool,
    chat_fails: bool,
    limiter_fails: bool,
    admission: bool,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            rows: vec![RetrievedDocument::new("A"), RetrievedDocument::new("B")],
            content: Some("Grounded answer.".to_string()),
            dimensions: 384,
            embed_fails: false,
            store_fails: false,
            chat_fails: false,
            limiter_fails: false,
            admission: true,
        }
    }
}

impl HarnessBuilder {
    pub fn rows(mut self, rows: Vec<RetrievedDocument>) -> Self {
        self.rows = rows;
        self
    }

    pub fn content(mut self, content: Option<&str>) -> Self {
        self.content = content.map(str::to_string);
        self
    }

    pub fn dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn embed_fails(mut self) -> Self {
        self.embed_fails = true;
        self
    }

    pub fn store_fails(mut self) -> Self {
        self.store_fails = true;
        self
    }

    pub fn chat_fails(mut self) -> Self {
        self.chat_fails = true;
        self
    }

    pub fn limiter_fails(mut self) -> Self {
        self.limiter_fails = true;
        self
    }

    pub fn without_admission(mut self) -> Self {
        self.admission = false;
        self
    }

    pub fn build(self) -> Harness {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));

        let embedder = Arc::new(RecordingEmbedder {
            log: log.clone(),
            dimensions: self.dimensions,
            fail: self.embed_fails,
            texts: Mutex::new(Vec::new()),
        });
        let store = Arc::new(RecordingStore {
            log: log.clone(),
            rows: self.rows,
            fail: self.store_fails,
            requests: Mutex::new(Vec::new()),
        });
        let chat = Arc::new(RecordingChat {
            log: log.clone(),
            content: self.content,
            fail: self.chat_fails,
            requests: Mutex::new(Vec::new()),
        });

        let mut pipeline = Pipeline::new(
            QueryEmbedder::new(embedder.clone()),
            HybridRetriever::new(store.clone()),
            AnswerGenerator::new(chat.clone(), DEFAULT_CHAT_MODEL),
        );
        if self.admission {
            let limiter: Arc<dyn RateLimiter> = if self.limiter_fails {
                Arc::new(UnreachableLimiter)
            } else {
                Arc::new(SlidingWindowLimiter::new(RateLimitPolicy {
                    limit: 3,
                    window: Duration::from_secs(10),
                }))
            };
            pipeline = pipeline.with_admission(AdmissionController::new(limiter, "api"));
        }

        Harness {
            log,
            embedder,
            store,
            chat,
            pipeline,
        }
    }
}

impl Harness {
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}
