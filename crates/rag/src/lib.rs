//! Grounded question-answering pipeline.
//!
//! One request flows through four stages, strictly in order:
//!
//! 1. **Admission**: a shared sliding-window counter decides whether to proceed
//! 2. **Embedding**: the query becomes a fixed-length vector
//! 3. **Retrieval**: a hybrid (lexical + vector) search returns ranked passages
//! 4. **Generation**: a chat model answers from those passages only
//!
//! [`Pipeline`] sequences the stages and [`Pipeline::handle`] maps the
//! outcome onto an HTTP response envelope.

pub mod admission;
pub mod embeddings;
pub mod error;
pub mod factory;
pub mod http;
pub mod pipeline;
pub mod rag;
pub mod retrieval;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use admission::{AdmissionController, RateLimitPolicy, RateLimiter};
pub use embeddings::{EmbeddingProvider, QueryEmbedder};
pub use error::{ErrorKind, PipelineError, Stage};
pub use factory::build_pipeline;
pub use http::{HttpRequest, HttpResponse};
pub use pipeline::Pipeline;
pub use rag::AnswerGenerator;
pub use retrieval::{HybridRetriever, HybridSearch, HybridSearchRequest};
pub use types::{Query, RateLimitDecision, RetrievedDocument};
