//! Pipeline orchestrator.
//!
//! A request moves through typed stages, each produced only by the previous
//! one, so a later stage cannot run before an earlier one has succeeded:
//!
//! ```text
//! Received -> Admitted -> Embedded -> Retrieved -> Answered
//! ```
//!
//! The first failure ends the request.

use crate::admission::AdmissionController;
use crate::embeddings::QueryEmbedder;
use crate::error::{PipelineError, Stage};
use crate::http::{HttpRequest, HttpResponse};
use crate::rag::AnswerGenerator;
use crate::retrieval::HybridRetriever;
use crate::types::{Query, RetrievedDocument};
use grounded_core::config::BoundarySettings;
use tracing::Instrument;

/// A parsed query, not yet admitted.
#[derive(Debug)]
pub struct Received {
    pub query: Query,
}

/// A query that passed the admission gate.
#[derive(Debug)]
pub struct Admitted {
    pub query: Query,
}

#[derive(Debug)]
pub struct Embedded {
    pub query: Query,
    pub embedding: Vec<f32>,
}

#[derive(Debug)]
pub struct Retrieved {
    pub query: Query,
    pub documents: Vec<RetrievedDocument>,
}

#[derive(Debug)]
pub struct Answered {
    pub answer: String,
}

/// The query-answering pipeline.
///
/// Cheap to clone; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct Pipeline {
    admission: Option<AdmissionController>,
    embedder: QueryEmbedder,
    retriever: HybridRetriever,
    generator: AnswerGenerator,
    boundary: BoundarySettings,
}

impl Pipeline {
    /// Pipeline without an admission gate and with default boundary settings.
    pub fn new(
        embedder: QueryEmbedder,
        retriever: HybridRetriever,
        generator: AnswerGenerator,
    ) -> Self {
        Self {
            admission: None,
            embedder,
            retriever,
            generator,
            boundary: BoundarySettings::default(),
        }
    }

    pub fn with_admission(mut self, admission: AdmissionController) -> Self {
        self.admission = Some(admission);
        self
    }

    pub fn with_boundary(mut self, boundary: BoundarySettings) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn boundary(&self) -> &BoundarySettings {
        &self.boundary
    }

    pub async fn admit(&self, received: Received) -> Result<Admitted, PipelineError> {
        let Received { query } = received;

        if let Some(admission) = &self.admission {
            let allowed = admission
                .admit()
                .await
                .map_err(PipelineError::upstream(Stage::Admission))?;
            if !allowed {
                tracing::warn!(identifier = admission.identifier(), "Admission denied");
                return Err(PipelineError::AdmissionDenied);
            }
        }

        Ok(Admitted { query })
    }

    pub async fn embed(&self, admitted: Admitted) -> Result<Embedded, PipelineError> {
        let Admitted { query } = admitted;
        let embedding = self
            .embedder
            .embed(&query)
            .await
            .map_err(PipelineError::upstream(Stage::Embedding))?;

        tracing::debug!(dimensions = embedding.len(), "Query embedded");
        Ok(Embedded { query, embedding })
    }

    pub async fn retrieve(&self, embedded: Embedded) -> Result<Retrieved, PipelineError> {
        let Embedded { query, embedding } = embedded;
        let documents = self
            .retriever
            .retrieve(&query, &embedding)
            .await
            .map_err(PipelineError::upstream(Stage::Retrieval))?;

        tracing::debug!(documents = documents.len(), "Passages retrieved");
        Ok(Retrieved { query, documents })
    }

    pub async fn generate(&self, retrieved: Retrieved) -> Result<Answered, PipelineError> {
        let Retrieved { query, documents } = retrieved;
        let answer = self
            .generator
            .generate(&query, &documents)
            .await
            .map_err(PipelineError::upstream(Stage::Generation))?;

        Ok(Answered { answer })
    }

    /// Run every stage for one query.
    pub async fn answer(&self, query: Query) -> Result<String, PipelineError> {
        let admitted = self.admit(Received { query }).await?;
        let embedded = self.embed(admitted).await?;
        let retrieved = self.retrieve(embedded).await?;
        let answered = self.generate(retrieved).await?;
        Ok(answered.answer)
    }

    /// Serve one HTTP request: method gate, body parse, pipeline, envelope.
    pub async fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("request", id = %request_id, method = %request.method);

        async {
            if self.boundary.cors && request.is_method("OPTIONS") {
                tracing::debug!("Pre-flight request");
                return HttpResponse::preflight();
            }

            let response = match self.run(request).await {
                Ok(answer) => {
                    tracing::info!("Request answered");
                    HttpResponse::answer(&answer)
                }
                Err(err) => {
                    match &err {
                        PipelineError::Upstream { stage, source } => {
                            tracing::error!(stage = %stage, "Upstream failure: {}", source);
                        }
                        other => {
                            tracing::info!(kind = ?other.kind(), "Request rejected: {}", other);
                        }
                    }
                    HttpResponse::error(&err, self.boundary.status_codes)
                }
            };

            if self.boundary.cors {
                response.with_cors()
            } else {
                response
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &HttpRequest) -> Result<String, PipelineError> {
        if !request.is_method("POST") {
            return Err(PipelineError::MethodNotAllowed(request.method.clone()));
        }

        let query = Query::from_json(&request.body)?;
        tracing::debug!(query_len = query.as_str().len(), "Query received");

        self.answer(query).await
    }
}
