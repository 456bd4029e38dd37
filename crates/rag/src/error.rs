//! Pipeline failure taxonomy.
//!
//! Every failure short-circuits the remaining stages. The boundary decides
//! how each [`ErrorKind`] maps to a status code.

use grounded_core::AppError;
use thiserror::Error;

/// Stage whose collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Admission,
    Embedding,
    Retrieval,
    Generation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admission => "admission",
            Self::Embedding => "embedding",
            Self::Retrieval => "retrieval",
            Self::Generation => "generation",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse error class used for status-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    MethodNotAllowed,
    AdmissionDenied,
    Upstream,
}

/// Terminal failure of one request.
///
/// The display text is exactly what the caller sees in the error envelope.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed request; no collaborator was contacted
    #[error("{0}")]
    Validation(String),

    /// Request used a method other than POST
    #[error("HTTP method {0} is not allowed.")]
    MethodNotAllowed(String),

    /// The shared admission window is full
    #[error("Rate Limit Exception")]
    AdmissionDenied,

    /// A collaborator call failed
    #[error("{}", .source.message())]
    Upstream { stage: Stage, source: AppError },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::MethodNotAllowed(_) => ErrorKind::MethodNotAllowed,
            Self::AdmissionDenied => ErrorKind::AdmissionDenied,
            Self::Upstream { .. } => ErrorKind::Upstream,
        }
    }

    /// Adapter for `map_err` that tags a collaborator error with its stage.
    pub fn upstream(stage: Stage) -> impl FnOnce(AppError) -> Self {
        move |source| Self::Upstream { stage, source }
    }
}
