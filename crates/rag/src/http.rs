//! HTTP boundary types.
//!
//! The pipeline speaks in plain request/response values so any host (the CLI,
//! an HTTP server, a serverless runtime) can carry them over the wire.

use crate::error::{ErrorKind, PipelineError};
use grounded_core::config::StatusCodePolicy;
use serde_json::json;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

/// CORS headers attached to every response when CORS is enabled.
pub const CORS_HEADERS: [(&str, &str); 2] = [
    ("Access-Control-Allow-Origin", "*"),
    (
        "Access-Control-Allow-Headers",
        "authorization, x-client-info, apikey, content-type",
    ),
];

/// An inbound request as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub body: String,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            body: body.into(),
        }
    }

    /// A POST carrying `body`.
    pub fn post(body: impl Into<String>) -> Self {
        Self::new("POST", body)
    }

    /// Method names are compared case-insensitively.
    pub fn is_method(&self, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method)
    }
}

/// The envelope sent back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// `{"response": answer}` with status 200.
    pub fn answer(answer: &str) -> Self {
        Self::json(200, json!({ "response": answer }).to_string())
    }

    /// `{"error": message}` with the status chosen by `policy`.
    pub fn error(error: &PipelineError, policy: StatusCodePolicy) -> Self {
        Self::json(
            status_for(error.kind(), policy),
            json!({ "error": error.to_string() }).to_string(),
        )
    }

    /// Reply to a CORS pre-flight request.
    pub fn preflight() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: "ok".to_string(),
        }
        .with_cors()
    }

    fn json(status: u16, body: String) -> Self {
        Self {
            status,
            headers: vec![(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())],
            body,
        }
    }

    pub fn with_cors(mut self) -> Self {
        for (name, value) in CORS_HEADERS {
            self.headers.push((name.to_string(), value.to_string()));
        }
        self
    }

    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Status code for an error kind under `policy`.
pub fn status_for(kind: ErrorKind, policy: StatusCodePolicy) -> u16 {
    match policy {
        StatusCodePolicy::Uniform => 500,
        StatusCodePolicy::ByKind => match kind {
            ErrorKind::Validation => 400,
            ErrorKind::MethodNotAllowed => 405,
            ErrorKind::AdmissionDenied => 429,
            ErrorKind::Upstream => 502,
        },
    }
}
