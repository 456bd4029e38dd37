//! Values that flow between pipeline stages.

use crate::error::PipelineError;
use serde::{Deserialize, Deserializer, Serialize};

/// Number of passages requested from the hybrid-search store.
pub const DEFAULT_MATCH_COUNT: usize = 5;

/// A caller's question. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// Wrap query text, rejecting the empty string.
    pub fn new(text: impl Into<String>) -> Result<Self, PipelineError> {
        let text = text.into();
        if text.is_empty() {
            return Err(PipelineError::Validation("Query is required".to_string()));
        }
        Ok(Self(text))
    }

    /// Extract the `query` field from a JSON request body.
    ///
    /// A missing, null or empty `query` is a validation error, as is a body
    /// that is not JSON or a `query` that is not a string.
    pub fn from_json(body: &str) -> Result<Self, PipelineError> {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| PipelineError::Validation(format!("Invalid JSON body: {}", e)))?;

        match value.get("query") {
            None | Some(serde_json::Value::Null) => {
                Err(PipelineError::Validation("Query is required".to_string()))
            }
            Some(serde_json::Value::String(text)) => Self::new(text.clone()),
            Some(_) => Err(PipelineError::Validation(
                "Query must be a string".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One ranked passage from the hybrid-search store.
///
/// Only `content` is read; every other column the store returns is kept in
/// `metadata` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,

    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,

    /// Quota left in the current window, when the backend reports it
    pub remaining: Option<i64>,
}

impl RateLimitDecision {
    pub fn allowed(remaining: i64) -> Self {
        Self {
            allowed: true,
            remaining: Some(remaining),
        }
    }

    pub fn denied() -> Self {
        Self {
            allowed: false,
            remaining: Some(0),
        }
    }
}
