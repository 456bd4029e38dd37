//! Supabase (PostgREST) hybrid-search store.
//!
//! Calls a SQL function through `POST {url}/rest/v1/rpc/{function}`. The
//! function receives `query_text`, `query_embedding` and `match_count` and
//! returns a set of rows with at least a `content` column.

use super::{HybridSearch, HybridSearchRequest};
use crate::types::RetrievedDocument;
use grounded_core::config::RetrievalSettings;
use grounded_core::{AppError, AppResult};
use serde::Deserialize;
use std::time::Duration;

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

/// Hybrid-search store reached through Supabase's REST gateway.
#[derive(Debug)]
pub struct SupabaseStore {
    client: reqwest::Client,
    url: String,
    service_key: String,
    function: String,
}

impl SupabaseStore {
    pub fn new(
        url: impl Into<String>,
        service_key: impl Into<String>,
        function: impl Into<String>,
        timeout: Option<Duration>,
    ) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Retrieval(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            function: function.into(),
        })
    }

    /// Build from the `retrieval` configuration section.
    pub fn from_settings(settings: &RetrievalSettings) -> AppResult<Self> {
        let url = settings.url.clone().ok_or_else(|| {
            AppError::Config(format!(
                "Hybrid-search store URL not set ({})",
                settings.url_env
            ))
        })?;
        let service_key = settings.service_key.clone().ok_or_else(|| {
            AppError::Config(format!(
                "Service key not found in environment variable: {}",
                settings.service_key_env
            ))
        })?;

        Self::new(
            url,
            service_key,
            settings.function.clone(),
            settings.timeout_secs.map(Duration::from_secs),
        )
    }

    fn rpc_url(&self) -> String {
        format!("{}/rest/v1/rpc/{}", self.url, self.function)
    }

    fn error_message(status: reqwest::StatusCode, body: &str) -> String {
        match serde_json::from_str::<PostgrestError>(body) {
            Ok(err) => {
                let mut message = err.message;
                if let Some(code) = err.code {
                    message = format!("{} (code {})", message, code);
                }
                if let Some(hint) = err.hint {
                    message = format!("{}. Hint: {}", message, hint);
                }
                message
            }
            Err(_) => format!("Hybrid search failed ({}): {}", status, body),
        }
    }

    /// A `null` body (function returned no set) reads as no documents.
    fn parse_rows(body: &str) -> AppResult<Vec<RetrievedDocument>> {
        let rows: Option<Vec<RetrievedDocument>> = serde_json::from_str(body).map_err(|e| {
            AppError::Retrieval(format!("Failed to parse hybrid search response: {}", e))
        })?;
        Ok(rows.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl HybridSearch for SupabaseStore {
    fn store_name(&self) -> &str {
        "supabase"
    }

    async fn hybrid_search(
        &self,
        request: &HybridSearchRequest,
    ) -> AppResult<Vec<RetrievedDocument>> {
        let response = self
            .client
            .post(self.rpc_url())
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to reach hybrid search: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to read hybrid search response: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::Retrieval(Self::error_message(status, &body)));
        }

        Self::parse_rows(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_rpc_url() {
        let store =
            SupabaseStore::new("https://abc.supabase.co/", "key", "hybrid_search", None).unwrap();
        assert_eq!(store.rpc_url(), "https://abc.supabase.co/rest/v1/rpc/hybrid_search");
    }

    #[test]
    fn test_from_settings_requires_url() {
        let settings = RetrievalSettings {
            service_key: Some("key".to_string()),
            ..Default::default()
        };
        let err = SupabaseStore::from_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }

    #[test]
    fn test_parse_rows() {
        let rows = SupabaseStore::parse_rows(
            r#"[{"id": 3, "content": "Led the data team"}, {"id": 9, "content": "Wrote the CLI"}]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].content, "Led the data team");
        assert_eq!(rows[1].metadata["id"], 9);
    }

    #[test]
    fn test_parse_null_as_empty() {
        assert!(SupabaseStore::parse_rows("null").unwrap().is_empty());
        assert!(SupabaseStore::parse_rows("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(SupabaseStore::parse_rows("<html>").is_err());
    }

    #[test]
    fn test_postgrest_error_message() {
        let message = SupabaseStore::error_message(
            StatusCode::NOT_FOUND,
            r#"{"code":"PGRST202","details":null,"hint":"Perhaps you meant to call public.hybrid_search2","message":"Could not find the function public.hybrid_search"}"#,
        );
        assert_eq!(
            message,
            "Could not find the function public.hybrid_search (code PGRST202). Hint: Perhaps you meant to call public.hybrid_search2"
        );
    }

    #[test]
    fn test_plain_error_body() {
        let message = SupabaseStore::error_message(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(message.contains("502"));
        assert!(message.contains("upstream down"));
    }
}
