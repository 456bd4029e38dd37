//! Ask command handler.
//!
//! Wraps a question in a JSON body and sends it through the pipeline as a POST.

use clap::Args;
use grounded_core::{config::AppConfig, AppResult};
use grounded_rag::{build_pipeline, HttpRequest};

/// Ask a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,
}

impl AskCommand {
    /// Request body carrying the question.
    pub fn body(&self) -> String {
        serde_json::json!({ "query": self.query }).to_string()
    }

    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        config.validate()?;
        let pipeline = build_pipeline(config)?;

        let response = pipeline.handle(&HttpRequest::post(self.body())).await;
        tracing::debug!(status = response.status, "Pipeline responded");

        super::emit(&response)
    }
}
