//! Handle command handler.
//!
//! Feeds a raw method and body to the HTTP boundary, the way a server host
//! would, and prints the envelope.

use clap::Args;
use grounded_core::{config::AppConfig, AppError, AppResult};
use grounded_rag::{build_pipeline, HttpRequest};
use std::io::Read;

/// Pass a raw request through the HTTP boundary
#[derive(Args, Debug)]
pub struct HandleCommand {
    /// HTTP method
    #[arg(long, default_value = "POST")]
    pub method: String,

    /// Request body (read from stdin when omitted)
    #[arg(long)]
    pub body: Option<String>,
}

impl HandleCommand {
    fn read_body(&self) -> AppResult<String> {
        match &self.body {
            Some(body) => Ok(body.clone()),
            None => {
                let mut body = String::new();
                std::io::stdin()
                    .read_to_string(&mut body)
                    .map_err(|e| AppError::Other(format!("Failed to read stdin: {}", e)))?;
                Ok(body)
            }
        }
    }

    /// Execute the handle command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(method = %self.method, "Executing handle command");

        config.validate()?;
        let pipeline = build_pipeline(config)?;

        let request = HttpRequest::new(self.method.clone(), self.read_body()?);
        let response = pipeline.handle(&request).await;

        tracing::info!(status = response.status, "Pipeline responded");
        for (name, value) in &response.headers {
            tracing::debug!("{}: {}", name, value);
        }

        super::emit(&response)
    }
}
