//! Chat-model integration crate for the Grounded service.
//!
//! Provides a provider-agnostic chat-completion abstraction. Every provider
//! speaks the OpenAI-compatible `chat/completions` wire format.
//!
//! # Providers
//! - **OpenAI**: hosted API (default)
//! - **Ollama**: local runtime through its OpenAI-compatible endpoint
//!
//! # Example
//! ```no_run
//! use grounded_llm::{ChatMessage, LlmClient, LlmRequest, providers::OpenAiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new("sk-...")?;
//! let request = LlmRequest::new(
//!     "gpt-3.5-turbo",
//!     vec![ChatMessage::system("Be brief."), ChatMessage::user("Hello!")],
//! );
//! let response = client.complete(&request).await?;
//! println!("{:?}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{ChatMessage, ChatRole, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OpenAiClient;
pub use types::ProviderType;
