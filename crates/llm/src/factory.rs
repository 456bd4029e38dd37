//! Chat client factory.
//!
//! Resolves a provider name into a concrete client, injecting the endpoint,
//! secret and timeout from configuration.

use crate::client::LlmClient;
use crate::providers::OpenAiClient;
use crate::types::ProviderType;
use grounded_core::config::LlmSettings;
use grounded_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a chat client from the `llm` configuration section.
///
/// # Errors
/// Returns error if:
/// - Provider is unknown
/// - The provider requires an API key and none was resolved
/// - The HTTP client cannot be built
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider).ok_or_else(|| {
        AppError::Config(format!("Unknown provider: {}", settings.provider))
    })?;

    if provider.requires_api_key() && settings.api_key.is_none() {
        return Err(AppError::Config(format!(
            "{} provider requires API key ({})",
            provider.as_str(),
            settings.api_key_env
        )));
    }

    let client = OpenAiClient::with_options(
        provider,
        settings.endpoint.as_deref(),
        settings.api_key.clone(),
        settings.timeout_secs.map(Duration::from_secs),
    )?;

    tracing::debug!(provider = provider.as_str(), "Created chat client");

    Ok(Arc::new(client))
}
