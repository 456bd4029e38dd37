//! Pipeline assembly from configuration.

use crate::admission::{
    AdmissionController, RateLimitPolicy, RateLimiter, SlidingWindowLimiter, UpstashRateLimiter,
};
use crate::embeddings::{create_provider, QueryEmbedder};
use crate::pipeline::Pipeline;
use crate::rag::AnswerGenerator;
use crate::retrieval::{HybridRetriever, SupabaseStore};
use grounded_core::config::{PersonaSettings, RateLimitSettings};
use grounded_core::{AppConfig, AppError, AppResult};
use grounded_prompt::{load_persona, PersonaDefinition};
use std::sync::Arc;

/// Wire every collaborator named in `config` into a [`Pipeline`].
///
/// # Errors
/// Returns error if a backend is unknown, a required secret is missing, or
/// the persona file cannot be loaded.
pub fn build_pipeline(config: &AppConfig) -> AppResult<Pipeline> {
    let embedder = QueryEmbedder::new(create_provider(&config.embedding)?);

    let store = SupabaseStore::from_settings(&config.retrieval)?;
    let retriever =
        HybridRetriever::new(Arc::new(store)).with_match_count(config.retrieval.match_count);

    let client = grounded_llm::create_client(&config.llm)?;
    let generator = AnswerGenerator::new(client, config.llm.model.clone())
        .with_persona(persona_from_settings(&config.persona)?)
        .with_temperature(config.llm.temperature)
        .with_max_tokens(config.llm.max_tokens)
        .with_fallback(config.persona.fallback_answer.clone());

    let mut pipeline =
        Pipeline::new(embedder, retriever, generator).with_boundary(config.boundary.clone());

    if config.rate_limit.enabled {
        let limiter = create_limiter(&config.rate_limit)?;
        tracing::debug!(
            backend = limiter.backend_name(),
            identifier = %config.rate_limit.identifier,
            "Admission gate enabled"
        );
        pipeline = pipeline.with_admission(AdmissionController::new(
            limiter,
            config.rate_limit.identifier.clone(),
        ));
    } else {
        tracing::debug!("Admission gate disabled");
    }

    Ok(pipeline)
}

/// Create the counter backend named in the `rateLimit` section.
pub fn create_limiter(settings: &RateLimitSettings) -> AppResult<Arc<dyn RateLimiter>> {
    match settings.backend.as_str() {
        "upstash" => Ok(Arc::new(UpstashRateLimiter::from_settings(settings)?)),
        "memory" => Ok(Arc::new(SlidingWindowLimiter::new(
            RateLimitPolicy::from_settings(settings),
        ))),
        other => Err(AppError::Config(format!(
            "Unknown rate limit backend: '{}'. Supported backends: upstash, memory",
            other
        ))),
    }
}

/// A persona file wins over an inline system prompt.
pub fn persona_from_settings(settings: &PersonaSettings) -> AppResult<PersonaDefinition> {
    if let Some(path) = &settings.file {
        return load_persona(path);
    }

    Ok(match &settings.system_prompt {
        Some(system) => PersonaDefinition::with_system(system.clone()),
        None => PersonaDefinition::default(),
    })
}
