//! Configuration management for the Grounded answering service.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - A YAML config file (`GROUNDED_CONFIG` or `--config`)
//! - Environment variables (secrets and collaborator URLs)
//! - Command-line flags
//!
//! Secrets are never read from the YAML file itself. The file names the
//! environment variable that holds each secret (`apiKeyEnv`, `tokenEnv`, ...).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding dimensionality agreed with the hybrid-search index.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

/// Answer returned when the chat model produces no content.
pub const DEFAULT_FALLBACK_ANSWER: &str = "Error";

const REDACTED: &str = "***";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Config file the settings were merged from, if any
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Chat-completion provider settings
    pub llm: LlmSettings,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Hybrid-search store settings
    pub retrieval: RetrievalSettings,

    /// Admission control settings
    pub rate_limit: RateLimitSettings,

    /// HTTP boundary settings
    pub boundary: BoundarySettings,

    /// Persona and answer settings
    pub persona: PersonaSettings,
}

/// Chat-completion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider name ("openai" or "ollama")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// Custom base URL (OpenAI-compatible API root)
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Sampling temperature; provider default when absent
    pub temperature: Option<f32>,

    /// Cap on generated tokens; provider default when absent
    pub max_tokens: Option<u32>,

    /// HTTP request timeout in seconds
    pub timeout_secs: Option<u64>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            endpoint: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: None,
            max_tokens: None,
            timeout_secs: None,
            api_key: None,
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name ("openai" or "mock")
    pub provider: String,

    /// Embedding model identifier
    pub model: String,

    /// Requested vector length; must match the store's vector index
    pub dimensions: usize,

    /// Custom base URL (OpenAI-compatible API root)
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// HTTP request timeout in seconds
    pub timeout_secs: Option<u64>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-large".to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            endpoint: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: None,
            api_key: None,
        }
    }
}

/// Hybrid-search store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Store project URL; falls back to `urlEnv`
    pub url: Option<String>,

    /// Environment variable holding the store URL
    pub url_env: String,

    /// Environment variable holding the service key
    pub service_key_env: String,

    /// Name of the hybrid-search procedure
    pub function: String,

    /// Maximum number of passages to fetch
    pub match_count: usize,

    /// HTTP request timeout in seconds
    pub timeout_secs: Option<u64>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub service_key: Option<String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            url: None,
            url_env: "SUPABASE_URL".to_string(),
            service_key_env: "SUPABASE_SERVICE_ROLE_KEY".to_string(),
            function: "hybrid_search".to_string(),
            match_count: 5,
            timeout_secs: None,
            service_key: None,
        }
    }
}

/// Admission control configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimitSettings {
    /// Whether requests pass through the admission gate at all
    pub enabled: bool,

    /// Counter backend ("upstash" or "memory")
    pub backend: String,

    /// Bucket identifier shared by every caller
    pub identifier: String,

    /// Admitted calls per window
    pub limit: u32,

    /// Window width in seconds
    pub window_secs: u64,

    /// Key prefix in the counter store
    pub prefix: String,

    /// Counter store REST URL; falls back to `urlEnv`
    pub url: Option<String>,

    /// Environment variable holding the REST URL
    pub url_env: String,

    /// Environment variable holding the REST token
    pub token_env: String,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "upstash".to_string(),
            identifier: "api".to_string(),
            limit: 3,
            window_secs: 10,
            prefix: "@upstash/ratelimit".to_string(),
            url: None,
            url_env: "UPSTASH_REDIS_REST_URL".to_string(),
            token_env: "UPSTASH_REDIS_REST_TOKEN".to_string(),
            timeout_secs: None,
            token: None,
        }
    }
}

/// How error kinds map to HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusCodePolicy {
    /// Every error is a 500
    #[default]
    Uniform,
    /// 400 / 405 / 429 / 502 by error kind
    ByKind,
}

/// HTTP boundary configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoundarySettings {
    /// Attach CORS headers and answer pre-flight requests
    pub cors: bool,

    /// Status code mapping for error envelopes
    pub status_codes: StatusCodePolicy,
}

impl Default for BoundarySettings {
    fn default() -> Self {
        Self {
            cors: true,
            status_codes: StatusCodePolicy::Uniform,
        }
    }
}

/// Persona configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonaSettings {
    /// Inline system instruction
    pub system_prompt: Option<String>,

    /// YAML persona definition; wins over `systemPrompt`
    pub file: Option<PathBuf>,

    /// Answer used when the model returns no content
    pub fallback_answer: String,
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            system_prompt: None,
            file: None,
            fallback_answer: DEFAULT_FALLBACK_ANSWER.to_string(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ConfigFile {
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    retrieval: Option<RetrievalSettings>,
    rate_limit: Option<RateLimitSettings>,
    boundary: Option<BoundarySettings>,
    persona: Option<PersonaSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl AppConfig {
    /// Load configuration using `GROUNDED_CONFIG` as the config file path.
    ///
    /// Environment variables:
    /// - `GROUNDED_CONFIG`: Path to config file
    /// - `GROUNDED_PROVIDER`: Chat provider
    /// - `GROUNDED_MODEL`: Chat model identifier
    /// - `OPENAI_BASE_URL`: Base URL for both OpenAI-compatible providers
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    /// - plus the secret variables named in the config (`OPENAI_API_KEY`, ...)
    pub fn load() -> AppResult<Self> {
        let config_file = std::env::var("GROUNDED_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_file)
    }

    /// Load configuration from an explicit config file path.
    ///
    /// A path that was asked for but does not exist is an error.
    pub fn load_from(config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Config file does not exist: {:?}",
                    path
                )));
            }
            config = config.merge_yaml(&path)?;
            config.config_file = Some(path);
        }

        if let Ok(provider) = std::env::var("GROUNDED_PROVIDER") {
            config.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("GROUNDED_MODEL") {
            config.llm.model = model;
        }

        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.llm.endpoint.get_or_insert_with(|| base_url.clone());
            config.embedding.endpoint.get_or_insert(base_url);
        }

        if config.log_level.is_none() {
            config.log_level = std::env::var("RUST_LOG").ok();
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        config.resolve_secrets();

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Merge YAML configuration text into this config.
    pub fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        // An empty document deserializes as unit, not as an empty map
        if contents.trim().is_empty() {
            return Ok(self.clone());
        }

        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(rate_limit) = config_file.rate_limit {
            result.rate_limit = rate_limit;
        }
        if let Some(boundary) = config_file.boundary {
            result.boundary = boundary;
        }
        if let Some(persona) = config_file.persona {
            result.persona = persona;
        }

        Ok(result)
    }

    /// Read secrets and URLs from the environment variables named in the config.
    pub fn resolve_secrets(&mut self) {
        self.llm.api_key = std::env::var(&self.llm.api_key_env).ok();
        self.embedding.api_key = std::env::var(&self.embedding.api_key_env).ok();
        self.retrieval.service_key = std::env::var(&self.retrieval.service_key_env).ok();
        self.rate_limit.token = std::env::var(&self.rate_limit.token_env).ok();

        if self.retrieval.url.is_none() {
            self.retrieval.url = std::env::var(&self.retrieval.url_env).ok();
        }
        if self.rate_limit.url.is_none() {
            self.rate_limit.url = std::env::var(&self.rate_limit.url_env).ok();
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over the file and the environment.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Copy of the configuration with every secret replaced by a marker.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let mask = |secret: &mut Option<String>| {
            if secret.is_some() {
                *secret = Some(REDACTED.to_string());
            }
        };
        mask(&mut copy.llm.api_key);
        mask(&mut copy.embedding.api_key);
        mask(&mut copy.retrieval.service_key);
        mask(&mut copy.rate_limit.token);
        copy
    }

    /// Validate configuration for the selected providers and backends.
    pub fn validate(&self) -> AppResult<()> {
        let chat_providers = ["openai", "ollama"];
        let chat_provider = self.llm.provider.to_ascii_lowercase();
        if !chat_providers.contains(&chat_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                chat_providers.join(", ")
            )));
        }
        if chat_provider == "openai" && self.llm.api_key.is_none() {
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                self.llm.api_key_env
            )));
        }

        let embedding_providers = ["openai", "mock"];
        if !embedding_providers.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                embedding_providers.join(", ")
            )));
        }
        if self.embedding.provider == "openai" && self.embedding.api_key.is_none() {
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                self.embedding.api_key_env
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.url.is_none() {
            return Err(AppError::Config(format!(
                "Hybrid-search store URL not set (config `retrieval.url` or {})",
                self.retrieval.url_env
            )));
        }
        if self.retrieval.service_key.is_none() {
            return Err(AppError::Config(format!(
                "Service key not found in environment variable: {}",
                self.retrieval.service_key_env
            )));
        }
        if self.retrieval.match_count == 0 {
            return Err(AppError::Config(
                "Retrieval match count must be greater than zero".to_string(),
            ));
        }

        if self.rate_limit.enabled {
            self.validate_rate_limit()?;
        }

        Ok(())
    }

    fn validate_rate_limit(&self) -> AppResult<()> {
        let settings = &self.rate_limit;
        if settings.limit == 0 || settings.window_secs == 0 {
            return Err(AppError::Config(
                "Rate limit and window must both be greater than zero".to_string(),
            ));
        }

        match settings.backend.as_str() {
            "memory" => Ok(()),
            "upstash" => {
                if settings.url.is_none() {
                    return Err(AppError::Config(format!(
                        "Rate limit store URL not set (config `rateLimit.url` or {})",
                        settings.url_env
                    )));
                }
                if settings.token.is_none() {
                    return Err(AppError::Config(format!(
                        "Rate limit token not found in environment variable: {}",
                        settings.token_env
                    )));
                }
                Ok(())
            }
            other => Err(AppError::Config(format!(
                "Unknown rate limit backend: {}. Supported: upstash, memory",
                other
            ))),
        }
    }
}
