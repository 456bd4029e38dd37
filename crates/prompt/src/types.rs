//! Prompt types for the Grounded service.

use serde::{Deserialize, Serialize};

/// Template for the user message. `context` and `question` are the only variables.
pub const GROUNDED_TEMPLATE: &str = "Context: {{context}}\n\nQuestion: {{question}}\n\nAnswer:";

/// System instruction used when no persona is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a software engineer and computer science student. \
Use only the provided context of your experience and accomplishments to answer the question. \
Limit your responses to 2-3 sentences max.";

/// A persona: who the model speaks as, and how the question is framed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaDefinition {
    /// Unique persona identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// System instruction sent ahead of every question
    pub system: String,

    /// User message template with Handlebars syntax
    #[serde(default = "default_template")]
    pub template: String,
}

fn default_template() -> String {
    GROUNDED_TEMPLATE.to_string()
}

impl Default for PersonaDefinition {
    fn default() -> Self {
        Self {
            id: "grounded.default".to_string(),
            title: "Grounded answer".to_string(),
            api_version: "1.0".to_string(),
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            template: default_template(),
        }
    }
}

impl PersonaDefinition {
    /// Default persona with a different system instruction.
    pub fn with_system(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            ..Default::default()
        }
    }
}

/// A fully built prompt ready for the chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message
    pub system: String,

    /// User message
    pub user: String,

    /// Source persona ID
    #[serde(rename = "sourcePersonaId")]
    pub source_persona_id: String,
}
