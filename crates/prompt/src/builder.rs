//! Prompt builder for rendering the grounded question prompt.

use crate::types::{BuiltPrompt, PersonaDefinition};
use grounded_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde_json::json;

/// Build the system and user messages for one question.
///
/// # Arguments
/// * `persona` - Persona supplying the system instruction and template
/// * `context` - Retrieved passages, already joined
/// * `question` - The caller's query
///
/// # Example
/// ```
/// use grounded_prompt::{build_prompt, PersonaDefinition};
///
/// let built = build_prompt(&PersonaDefinition::default(), "Rust since 2019", "Which languages?").unwrap();
/// assert_eq!(built.user, "Context: Rust since 2019\n\nQuestion: Which languages?\n\nAnswer:");
/// ```
pub fn build_prompt(
    persona: &PersonaDefinition,
    context: &str,
    question: &str,
) -> AppResult<BuiltPrompt> {
    tracing::debug!(persona = %persona.id, context_len = context.len(), "Building prompt");

    let user = render_template(
        &persona.template,
        &json!({ "context": context, "question": question }),
    )?;

    Ok(BuiltPrompt {
        system: persona.system.clone(),
        user,
        source_persona_id: persona.id.clone(),
    })
}

/// Render a Handlebars template with variables.
pub fn render_template(template: &str, variables: &serde_json::Value) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
