//! Persona loader for YAML persona definitions.

use crate::types::PersonaDefinition;
use grounded_core::{AppError, AppResult};
use std::path::Path;

/// Load a persona definition from a YAML file.
///
/// # Example
/// ```no_run
/// use grounded_prompt::load_persona;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let persona = load_persona(Path::new("persona.yml"))?;
/// println!("Loaded persona: {}", persona.title);
/// # Ok(())
/// # }
/// ```
pub fn load_persona(path: &Path) -> AppResult<PersonaDefinition> {
    tracing::debug!("Loading persona from: {:?}", path);

    if !path.exists() {
        return Err(AppError::Prompt(format!("Persona file not found: {:?}", path)));
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Prompt(format!("Failed to read persona file {:?}: {}", path, e)))?;

    let definition: PersonaDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse persona YAML {:?}: {}", path, e))
    })?;

    validate_persona(&definition)?;

    tracing::info!("Loaded persona: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Validate a persona definition.
fn validate_persona(def: &PersonaDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Persona ID cannot be empty".to_string()));
    }

    if def.system.trim().is_empty() {
        return Err(AppError::Prompt(
            "Persona system instruction cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    // The pipeline only ever supplies these two variables
    if !def.template.contains("{{context}}") || !def.template.contains("{{question}}") {
        return Err(AppError::Prompt(
            "Persona template must reference {{context}} and {{question}}".to_string(),
        ));
    }

    Ok(())
}
