//! Prompt system for the Grounded service.
//!
//! This crate provides:
//! - The persona definition (system instruction + user template)
//! - YAML persona loading
//! - Handlebars rendering of the grounded question prompt

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, render_template};
pub use loader::load_persona;
pub use types::{BuiltPrompt, PersonaDefinition, DEFAULT_SYSTEM_PROMPT, GROUNDED_TEMPLATE};
