//! Config command handler.

use clap::Args;
use grounded_core::{config::AppConfig, AppResult};

/// Print the effective configuration
#[derive(Args, Debug)]
pub struct ConfigCommand {
    /// Output as JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}

impl ConfigCommand {
    pub fn render(&self, config: &AppConfig) -> AppResult<String> {
        let redacted = config.redacted();
        if self.json {
            Ok(serde_json::to_string_pretty(&redacted)?)
        } else {
            Ok(serde_yaml::to_string(&redacted)?)
        }
    }

    /// Execute the config command.
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let rendered = self.render(config)?;
        print!("{}", rendered);

        if let Err(e) = config.validate() {
            tracing::warn!("Configuration is incomplete: {}", e);
        }

        Ok(())
    }
}
