//! Config Command
//!
//! Inspect the effective pipeline configuration.
//!
//! Usage:
//!   bizhealth config show [-f toml|json]
//!   bizhealth config validate

use crate::cli::ui::Output;
use crate::config::{ENV_KEYS, PhaseConfig};
use crate::types::{PipelineError, Result};

/// Show the merged configuration
pub fn show(config: &PhaseConfig, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(config)?),
        "toml" => {
            println!("# Effective configuration (environment: {})\n", config.environment);
            println!("{}", toml::to_string_pretty(config)?);
        }
        other => {
            return Err(PipelineError::Config(format!(
                "Unknown format '{}'. Valid values: toml, json",
                other
            )));
        }
    }
    Ok(())
}

/// Check every bound and list all violations
pub fn validate(config: &PhaseConfig) -> Result<()> {
    let out = Output::new();
    let validation = config.validate();

    if validation.valid {
        out.success(&format!(
            "Configuration is valid (environment: {})",
            config.environment
        ));
        let overridden: Vec<&str> = ENV_KEYS
            .iter()
            .copied()
            .filter(|key| std::env::var_os(key).is_some())
            .collect();
        if !overridden.is_empty() {
            out.info(&format!("Environment overrides: {}", overridden.join(", ")));
        }
        return Ok(());
    }

    for error in &validation.errors {
        out.error(error);
    }
    Err(PipelineError::InvalidConfig(validation.errors))
}
