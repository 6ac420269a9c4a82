//! Configuration Loader (Figment-based)
//!
//! Resolution chain:
//! 1. Built-in defaults (Serialized)
//! 2. Optional TOML file
//! 3. Typed phase environment variables (PHASE15_*, PHASE_4_5_*, PIPELINE_*)
//! 4. Environment profile overlay (test / development / production)
//!
//! Malformed environment values fail the load with the variable name; they
//! never silently fall back to a default.

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use super::types::{Environment, PhaseConfig};
use crate::types::{PipelineError, Result, parse_category_list};

/// Environment variables recognized by the loader, applied in this order
pub const ENV_KEYS: &[&str] = &[
    "PHASE15_ENABLED",
    "PHASE15_MODEL",
    "PHASE15_MAX_BATCH_WAIT_MINUTES",
    "PHASE15_BATCH_POLLING_INTERVAL_MS",
    "PHASE15_RETRY_MAX_ATTEMPTS",
    "PHASE15_RETRY_BACKOFF_MS",
    "PHASE15_ENABLED_CATEGORIES",
    "PHASE15_CONCURRENCY",
    "PHASE_4_5_ENABLED",
    "PHASE_4_5_MODEL",
    "PHASE_4_5_MAX_TOKENS",
    "PHASE_4_5_CACHE_ENABLED",
    "PHASE_4_5_CONCURRENCY",
    "PIPELINE_MIN_CATEGORIES",
    "PIPELINE_MIN_NARRATIVE_WORDS",
    "PIPELINE_LOG_LEVEL",
];

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from defaults and the process environment
    pub fn load(environment: Environment) -> Result<PhaseConfig> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::load_from_vars(environment, &vars)
    }

    /// Load configuration from defaults and an explicit variable map
    pub fn load_from_vars(
        environment: Environment,
        vars: &HashMap<String, String>,
    ) -> Result<PhaseConfig> {
        let config = Self::base_figment()
            .extract()
            .map_err(|e| PipelineError::Config(format!("Configuration error: {}", e)))?;
        Self::finish(config, environment, vars)
    }

    /// Load configuration with a TOML file layered over the defaults
    pub fn load_with_file(environment: Environment, path: &Path) -> Result<PhaseConfig> {
        if !path.exists() {
            return Err(PipelineError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        debug!("Loading config from: {}", path.display());

        let config = Self::base_figment()
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| PipelineError::Config(format!("Configuration error: {}", e)))?;
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::finish(config, environment, &vars)
    }

    fn base_figment() -> Figment {
        Figment::new().merge(Serialized::defaults(PhaseConfig::default()))
    }

    fn finish(
        mut config: PhaseConfig,
        environment: Environment,
        vars: &HashMap<String, String>,
    ) -> Result<PhaseConfig> {
        Self::apply_env_overrides(&mut config, vars)?;
        config.apply_profile(environment);
        Ok(config)
    }

    /// Apply every recognized variable present in `vars`
    pub fn apply_env_overrides(
        config: &mut PhaseConfig,
        vars: &HashMap<String, String>,
    ) -> Result<()> {
        for key in ENV_KEYS {
            let Some(raw) = vars.get(*key) else {
                continue;
            };
            apply_override(config, key, raw.trim()).map_err(|e| {
                PipelineError::Config(format!("Invalid value for {}='{}': {}", key, raw, e))
            })?;
            debug!(key = %key, "Applied environment override");
        }
        Ok(())
    }
}

fn apply_override(
    config: &mut PhaseConfig,
    key: &str,
    value: &str,
) -> std::result::Result<(), String> {
    match key {
        "PHASE15_ENABLED" => config.phase15.batch.enabled = parse_bool(value)?,
        "PHASE15_MODEL" => config.phase15.batch.model = parse_non_empty(value)?,
        "PHASE15_MAX_BATCH_WAIT_MINUTES" => {
            config.phase15.batch.batch.max_wait_minutes = parse_number(value)?
        }
        "PHASE15_BATCH_POLLING_INTERVAL_MS" => {
            config.phase15.batch.batch.polling_interval_ms = parse_number(value)?
        }
        "PHASE15_RETRY_MAX_ATTEMPTS" => {
            config.phase15.batch.retry.max_attempts = parse_number(value)?
        }
        "PHASE15_RETRY_BACKOFF_MS" => config.phase15.batch.retry.backoff_ms = parse_number(value)?,
        "PHASE15_ENABLED_CATEGORIES" => {
            config.phase15.enabled_categories = parse_category_list(value)?
        }
        "PHASE15_CONCURRENCY" => config.phase15.batch.concurrency_limit = parse_number(value)?,
        "PHASE_4_5_ENABLED" => config.phase_4_5.enabled = parse_bool(value)?,
        "PHASE_4_5_MODEL" => config.phase_4_5.model = parse_non_empty(value)?,
        "PHASE_4_5_MAX_TOKENS" => config.phase_4_5.max_tokens = parse_number(value)?,
        "PHASE_4_5_CACHE_ENABLED" => config.phase_4_5.cache.enabled = parse_bool(value)?,
        "PHASE_4_5_CONCURRENCY" => config.phase_4_5.concurrency_limit = parse_number(value)?,
        "PIPELINE_MIN_CATEGORIES" => config.quality.min_categories = parse_number(value)?,
        "PIPELINE_MIN_NARRATIVE_WORDS" => {
            config.quality.min_narrative_words = parse_number(value)?
        }
        "PIPELINE_LOG_LEVEL" => config.log_level = parse_non_empty(value)?.to_lowercase(),
        _ => return Err(format!("unrecognized key {}", key)),
    }
    Ok(())
}

fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err("expected a boolean (true/false/1/0/yes/no)".to_string()),
    }
}

fn parse_number<T>(value: &str) -> std::result::Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| e.to_string())
}

fn parse_non_empty(value: &str) -> std::result::Result<String, String> {
    if value.is_empty() {
        Err("expected a non-empty string".to_string())
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CategoryCode;
    use tempfile::TempDir;

    fn env_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_from_vars(Environment::Production, &HashMap::new()).unwrap();
        assert!(config.phase15.batch.enabled);
        assert_eq!(config.phase15.enabled_categories.len(), 12);
        assert!(config.validate().valid);
    }

    #[test]
    fn test_typed_overrides() {
        let vars = env_map(&[
            ("PHASE15_ENABLED", "false"),
            ("PHASE15_MAX_BATCH_WAIT_MINUTES", "15"),
            ("PHASE15_RETRY_MAX_ATTEMPTS", "5"),
            ("PHASE15_ENABLED_CATEGORIES", "STR,SAL,fin"),
            ("PHASE_4_5_MODEL", "claude-opus-4"),
            ("PHASE_4_5_MAX_TOKENS", "4096"),
            ("PHASE_4_5_CACHE_ENABLED", "no"),
            ("PHASE_4_5_CONCURRENCY", "2"),
        ]);
        let config = ConfigLoader::load_from_vars(Environment::Production, &vars).unwrap();

        assert!(!config.phase15.batch.enabled);
        assert_eq!(config.phase15.batch.batch.max_wait_minutes, 15);
        assert_eq!(config.phase15.batch.retry.max_attempts, 5);
        assert_eq!(
            config.phase15.enabled_categories,
            vec![CategoryCode::Str, CategoryCode::Sal, CategoryCode::Fin]
        );
        assert_eq!(config.phase_4_5.model, "claude-opus-4");
        assert_eq!(config.phase_4_5.max_tokens, 4096);
        assert!(!config.phase_4_5.cache.enabled);
        assert_eq!(config.phase_4_5.concurrency_limit, 2);
    }

    #[test]
    fn test_malformed_value_fails() {
        let vars = env_map(&[("PHASE15_RETRY_MAX_ATTEMPTS", "three")]);
        let err = ConfigLoader::load_from_vars(Environment::Production, &vars).unwrap_err();
        assert!(err.to_string().contains("PHASE15_RETRY_MAX_ATTEMPTS"));

        let vars = env_map(&[("PHASE_4_5_CACHE_ENABLED", "maybe")]);
        assert!(ConfigLoader::load_from_vars(Environment::Production, &vars).is_err());

        let vars = env_map(&[("PHASE15_ENABLED_CATEGORIES", "STR,XYZ")]);
        assert!(ConfigLoader::load_from_vars(Environment::Production, &vars).is_err());
    }

    #[test]
    fn test_oversized_wait_rejected_by_validation() {
        let vars = env_map(&[("PHASE15_MAX_BATCH_WAIT_MINUTES", "307445734561825860")]);
        let config = ConfigLoader::load_from_vars(Environment::Production, &vars).unwrap();
        let validation = config.validate();
        assert!(!validation.valid);
        assert!(validation.errors[0].contains("phase15.batch.max_wait_minutes"));
    }

    #[test]
    fn test_profile_applied_after_env() {
        let vars = env_map(&[("PHASE15_RETRY_MAX_ATTEMPTS", "7")]);
        let config = ConfigLoader::load_from_vars(Environment::Test, &vars).unwrap();
        assert_eq!(config.phase15.batch.retry.max_attempts, 1);
        assert!(!config.phase15.batch.cache.enabled);
    }

    #[test]
    fn test_load_is_deterministic() {
        let vars = env_map(&[
            ("PHASE15_CONCURRENCY", "6"),
            ("PIPELINE_MIN_NARRATIVE_WORDS", "12000"),
        ]);
        let first = ConfigLoader::load_from_vars(Environment::Development, &vars).unwrap();
        let second = ConfigLoader::load_from_vars(Environment::Development, &vars).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_with_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bizhealth.toml");
        std::fs::write(
            &path,
            r#"
log_level = "warn"

[phase15]
concurrency_limit = 8

[phase15.retry]
max_attempts = 4

[quality]
min_categories = 11
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_with_file(Environment::Production, &path).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.phase15.batch.concurrency_limit, 8);
        assert_eq!(config.phase15.batch.retry.max_attempts, 4);
        assert_eq!(config.quality.min_categories, 11);
        // untouched sections keep their defaults
        assert_eq!(config.phase15.enabled_categories.len(), 12);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ConfigLoader::load_with_file(
            Environment::Production,
            Path::new("/nonexistent/bizhealth.toml"),
        );
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
