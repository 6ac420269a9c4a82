//! CLI Common Utilities
//!
//! Config resolution and input loading shared by command handlers.

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::config::{ConfigLoader, Environment, PhaseConfig};
use crate::types::{PipelineError, Result};

/// Artifact root used when `--artifacts` is not given
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Resolve configuration for `environment`, layering `config_path` when given.
/// Bounds are not checked here; see [`ensure_valid`].
pub fn resolve_config(environment: Environment, config_path: Option<&Path>) -> Result<PhaseConfig> {
    match config_path {
        Some(path) => ConfigLoader::load_with_file(environment, path),
        None => ConfigLoader::load(environment),
    }
}

/// Reject a configuration that violates any bound
pub fn ensure_valid(config: &PhaseConfig) -> Result<()> {
    let validation = config.validate();
    if validation.valid {
        Ok(())
    } else {
        Err(PipelineError::InvalidConfig(validation.errors))
    }
}

/// Read and decode a JSON input file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Storage(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| PipelineError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_valid() {
        let mut config = PhaseConfig::default();
        assert!(ensure_valid(&config).is_ok());

        config.roadmap.bucket_capacity = 0;
        match ensure_valid(&config) {
            Err(PipelineError::InvalidConfig(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_read_json_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();

        let err = read_json::<Value>(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
        assert!(read_json::<Value>(&temp_dir.path().join("absent.json")).is_err());
    }
}
