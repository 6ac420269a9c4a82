//! Configuration Types
//!
//! All configuration structures with defaults. A `PhaseConfig` is built once
//! at process start and shared read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::constants::{batch, cache, quality, retry, roadmap, timeout};
use crate::types::CategoryCode;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Environment profile applied at load time
    pub environment: Environment,

    /// Log level used when RUST_LOG is not set
    pub log_level: String,

    /// First-pass analysis, cross-dimensional and executive synthesis jobs
    pub synthesis: BatchPhaseConfig,

    /// Per-category analysis jobs
    pub phase15: Phase15Config,

    /// BLUF narrative generation jobs
    pub phase_4_5: BatchPhaseConfig,

    /// Quality gate thresholds
    pub quality: QualityThresholds,

    /// Roadmap and insight limits
    pub roadmap: RoadmapPolicy,

    /// Employee-count bands for the company size label, ascending
    pub size_bands: Vec<SizeBand>,

    /// Feature flags
    pub features: FeatureFlags,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            log_level: "info".to_string(),
            synthesis: BatchPhaseConfig::default(),
            phase15: Phase15Config::default(),
            phase_4_5: BatchPhaseConfig {
                max_tokens: 8192,
                ..BatchPhaseConfig::default()
            },
            quality: QualityThresholds::default(),
            roadmap: RoadmapPolicy::default(),
            size_bands: SizeBand::defaults(),
            features: FeatureFlags::default(),
        }
    }
}

impl PhaseConfig {
    /// Validate numeric bounds. Collects every violation instead of
    /// stopping at the first.
    pub fn validate(&self) -> ConfigValidation {
        let mut errors = Vec::new();

        self.synthesis.collect_errors("synthesis", &mut errors);
        self.phase15.batch.collect_errors("phase15", &mut errors);
        self.phase_4_5.collect_errors("phase_4_5", &mut errors);

        if self.phase15.enabled_categories.is_empty() {
            errors.push("phase15.enabled_categories must not be empty".to_string());
        }
        let mut seen = Vec::new();
        for code in &self.phase15.enabled_categories {
            if seen.contains(code) {
                errors.push(format!(
                    "phase15.enabled_categories lists {} more than once",
                    code
                ));
            }
            seen.push(*code);
        }

        if !(1..=crate::constants::pipeline::CATEGORY_COUNT).contains(&self.quality.min_categories)
        {
            errors.push(format!(
                "quality.min_categories must be between 1 and 12, got {}",
                self.quality.min_categories
            ));
        }
        if self.quality.weakness_threshold > self.quality.strength_threshold {
            errors.push(format!(
                "quality.weakness_threshold ({}) must not exceed quality.strength_threshold ({})",
                self.quality.weakness_threshold, self.quality.strength_threshold
            ));
        }
        if self.roadmap.bucket_capacity == 0 {
            errors.push("roadmap.bucket_capacity must be greater than 0".to_string());
        }

        if self.size_bands.is_empty() {
            errors.push("size_bands must contain at least one band".to_string());
        }
        for pair in self.size_bands.windows(2) {
            match (pair[0].max_employees, pair[1].max_employees) {
                (Some(a), Some(b)) if a >= b => errors.push(format!(
                    "size_bands must be ascending: {} followed by {}",
                    a, b
                )),
                (None, _) => {
                    errors.push("only the last size band may be open-ended".to_string())
                }
                _ => {}
            }
        }

        ConfigValidation {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Apply an environment profile overlay
    pub fn apply_profile(&mut self, environment: Environment) {
        self.environment = environment;
        match environment {
            Environment::Test => {
                for phase in [
                    &mut self.synthesis,
                    &mut self.phase15.batch,
                    &mut self.phase_4_5,
                ] {
                    phase.cache.enabled = false;
                    phase.retry.max_attempts = 1;
                }
                self.features.cost_tracking_alerts = false;
            }
            Environment::Development => {
                self.log_level = "debug".to_string();
                for phase in [
                    &mut self.synthesis,
                    &mut self.phase15.batch,
                    &mut self.phase_4_5,
                ] {
                    phase.batch.max_wait_minutes = phase
                        .batch
                        .max_wait_minutes
                        .max(batch::DEVELOPMENT_MAX_WAIT_MINUTES);
                }
            }
            Environment::Production => {
                self.features.cost_tracking_alerts = true;
            }
        }
    }

    /// Label for an employee count using the configured bands
    pub fn size_label(&self, employee_count: u32) -> &str {
        self.size_bands
            .iter()
            .find(|band| band.max_employees.is_none_or(|max| employee_count <= max))
            .or(self.size_bands.last())
            .map(|band| band.label.as_str())
            .unwrap_or("Unknown")
    }
}

/// Result of `PhaseConfig::validate`
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

// =============================================================================
// Environment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Test,
    Development,
    #[default]
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(format!(
                "Unknown environment: {}. Valid values: test, development, production",
                s
            )),
        }
    }
}

// =============================================================================
// Batch Phase Configuration
// =============================================================================

/// Settings for a phase that runs external batch analysis jobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchPhaseConfig {
    /// Whether the phase runs at all
    pub enabled: bool,
    /// Model requested from the analysis service
    pub model: String,
    /// Maximum output tokens per job
    pub max_tokens: u32,
    /// Maximum concurrent jobs within the phase
    pub concurrency_limit: usize,
    /// Estimated cost per job in USD (for cost alerts)
    pub estimated_cost_usd: f64,
    pub timeouts: TimeoutSettings,
    pub retry: RetryPolicy,
    pub batch: BatchSettings,
    pub cache: CachePolicy,
}

impl Default for BatchPhaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 16_000,
            concurrency_limit: batch::CONCURRENCY_LIMIT,
            estimated_cost_usd: 0.15,
            timeouts: TimeoutSettings::default(),
            retry: RetryPolicy::default(),
            batch: BatchSettings::default(),
            cache: CachePolicy::default(),
        }
    }
}

impl BatchPhaseConfig {
    fn collect_errors(&self, prefix: &str, errors: &mut Vec<String>) {
        if !(retry::MIN_ATTEMPTS..=retry::MAX_ATTEMPTS_CEILING).contains(&self.retry.max_attempts) {
            errors.push(format!(
                "{}.retry.max_attempts must be between {} and {}, got {}",
                prefix,
                retry::MIN_ATTEMPTS,
                retry::MAX_ATTEMPTS_CEILING,
                self.retry.max_attempts
            ));
        }
        if self.retry.backoff_multiplier < 1.0 || !self.retry.backoff_multiplier.is_finite() {
            errors.push(format!(
                "{}.retry.backoff_multiplier must be >= 1.0, got {}",
                prefix, self.retry.backoff_multiplier
            ));
        }
        if self.retry.backoff_ms == 0 {
            errors.push(format!("{}.retry.backoff_ms must be greater than 0", prefix));
        }
        for (name, value) in [
            ("backoff_ms", self.retry.backoff_ms),
            ("max_backoff_ms", self.retry.max_backoff_ms),
        ] {
            if value > retry::BACKOFF_CEILING_MS {
                errors.push(format!(
                    "{}.retry.{} must be at most {}, got {}",
                    prefix,
                    name,
                    retry::BACKOFF_CEILING_MS,
                    value
                ));
            }
        }
        if !(batch::MIN_POLLING_INTERVAL_MS..=batch::MAX_POLLING_INTERVAL_MS)
            .contains(&self.batch.polling_interval_ms)
        {
            errors.push(format!(
                "{}.batch.polling_interval_ms must be between {} and {}, got {}",
                prefix,
                batch::MIN_POLLING_INTERVAL_MS,
                batch::MAX_POLLING_INTERVAL_MS,
                self.batch.polling_interval_ms
            ));
        }
        if !(1..=batch::MAX_WAIT_MINUTES_CEILING).contains(&self.batch.max_wait_minutes) {
            errors.push(format!(
                "{}.batch.max_wait_minutes must be between 1 and {}, got {}",
                prefix,
                batch::MAX_WAIT_MINUTES_CEILING,
                self.batch.max_wait_minutes
            ));
        }
        if !(cache::MIN_TTL_HOURS..=cache::MAX_TTL_HOURS).contains(&self.cache.ttl_hours) {
            errors.push(format!(
                "{}.cache.ttl_hours must be between {} and {}, got {}",
                prefix,
                cache::MIN_TTL_HOURS,
                cache::MAX_TTL_HOURS,
                self.cache.ttl_hours
            ));
        }
        if !(1..=crate::constants::pipeline::CATEGORY_COUNT).contains(&self.concurrency_limit) {
            errors.push(format!(
                "{}.concurrency_limit must be between 1 and 12, got {}",
                prefix, self.concurrency_limit
            ));
        }
        for (name, value) in [
            ("generation_secs", self.timeouts.generation_secs),
            ("phase_total_secs", self.timeouts.phase_total_secs),
        ] {
            if !(1..=timeout::CEILING_SECS).contains(&value) {
                errors.push(format!(
                    "{}.timeouts.{} must be between 1 and {}, got {}",
                    prefix,
                    name,
                    timeout::CEILING_SECS,
                    value
                ));
            }
        }
        if self.model.trim().is_empty() {
            errors.push(format!("{}.model must not be empty", prefix));
        }
    }
}

/// Per-category phase settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Phase15Config {
    #[serde(flatten)]
    pub batch: BatchPhaseConfig,
    /// Categories submitted for analysis
    pub enabled_categories: Vec<CategoryCode>,
}

impl Default for Phase15Config {
    fn default() -> Self {
        Self {
            batch: BatchPhaseConfig::default(),
            enabled_categories: CategoryCode::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Single generation request (seconds)
    pub generation_secs: u64,
    /// Whole phase (seconds)
    pub phase_total_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            generation_secs: timeout::GENERATION_SECS,
            phase_total_secs: timeout::PHASE_TOTAL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum failed attempts before the job is marked failed
    pub max_attempts: u32,
    /// Base backoff delay (milliseconds)
    pub backoff_ms: u64,
    /// Exponential multiplier applied per consecutive failure
    pub backoff_multiplier: f32,
    /// Ceiling for a single backoff delay (milliseconds)
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: retry::MAX_ATTEMPTS,
            backoff_ms: retry::BACKOFF_MS,
            backoff_multiplier: retry::BACKOFF_MULTIPLIER,
            max_backoff_ms: retry::MAX_BACKOFF_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub polling_interval_ms: u64,
    pub max_wait_minutes: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            polling_interval_ms: batch::POLLING_INTERVAL_MS,
            max_wait_minutes: batch::MAX_WAIT_MINUTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    pub enabled: bool,
    pub ttl_hours: u64,
    pub max_entries: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: cache::TTL_HOURS,
            max_entries: cache::MAX_ENTRIES,
        }
    }
}

// =============================================================================
// Quality, Roadmap, Size Bands, Features
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Categories required before report generation
    pub min_categories: usize,
    /// Narrative words considered sufficient
    pub min_narrative_words: usize,
    pub min_findings: usize,
    pub min_recommendations: usize,
    pub strength_threshold: f64,
    pub weakness_threshold: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_categories: quality::MIN_CATEGORIES,
            min_narrative_words: quality::MIN_NARRATIVE_WORDS,
            min_findings: quality::MIN_FINDINGS,
            min_recommendations: quality::MIN_RECOMMENDATIONS,
            strength_threshold: quality::STRENGTH_THRESHOLD,
            weakness_threshold: quality::WEAKNESS_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadmapPolicy {
    pub bucket_capacity: usize,
    pub critical_actions_limit: usize,
    pub top_insights_limit: usize,
}

impl Default for RoadmapPolicy {
    fn default() -> Self {
        Self {
            bucket_capacity: roadmap::BUCKET_CAPACITY,
            critical_actions_limit: roadmap::CRITICAL_ACTIONS_LIMIT,
            top_insights_limit: roadmap::TOP_INSIGHTS_LIMIT,
        }
    }
}

/// Employee-count band; `None` marks the open-ended last band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeBand {
    pub max_employees: Option<u32>,
    pub label: String,
}

impl SizeBand {
    pub fn defaults() -> Vec<SizeBand> {
        vec![
            SizeBand {
                max_employees: Some(1),
                label: "Solopreneur".to_string(),
            },
            SizeBand {
                max_employees: Some(5),
                label: "Micro (2-5)".to_string(),
            },
            SizeBand {
                max_employees: Some(10),
                label: "Small (6-10)".to_string(),
            },
            SizeBand {
                max_employees: None,
                label: "Small-Medium (11-15)".to_string(),
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Warn when estimated batch spend crosses the per-submission budget
    pub cost_tracking_alerts: bool,
    /// Estimated spend per submission that triggers a cost alert (USD)
    pub cost_alert_threshold_usd: f64,
    /// Fail the run instead of warning when narrative content is insufficient
    pub block_on_insufficient_narrative: bool,
    /// Write the roadmap as its own artifact next to the IDM
    pub persist_roadmap_artifact: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            cost_tracking_alerts: false,
            cost_alert_threshold_usd: 5.0,
            block_on_insufficient_narrative: false,
            persist_roadmap_artifact: true,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let validation = PhaseConfig::default().validate();
        assert!(validation.valid, "{:?}", validation.errors);
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let mut config = PhaseConfig::default();
        config.phase15.batch.retry.max_attempts = 0;
        config.phase15.batch.batch.polling_interval_ms = 10;
        config.phase_4_5.cache.ttl_hours = 500;

        let validation = config.validate();
        assert!(!validation.valid);
        assert_eq!(validation.errors.len(), 3);
        assert!(validation.errors[0].contains("phase15.retry.max_attempts"));
        assert!(validation.errors[1].contains("phase15.batch.polling_interval_ms"));
        assert!(validation.errors[2].contains("phase_4_5.cache.ttl_hours"));
    }

    #[test]
    fn test_validate_upper_bounds() {
        let mut config = PhaseConfig::default();
        config.phase15.batch.batch.max_wait_minutes = u64::MAX / 60;
        config.synthesis.batch.polling_interval_ms = u64::MAX;
        config.phase_4_5.timeouts.phase_total_secs = 1_000_000;
        config.phase_4_5.retry.max_backoff_ms = u64::MAX;

        let validation = config.validate();
        assert!(!validation.valid);
        assert_eq!(validation.errors.len(), 4, "{:?}", validation.errors);
        assert!(validation.errors.iter().any(|e| e.contains("phase15.batch.max_wait_minutes")));
        assert!(validation.errors.iter().any(|e| e.contains("synthesis.batch.polling_interval_ms")));
        assert!(validation.errors.iter().any(|e| e.contains("phase_4_5.timeouts.phase_total_secs")));
        assert!(validation.errors.iter().any(|e| e.contains("phase_4_5.retry.max_backoff_ms")));

        config = PhaseConfig::default();
        config.phase15.batch.batch.max_wait_minutes = batch::MAX_WAIT_MINUTES_CEILING;
        assert!(config.validate().valid);
    }

    #[test]
    fn test_validate_duplicate_categories() {
        let mut config = PhaseConfig::default();
        config.phase15.enabled_categories = vec![CategoryCode::Str, CategoryCode::Str];
        let validation = config.validate();
        assert!(validation.errors.iter().any(|e| e.contains("STR more than once")));
    }

    #[test]
    fn test_profiles() {
        let mut test = PhaseConfig::default();
        test.apply_profile(Environment::Test);
        assert!(!test.phase15.batch.cache.enabled);
        assert_eq!(test.phase15.batch.retry.max_attempts, 1);

        let mut dev = PhaseConfig::default();
        dev.apply_profile(Environment::Development);
        assert_eq!(dev.log_level, "debug");
        assert_eq!(dev.phase15.batch.batch.max_wait_minutes, 120);

        let mut prod = PhaseConfig::default();
        prod.apply_profile(Environment::Production);
        assert!(prod.features.cost_tracking_alerts);
    }

    #[test]
    fn test_size_label() {
        let config = PhaseConfig::default();
        assert_eq!(config.size_label(0), "Solopreneur");
        assert_eq!(config.size_label(1), "Solopreneur");
        assert_eq!(config.size_label(5), "Micro (2-5)");
        assert_eq!(config.size_label(6), "Small (6-10)");
        assert_eq!(config.size_label(10), "Small (6-10)");
        assert_eq!(config.size_label(40), "Small-Medium (11-15)");
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }
}
