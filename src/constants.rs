//! Global Constants
//!
//! Centralized constants for configuration defaults and validation bounds.
//! All magic numbers should be defined here with documentation.

/// Pipeline-level constants
pub mod pipeline {
    /// Version stamped into every assembled IDM
    pub const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Number of canonical business-dimension categories
    pub const CATEGORY_COUNT: usize = 12;

    /// Number of canonical chapters
    pub const CHAPTER_COUNT: usize = 4;
}

/// Quality gate defaults
pub mod quality {
    /// Minimum categories present before report generation may proceed
    pub const MIN_CATEGORIES: usize = 10;

    /// Narrative word count considered sufficient for a full report
    pub const MIN_NARRATIVE_WORDS: usize = 15_000;

    /// Minimum findings required before BLUF generation
    pub const MIN_FINDINGS: usize = 3;

    /// Minimum recommendations required before BLUF generation
    pub const MIN_RECOMMENDATIONS: usize = 3;

    /// Category score at or above which the first strength is promoted
    pub const STRENGTH_THRESHOLD: f64 = 70.0;

    /// Category score below which the first weakness is promoted
    pub const WEAKNESS_THRESHOLD: f64 = 50.0;
}

/// Roadmap and insight consolidation defaults
pub mod roadmap {
    /// Maximum items per 30/60/90-day bucket
    pub const BUCKET_CAPACITY: usize = 5;

    /// Maximum critical actions in consolidated insights
    pub const CRITICAL_ACTIONS_LIMIT: usize = 5;

    /// Maximum combined top strengths/weaknesses
    pub const TOP_INSIGHTS_LIMIT: usize = 5;
}

/// Batch job defaults and bounds
pub mod batch {
    /// Default interval between status polls (milliseconds)
    pub const POLLING_INTERVAL_MS: u64 = 30_000;

    /// Accepted polling interval range (milliseconds)
    pub const MIN_POLLING_INTERVAL_MS: u64 = 1_000;
    pub const MAX_POLLING_INTERVAL_MS: u64 = 3_600_000;

    /// Default wall-clock ceiling for one batch job (minutes)
    pub const MAX_WAIT_MINUTES: u64 = 60;

    /// Batch wait ceiling applied by the development profile (minutes)
    pub const DEVELOPMENT_MAX_WAIT_MINUTES: u64 = 120;

    /// Highest accepted batch wait ceiling (minutes)
    pub const MAX_WAIT_MINUTES_CEILING: u64 = 1_440;

    /// Default concurrent batch jobs within one phase
    pub const CONCURRENCY_LIMIT: usize = 4;
}

/// Retry constants
pub mod retry {
    /// Default maximum failed attempts before a job is marked failed
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Accepted range for max attempts
    pub const MIN_ATTEMPTS: u32 = 1;
    pub const MAX_ATTEMPTS_CEILING: u32 = 10;

    /// Base delay for exponential backoff (milliseconds)
    pub const BACKOFF_MS: u64 = 1_000;

    /// Backoff multiplier
    pub const BACKOFF_MULTIPLIER: f32 = 2.0;

    /// Maximum delay between retries (milliseconds)
    pub const MAX_BACKOFF_MS: u64 = 60_000;

    /// Highest accepted backoff setting (milliseconds)
    pub const BACKOFF_CEILING_MS: u64 = 3_600_000;
}

/// Cache constants
pub mod cache {
    /// Default cache entry TTL (hours)
    pub const TTL_HOURS: u64 = 24;

    /// Accepted TTL range (hours)
    pub const MIN_TTL_HOURS: u64 = 1;
    pub const MAX_TTL_HOURS: u64 = 168;

    /// Default maximum cached entries
    pub const MAX_ENTRIES: usize = 100;
}

/// Phase timeout defaults
pub mod timeout {
    /// Single generation request (seconds)
    pub const GENERATION_SECS: u64 = 300;

    /// Whole phase including all batch jobs (seconds)
    pub const PHASE_TOTAL_SECS: u64 = 3_600;

    /// Highest accepted value for either timeout (seconds)
    pub const CEILING_SECS: u64 = 86_400;
}
