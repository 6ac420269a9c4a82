//! Unified Error Type System
//!
//! Centralized error types for the entire pipeline.
//! Provides error classification for batch retry decisions.
//!
//! ## Error Categories
//!
//! - **Transient**: Temporary service issues that may resolve (retry)
//! - **RateLimit**: Analysis service throttling (wait and retry)
//! - **Network**: Connectivity issues (retry with backoff)
//! - **Auth**: Authentication failures (fail fast)
//! - **BadRequest**: Malformed job request (fail fast)
//! - **Unavailable**: Service down or job unknown (fail fast)
//!
//! ## Design Principles
//!
//! - Single unified error type (PipelineError) for the library
//! - Low-level components return structured reports; only the orchestrator
//!   converts them into errors
//! - No panic/unwrap in library code

use std::time::Duration;
use thiserror::Error;

use crate::contract::ContractIssue;
use crate::types::Phase;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for analysis service failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Temporary server issues - retry with backoff
    Transient,
    /// Authentication failed - fail fast, don't retry
    Auth,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Service or job unavailable - don't retry
    Unavailable,
    /// Unknown error - treated as permanent
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Network => write!(f, "NETWORK"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Auth => write!(f, "AUTH"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if this category is retryable with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Network | Self::Transient)
    }
}

// =============================================================================
// Service Error
// =============================================================================

/// Analysis service error with category and retry hint
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceError {
    /// Error category for retry decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Suggested wait time before retry (if the service sent one)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Transient, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, message)
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Classifies raw service failure messages into categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from the analysis service
    pub fn classify(message: &str) -> ServiceError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
        {
            return ServiceError::new(ErrorCategory::RateLimit, message);
        }

        if lower.contains("auth")
            || lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
        {
            return ServiceError::new(ErrorCategory::Auth, message);
        }

        if lower.contains("network")
            || lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timed out")
        {
            return ServiceError::new(ErrorCategory::Network, message);
        }

        if lower.contains("502")
            || lower.contains("503")
            || lower.contains("overloaded")
            || lower.contains("temporar")
        {
            return ServiceError::new(ErrorCategory::Transient, message);
        }

        if lower.contains("404") || lower.contains("not found") || lower.contains("expired") {
            return ServiceError::new(ErrorCategory::Unavailable, message);
        }

        if lower.contains("400") || lower.contains("bad request") || lower.contains("invalid") {
            return ServiceError::new(ErrorCategory::BadRequest, message);
        }

        ServiceError::new(ErrorCategory::Unknown, message)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum PipelineError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid configuration:\n{}", .0.join("\n"))]
    InvalidConfig(Vec<String>),

    // -------------------------------------------------------------------------
    // Phase Boundary Errors
    // -------------------------------------------------------------------------
    /// Phase output does not satisfy the next phase's input contract
    #[error("Contract violation in {phase} output ({} issues):\n{}", .issues.len(), join_issues(.issues))]
    Contract {
        phase: Phase,
        issues: Vec<ContractIssue>,
    },

    /// Validation gate blocked progression
    #[error("Validation gate blocked {phase}:\n{}", .errors.join("\n"))]
    Gate { phase: Phase, errors: Vec<String> },

    // -------------------------------------------------------------------------
    // Batch Job Errors
    // -------------------------------------------------------------------------
    #[error("Batch job {job_id} failed after {attempts} attempts: {error}")]
    JobFailed {
        job_id: String,
        attempts: u32,
        error: ServiceError,
    },

    #[error("Batch job {job_id} timed out after {elapsed:?}")]
    Timeout { job_id: String, elapsed: Duration },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Pipeline error in {phase}: {message}")]
    Pipeline { phase: Phase, message: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

fn join_issues(issues: &[ContractIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl PipelineError {
    /// Create a pipeline error
    pub fn pipeline(phase: Phase, message: impl Into<String>) -> Self {
        Self::Pipeline {
            phase,
            message: message.into(),
        }
    }

    /// Phase the error originated in, when known
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Contract { phase, .. } | Self::Gate { phase, .. } | Self::Pipeline { phase, .. } => {
                Some(*phase)
            }
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::IssueKind;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::BadRequest.is_retryable());
        assert!(!ErrorCategory::Unknown.is_retryable());
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            ErrorClassifier::classify("Rate limit exceeded").category,
            ErrorCategory::RateLimit
        );
        assert_eq!(
            ErrorClassifier::classify("Connection reset by peer").category,
            ErrorCategory::Network
        );
        assert_eq!(
            ErrorClassifier::classify("Service overloaded, try later").category,
            ErrorCategory::Transient
        );
        assert_eq!(
            ErrorClassifier::classify("Invalid API key").category,
            ErrorCategory::Auth
        );
        assert_eq!(
            ErrorClassifier::classify("batch not found").category,
            ErrorCategory::Unavailable
        );
        assert_eq!(
            ErrorClassifier::classify("Something weird").category,
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::transient("upstream hiccup");
        assert_eq!(err.to_string(), "[TRANSIENT] upstream hiccup");
    }

    #[test]
    fn test_contract_error_lists_every_issue() {
        let err = PipelineError::Contract {
            phase: Phase::CategorySynthesis,
            issues: vec![
                ContractIssue::new(IssueKind::MissingField, "overallSummary", "object", "missing"),
                ContractIssue::new(IssueKind::MissingCategory, "categoryAnalyses", "CMP", "absent"),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("2 issues"));
        assert!(message.contains("overallSummary"));
        assert!(message.contains("categoryAnalyses"));
        assert_eq!(err.phase(), Some(Phase::CategorySynthesis));
    }
}
