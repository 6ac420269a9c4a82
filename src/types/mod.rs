pub mod category;
pub mod error;
pub mod phase;
pub mod records;
pub mod utils;

pub use category::{
    CategoryCode, ChapterCode, Priority, Status, Timeframe, parse_category_list,
};
pub use error::{ErrorCategory, ErrorClassifier, PipelineError, Result, ServiceError};
pub use phase::Phase;
pub use records::{
    BusinessOverview, CategoryAnalysis, ChapterSummary, OverallSummary, Phase0Output,
    Phase1Output, Phase15Output, Phase2Input, Recommendation,
};
pub use utils::{json_string_array, json_type_name, word_count};

// =============================================================================
// Domain Newtypes
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe wrapper for submission IDs
///
/// Submission IDs become directory names, so only a conservative character
/// set is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubmissionId(String);

impl SubmissionId {
    pub fn new(id: impl Into<String>) -> std::result::Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("Submission id must not be empty".to_string());
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            || trimmed.starts_with('.')
        {
            return Err(format!("Submission id '{}' contains unsafe characters", trimmed));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SubmissionId {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SubmissionId> for String {
    fn from(id: SubmissionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SubmissionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
