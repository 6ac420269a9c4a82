//! Batch Analysis Jobs
//!
//! Long-running analysis requests are submitted to an external service and
//! polled to completion.
//!
//! ## State Machine
//!
//! ```text
//! Submitted --> Polling --+--> Completed (raw output attached)
//!                         +--> Failed    (retries exhausted or permanent error)
//!                         +--> TimedOut  (max batch wait elapsed)
//! ```

mod cache;
mod controller;
mod replay;

pub use cache::ResponseCache;
pub use controller::BatchJobController;
pub use replay::ReplayService;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{Phase, PipelineError, Result, ServiceError};

// =============================================================================
// Service Boundary
// =============================================================================

/// One analysis request handed to the external service
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// Stable key, e.g. `sub-1/phase1_5/STR`
    pub key: String,
    pub phase: Phase,
    pub model: String,
    pub max_tokens: u32,
    pub payload: Value,
}

/// Poll response from the analysis service
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    Processing,
    Completed(Value),
    /// The job itself errored; never retried
    Failed(String),
}

/// Opaque asynchronous analysis service
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Service name for logging
    fn name(&self) -> &str;

    /// Submit a job, returning the service-side job id
    async fn submit(&self, request: &AnalysisRequest) -> std::result::Result<String, ServiceError>;

    /// Poll a previously submitted job
    async fn poll(&self, job_id: &str) -> std::result::Result<PollStatus, ServiceError>;
}

pub type SharedService = Arc<dyn AnalysisService>;

// =============================================================================
// Job Record
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::Polling => write!(f, "polling"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Everything known about one job. Owned by the controller run that
/// produced it.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub request_key: String,
    pub phase: Phase,
    pub job_id: Option<String>,
    pub state: JobState,
    /// Failed tries (submit or poll)
    pub attempts: u32,
    pub polls: u32,
    /// Sum of backoff delays slept
    pub total_backoff: Duration,
    pub elapsed: Duration,
    pub last_error: Option<ServiceError>,
    pub output: Option<Value>,
    /// Served from the response cache
    pub cached: bool,
}

impl JobRecord {
    fn new(request: &AnalysisRequest) -> Self {
        Self {
            request_key: request.key.clone(),
            phase: request.phase,
            job_id: None,
            state: JobState::Submitted,
            attempts: 0,
            polls: 0,
            total_backoff: Duration::ZERO,
            elapsed: Duration::ZERO,
            last_error: None,
            output: None,
            cached: false,
        }
    }

    /// Convert a terminal record into the job output or a pipeline error
    pub fn into_output(self) -> Result<Value> {
        let job_id = self.job_id.unwrap_or_else(|| self.request_key.clone());
        match self.state {
            JobState::Completed => self.output.ok_or_else(|| {
                PipelineError::pipeline(self.phase, format!("Job {} completed without output", job_id))
            }),
            JobState::TimedOut => Err(PipelineError::Timeout {
                job_id,
                elapsed: self.elapsed,
            }),
            JobState::Failed => Err(PipelineError::JobFailed {
                job_id,
                attempts: self.attempts,
                error: self
                    .last_error
                    .unwrap_or_else(|| ServiceError::transient("unknown failure")),
            }),
            state => Err(PipelineError::pipeline(
                self.phase,
                format!("Job {} is not terminal ({})", job_id, state),
            )),
        }
    }
}
