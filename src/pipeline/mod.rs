//! Phase Orchestration
//!
//! Runs one submission through every phase in order, persisting each
//! validated output before the next phase reads it.
//!
//! ## Phases
//!
//! ```text
//! phase0 intake ─► phase1 analysis ─► phase1_5 category synthesis
//!   ─► phase2 cross-dimensional ─► phase3 executive
//!   ─► phase4 IDM assembly ─► report gate ─► phase4_5 BLUF
//! ```
//!
//! ## Resume
//!
//! A phase whose artifact already exists is loaded instead of re-run, so an
//! interrupted run picks up at the first missing artifact.

mod orchestrator;
mod store;

pub use orchestrator::PhaseOrchestrator;
pub use store::{ArtifactStore, WriteOutcome};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::idm::IntegratedDataModel;
use crate::types::{BusinessOverview, Phase, Phase0Output, SubmissionId};

/// One questionnaire submission entering the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub submission_id: SubmissionId,
    pub overview: BusinessOverview,
    /// Normalized intake scores (score of record)
    pub phase0: Phase0Output,
}

/// Result of a completed pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub submission_id: SubmissionId,
    pub idm: IntegratedDataModel,
    /// Absent when BLUF generation is disabled
    pub bluf: Option<Value>,
    /// Non-blocking gate and quality findings
    pub warnings: Vec<String>,
    /// Phases loaded from existing artifacts
    pub resumed: Vec<Phase>,
    /// Phases skipped because they are disabled
    pub skipped: Vec<Phase>,
    pub jobs_submitted: usize,
    pub estimated_cost_usd: f64,
}

impl PipelineOutcome {
    pub fn is_resumed(&self, phase: Phase) -> bool {
        self.resumed.contains(&phase)
    }
}
