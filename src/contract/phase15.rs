//! Phase 1.5 to phase 2 hand-off

use serde_json::Value;

use super::{ContractIssue, ContractValidator, IssueKind, catalog};
use crate::types::{Phase, Phase15Output, Phase2Input, PipelineError, Result};

/// Validate raw phase 1.5 output and decode it into the typed record.
///
/// Fails with every contract issue at once; decoding only happens once the
/// document is known to be structurally sound.
pub fn assert_phase15_contract_safe(output: &Value) -> Result<Phase15Output> {
    ContractValidator::new().assert_safe(output, &catalog::phase15_output())?;
    serde_json::from_value(output.clone()).map_err(|e| PipelineError::Contract {
        phase: Phase::CategorySynthesis,
        issues: vec![
            ContractIssue::new(IssueKind::TypeMismatch, "$", "Phase15Output", "undecodable")
                .with_message(e.to_string()),
        ],
    })
}

/// Build the cross-dimensional synthesis input. Category order is preserved
/// and the overall score is taken from the overall summary.
pub fn map_phase15_to_phase2_input(output: &Phase15Output) -> Phase2Input {
    Phase2Input {
        submission_id: output.submission_id.clone(),
        category_analyses: output.category_analyses.clone(),
        chapter_summaries: output.chapter_summaries.clone(),
        overall_score: output.overall_summary.health_score,
    }
}
