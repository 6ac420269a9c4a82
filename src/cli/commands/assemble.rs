//! Assemble Command
//!
//! Rebuilds the integrated data model from persisted phase artifacts and runs
//! the report gate. Nothing is written.
//!
//! Usage:
//!   bizhealth assemble --submission-id <id> [--artifacts <dir>]

use std::path::Path;
use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::batch::ReplayService;
use crate::cli::ui::Output;
use crate::cli::util::ensure_valid;
use crate::config::PhaseConfig;
use crate::pipeline::{ArtifactStore, PhaseOrchestrator};
use crate::types::{Phase, PipelineError, Result, SubmissionId};

pub fn run(config: PhaseConfig, artifacts: &Path, submission_id: &str, format: &str) -> Result<()> {
    ensure_valid(&config)?;
    let id = SubmissionId::new(submission_id).map_err(PipelineError::Config)?;

    let store = Arc::new(ArtifactStore::new(artifacts));
    // assembly never calls the analysis service
    let orchestrator =
        PhaseOrchestrator::new(Arc::new(config), Arc::new(ReplayService::new()), store);

    let rt = Runtime::new()?;
    let (idm, report) = rt.block_on(orchestrator.assemble_from_artifacts(&id))?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&idm)?);
    } else {
        let out = Output::new();
        out.header(&format!("Integrated data model: {}", id));
        out.field("Company", &idm.company_profile.name);
        out.field("Categories", format!("{}/12", idm.category_data.len()));
        out.field("Recommendations", idm.recommendation_count());
        out.field("Roadmap items", idm.roadmap.len());
        out.field("Critical actions", idm.insights.critical_actions.len());
        out.field("Narrative words", idm.metadata.narrative_words);

        out.section("Report gate");
        out.gate_report(&report);
    }

    report.into_result(Phase::Assembly).map(|_| ())
}
