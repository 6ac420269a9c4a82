//! Run Command
//!
//! Runs the full pipeline for one submission against recorded analysis
//! responses.
//!
//! Usage:
//!   bizhealth run --submission <file> --responses <dir> [--artifacts <dir>]

use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::info;

use crate::batch::ReplayService;
use crate::cli::ui::Output;
use crate::cli::util::{ensure_valid, read_json};
use crate::config::PhaseConfig;
use crate::pipeline::{ArtifactStore, PhaseOrchestrator, PipelineOutcome, Submission};
use crate::types::Result;

/// Run options (consolidated parameters)
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Submission JSON (id, business overview, intake scores)
    pub submission: PathBuf,
    /// Directory of recorded phase responses
    pub responses: PathBuf,
    /// Artifact root
    pub artifacts: PathBuf,
    /// Output format: text, json
    pub format: String,
}

pub fn run(config: PhaseConfig, options: RunOptions) -> Result<()> {
    ensure_valid(&config)?;
    let submission: Submission = read_json(&options.submission)?;
    let config = Arc::new(config);

    let rt = Runtime::new()?;
    let outcome = rt.block_on(async {
        let service = ReplayService::from_dir(&options.responses).await?;
        info!(
            responses = service.len(),
            dir = %options.responses.display(),
            "Replay service loaded"
        );
        let store = Arc::new(ArtifactStore::new(&options.artifacts));
        PhaseOrchestrator::new(config, Arc::new(service), store)
            .run(&submission)
            .await
    })?;

    if options.format == "json" {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome, &options);
    }
    Ok(())
}

fn print_summary(outcome: &PipelineOutcome, options: &RunOptions) {
    let out = Output::new();
    let idm = &outcome.idm;

    out.header(&format!("Pipeline complete: {}", outcome.submission_id));
    out.field("Company", &idm.company_profile.name);
    out.field("Size", &idm.company_profile.size);
    if let Some(score) = idm.health_scores.overall {
        out.field("Overall health score", format!("{:.1}", score));
    }
    out.field("Categories", format!("{}/12", idm.category_data.len()));
    out.field(
        "Roadmap (30/60/90)",
        format!(
            "{}/{}/{}",
            idm.roadmap.thirty_day.len(),
            idm.roadmap.sixty_day.len(),
            idm.roadmap.ninety_day.len()
        ),
    );
    out.field("Jobs submitted", outcome.jobs_submitted);
    out.field("Estimated cost", format!("${:.2}", outcome.estimated_cost_usd));
    out.field("Artifacts", options.artifacts.join(outcome.submission_id.as_str()).display());

    if !outcome.resumed.is_empty() {
        let resumed: Vec<&str> = outcome.resumed.iter().map(|p| p.dir_name()).collect();
        out.info(&format!("Resumed from artifacts: {}", resumed.join(", ")));
    }
    for phase in &outcome.skipped {
        out.info(&format!("Skipped (disabled): {}", phase.name()));
    }
    if outcome.bluf.is_some() {
        out.success("BLUF generated");
    }

    if !outcome.warnings.is_empty() {
        out.section("Warnings");
        for warning in &outcome.warnings {
            out.warning(warning);
        }
    }
}
