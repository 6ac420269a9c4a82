//! Phase orchestrator
//!
//! Sequences phases for one submission. Every AI phase output passes its
//! contract before it is persisted, and nothing downstream reads an
//! unpersisted output.

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::{ArtifactStore, PipelineOutcome, Submission};
use crate::batch::{AnalysisRequest, BatchJobController, JobRecord, SharedService};
use crate::config::{BatchPhaseConfig, PhaseConfig};
use crate::contract::{
    ContractValidator, assert_phase15_contract_safe, catalog, map_phase15_to_phase2_input,
};
use crate::gate::{GateReport, ReportContext, ValidationGate};
use crate::idm::{AssemblyInputs, IdmAssembler, IntegratedDataModel};
use crate::narrative::{NarrativeContent, NarrativeExtractor};
use crate::types::{
    CategoryAnalysis, CategoryCode, ChapterCode, ChapterSummary, OverallSummary, Phase,
    Phase0Output, Phase1Output, Phase15Output, PipelineError, Result, Status, SubmissionId,
    json_string_array,
};

const SUBMISSION_ARTIFACT: &str = "submission.json";
const ROADMAP_ARTIFACT: &str = "roadmap.json";

fn category_artifact(code: CategoryCode) -> String {
    format!("categories/{}.json", code)
}

/// Bookkeeping for a single run
#[derive(Debug, Default)]
struct RunLedger {
    warnings: Vec<String>,
    resumed: Vec<Phase>,
    skipped: Vec<Phase>,
    jobs_submitted: usize,
    estimated_cost_usd: f64,
}

impl RunLedger {
    /// Count jobs the service actually accepted; cached or rejected
    /// submissions cost nothing
    fn charge(&mut self, records: &[JobRecord], cost_per_job: f64) {
        let submitted = records.iter().filter(|r| r.job_id.is_some()).count();
        self.jobs_submitted += submitted;
        self.estimated_cost_usd += submitted as f64 * cost_per_job;
    }
}

pub struct PhaseOrchestrator {
    config: Arc<PhaseConfig>,
    store: Arc<ArtifactStore>,
    synthesis: BatchJobController,
    categories: BatchJobController,
    bluf: BatchJobController,
    validator: ContractValidator,
    extractor: NarrativeExtractor,
    gate: ValidationGate,
    assembler: IdmAssembler,
}

impl PhaseOrchestrator {
    pub fn new(config: Arc<PhaseConfig>, service: SharedService, store: Arc<ArtifactStore>) -> Self {
        Self {
            synthesis: BatchJobController::new(service.clone(), &config.synthesis),
            categories: BatchJobController::new(service.clone(), &config.phase15.batch),
            bluf: BatchJobController::new(service, &config.phase_4_5),
            validator: ContractValidator::new(),
            extractor: NarrativeExtractor::new(config.quality.min_narrative_words),
            gate: ValidationGate::new(&config.quality),
            assembler: IdmAssembler::new(config.clone()),
            store,
            config,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    fn settings(&self, phase: Phase) -> &BatchPhaseConfig {
        match phase {
            Phase::CategorySynthesis => &self.config.phase15.batch,
            Phase::Bluf => &self.config.phase_4_5,
            _ => &self.config.synthesis,
        }
    }

    fn controller(&self, phase: Phase) -> &BatchJobController {
        match phase {
            Phase::CategorySynthesis => &self.categories,
            Phase::Bluf => &self.bluf,
            _ => &self.synthesis,
        }
    }

    /// Run every phase for one submission
    #[instrument(skip(self, submission), fields(submission_id = %submission.submission_id))]
    pub async fn run(&self, submission: &Submission) -> Result<PipelineOutcome> {
        let id = &submission.submission_id;
        let guard = self.store.lock(id).await;
        let outcome = self.run_phases(submission).await;
        drop(guard);
        self.store.release(id);
        outcome
    }

    async fn run_phases(&self, submission: &Submission) -> Result<PipelineOutcome> {
        let start_time = Instant::now();
        let id = &submission.submission_id;
        let mut ledger = RunLedger::default();

        let completed = self.store.completed_phases(id).await;
        if completed.is_empty() {
            info!(service = self.synthesis.service_name(), "Pipeline: Starting");
        } else {
            info!(completed = ?completed, "Pipeline: Resuming from existing artifacts");
        }

        // ===== PHASE 0: Intake =====
        let phase0 = self.record_intake(submission, &mut ledger).await?;

        // ===== PHASE 1: Analysis =====
        let payload = json!({
            "submissionId": id.as_str(),
            "overview": serde_json::to_value(&submission.overview)?,
            "scores": serde_json::to_value(&phase0)?,
        });
        let phase1_doc = self
            .run_batch_phase(id, Phase::Analysis, payload, &mut ledger)
            .await?;
        let phase1 = phase1_record(phase1_doc.as_ref())?;

        // ===== PHASE 1.5: Category Synthesis =====
        let phase15 = self
            .run_category_synthesis(id, &phase0, &phase1, &mut ledger)
            .await?;

        // ===== PHASE 2: Cross-Dimensional Synthesis =====
        let phase2_input = map_phase15_to_phase2_input(&phase15);
        let phase2_doc = self
            .run_batch_phase(
                id,
                Phase::CrossDimensional,
                serde_json::to_value(&phase2_input)?,
                &mut ledger,
            )
            .await?;

        // ===== PHASE 3: Executive Synthesis =====
        let payload = json!({
            "submissionId": id.as_str(),
            "overallScore": phase15.overall_summary.health_score,
            "crossDimensional": phase2_doc.clone().unwrap_or(Value::Null),
        });
        let phase3_doc = self
            .run_batch_phase(id, Phase::Executive, payload, &mut ledger)
            .await?;

        let narrative =
            self.extractor
                .extract(phase1_doc.as_ref(), phase2_doc.as_ref(), phase3_doc.as_ref());
        self.check_narrative(&narrative, &mut ledger)?;

        // ===== PHASE 4: IDM Assembly =====
        let idm = self
            .assemble_idm(submission, &phase0, &phase1, &phase15, &narrative, &mut ledger)
            .await?;

        let report_warnings = self
            .gate
            .validate_idm_for_report_generation(&idm)
            .into_result(Phase::Assembly)?;
        ledger.warnings.extend(report_warnings);

        let findings = collect_findings(&phase1, phase3_doc.as_ref());
        let prerequisite_warnings = self
            .gate
            .validate_prerequisites(&ReportContext::from_idm(&idm, findings.clone()))
            .into_result(Phase::Bluf)?;
        ledger.warnings.extend(prerequisite_warnings);

        // ===== PHASE 4.5: BLUF =====
        let payload = json!({
            "submissionId": id.as_str(),
            "idm": serde_json::to_value(&idm)?,
            "findings": findings,
        });
        let bluf = self
            .run_batch_phase(id, Phase::Bluf, payload, &mut ledger)
            .await?;

        self.check_cost(&mut ledger);

        info!(
            duration_secs = start_time.elapsed().as_secs(),
            jobs_submitted = ledger.jobs_submitted,
            resumed = ledger.resumed.len(),
            warnings = ledger.warnings.len(),
            "Pipeline: Complete"
        );

        Ok(PipelineOutcome {
            submission_id: id.clone(),
            idm,
            bluf,
            warnings: ledger.warnings,
            resumed: ledger.resumed,
            skipped: ledger.skipped,
            jobs_submitted: ledger.jobs_submitted,
            estimated_cost_usd: ledger.estimated_cost_usd,
        })
    }

    /// Rebuild the IDM from persisted artifacts and evaluate the report gate.
    /// Nothing is written.
    #[instrument(skip(self))]
    pub async fn assemble_from_artifacts(
        &self,
        id: &SubmissionId,
    ) -> Result<(IntegratedDataModel, GateReport)> {
        let submission: Submission = self
            .store
            .load(id, Phase::Intake, SUBMISSION_ARTIFACT)
            .await?
            .ok_or_else(|| {
                PipelineError::Storage(format!("No intake recorded for submission {}", id))
            })?;

        let phase15_doc: Value = self
            .store
            .load(id, Phase::CategorySynthesis, Phase::CategorySynthesis.artifact_name())
            .await?
            .ok_or_else(|| {
                PipelineError::Storage(format!(
                    "No category synthesis recorded for submission {}",
                    id
                ))
            })?;
        let phase15 = assert_phase15_contract_safe(&phase15_doc)?;

        let phase1_doc = self.load_document(id, Phase::Analysis).await?;
        let phase2_doc = self.load_document(id, Phase::CrossDimensional).await?;
        let phase3_doc = self.load_document(id, Phase::Executive).await?;
        let phase1 = phase1_record(phase1_doc.as_ref())?;

        let narrative =
            self.extractor
                .extract(phase1_doc.as_ref(), phase2_doc.as_ref(), phase3_doc.as_ref());
        let idm = self.assembler.assemble(AssemblyInputs {
            phase0: &submission.phase0,
            phase1: &phase1,
            phase15: &phase15,
            overview: &submission.overview,
            narrative: Some(&narrative),
        });
        let report = self.gate.validate_idm_for_report_generation(&idm);
        Ok((idm, report))
    }

    async fn load_document(&self, id: &SubmissionId, phase: Phase) -> Result<Option<Value>> {
        self.store.load(id, phase, phase.artifact_name()).await
    }

    /// Validate and persist intake scores. An existing intake stays the
    /// score of record.
    async fn record_intake(
        &self,
        submission: &Submission,
        ledger: &mut RunLedger,
    ) -> Result<Phase0Output> {
        let id = &submission.submission_id;
        let phase = Phase::Intake;

        if let Some(existing) = self
            .store
            .load::<Phase0Output>(id, phase, phase.artifact_name())
            .await?
        {
            info!("Phase 0: Skipped (resuming from artifact)");
            ledger.resumed.push(phase);
            return Ok(existing);
        }

        info!("Phase 0: Validating intake scores");
        if submission.phase0.submission_id != id.as_str() {
            return Err(PipelineError::pipeline(
                phase,
                format!(
                    "intake scores belong to submission '{}', not '{}'",
                    submission.phase0.submission_id, id
                ),
            ));
        }

        let value = serde_json::to_value(&submission.phase0)?;
        self.validator
            .assert_safe(&value, &catalog::phase0_output())?;
        self.store
            .write_once(id, phase, SUBMISSION_ARTIFACT, submission)
            .await?;
        self.store
            .write_once(id, phase, phase.artifact_name(), &value)
            .await?;
        Ok(submission.phase0.clone())
    }

    fn request(&self, id: &SubmissionId, phase: Phase, key: &str, payload: Value) -> AnalysisRequest {
        let settings = self.settings(phase);
        AnalysisRequest {
            key: format!("{}/{}", id, key),
            phase,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            payload,
        }
    }

    /// Run a phase's jobs under the phase-wide time limit
    async fn run_jobs(&self, phase: Phase, requests: Vec<AnalysisRequest>) -> Result<Vec<JobRecord>> {
        let limit = Duration::from_secs(self.settings(phase).timeouts.phase_total_secs);
        timeout(limit, self.controller(phase).run_all(requests))
            .await
            .map_err(|_| {
                PipelineError::pipeline(
                    phase,
                    format!("phase exceeded its {}s time limit", limit.as_secs()),
                )
            })
    }

    /// Run a single-job phase: resume, skip, or submit then validate and
    /// persist. `None` means the phase is disabled.
    async fn run_batch_phase(
        &self,
        id: &SubmissionId,
        phase: Phase,
        payload: Value,
        ledger: &mut RunLedger,
    ) -> Result<Option<Value>> {
        let contract = catalog::for_phase(phase);

        if let Some(existing) = self.load_document(id, phase).await? {
            info!("{}: Skipped (resuming from artifact)", phase.name());
            if let Some(contract) = &contract {
                self.validator.assert_safe(&existing, contract)?;
            }
            ledger.resumed.push(phase);
            return Ok(Some(existing));
        }

        let settings = self.settings(phase);
        if !settings.enabled {
            info!("{}: Skipped (disabled)", phase.name());
            ledger.skipped.push(phase);
            return Ok(None);
        }

        info!(model = %settings.model, "{}: Submitting batch job", phase.name());
        let request = self.request(id, phase, phase.dir_name(), payload);
        let mut records = self.run_jobs(phase, vec![request]).await?;
        ledger.charge(&records, settings.estimated_cost_usd);

        let record = records
            .pop()
            .ok_or_else(|| PipelineError::pipeline(phase, "batch job produced no record"))?;
        let output = record.into_output()?;
        if let Some(contract) = &contract {
            self.validator.assert_safe(&output, contract)?;
        }
        self.store
            .write_once(id, phase, phase.artifact_name(), &output)
            .await?;
        Ok(Some(output))
    }

    /// Per-category analyses (concurrent), chapter roll-up and overall
    /// summary. Completed categories are persisted one by one so a failed
    /// run only resubmits what is missing.
    async fn run_category_synthesis(
        &self,
        id: &SubmissionId,
        phase0: &Phase0Output,
        phase1: &Phase1Output,
        ledger: &mut RunLedger,
    ) -> Result<Phase15Output> {
        let phase = Phase::CategorySynthesis;

        if let Some(existing) = self.load_document(id, phase).await? {
            info!("{}: Skipped (resuming from artifact)", phase.name());
            ledger.resumed.push(phase);
            return assert_phase15_contract_safe(&existing);
        }

        let settings = &self.config.phase15;
        if !settings.batch.enabled {
            return Err(PipelineError::pipeline(
                phase,
                "category synthesis is disabled and no artifact exists",
            ));
        }

        let phase1_value = serde_json::to_value(phase1)?;
        let mut analyses = Vec::with_capacity(CategoryCode::ALL.len());
        let mut requests = Vec::new();

        for code in CategoryCode::ALL {
            if let Some(analysis) = self
                .store
                .load::<CategoryAnalysis>(id, phase, &category_artifact(code))
                .await?
            {
                debug!(category = %code, "Category analysis resumed");
                analyses.push(analysis);
            } else if settings.enabled_categories.contains(&code) {
                let payload = json!({
                    "submissionId": id.as_str(),
                    "category": code.as_str(),
                    "name": code.display_name(),
                    "score": phase0.category_scores.get(&code),
                    "analysis": phase1_value.clone(),
                });
                let key = format!("{}/{}", phase.dir_name(), code);
                requests.push(self.request(id, phase, &key, payload));
            } else {
                warn!(category = %code, "Category disabled with no prior analysis");
            }
        }

        info!(
            resumed = analyses.len(),
            submitting = requests.len(),
            concurrency = settings.batch.concurrency_limit,
            "{}: Running category analyses",
            phase.name()
        );
        let records = self.run_jobs(phase, requests).await?;
        ledger.charge(&records, settings.batch.estimated_cost_usd);

        let mut first_error = None;
        for record in records {
            let key = record.request_key.clone();
            match self.accept_category(id, record).await {
                Ok(analysis) => analyses.push(analysis),
                Err(error) => {
                    warn!(key = %key, error = %error, "Category analysis rejected");
                    first_error.get_or_insert(error);
                }
            }
        }
        if let Some(error) = first_error {
            return Err(error);
        }

        // jobs finish in completion order
        analyses.sort_by_key(|analysis| analysis.code);
        let value = serde_json::to_value(roll_up(id, phase0, analyses))?;
        let output = assert_phase15_contract_safe(&value)?;
        self.store
            .write_once(id, phase, phase.artifact_name(), &value)
            .await?;
        Ok(output)
    }

    async fn accept_category(&self, id: &SubmissionId, record: JobRecord) -> Result<CategoryAnalysis> {
        let output = record.into_output()?;
        self.validator
            .assert_safe(&output, &catalog::category_analysis())?;
        let analysis: CategoryAnalysis = serde_json::from_value(output.clone())?;
        self.store
            .write_once(
                id,
                Phase::CategorySynthesis,
                &category_artifact(analysis.code),
                &output,
            )
            .await?;
        Ok(analysis)
    }

    fn check_narrative(&self, narrative: &NarrativeContent, ledger: &mut RunLedger) -> Result<()> {
        if narrative.content_sufficient {
            return Ok(());
        }
        let message = format!(
            "Narrative content below threshold: {} words (minimum {})",
            narrative.total_words, self.config.quality.min_narrative_words
        );
        if self.config.features.block_on_insufficient_narrative {
            return Err(PipelineError::Gate {
                phase: Phase::Assembly,
                errors: vec![message],
            });
        }
        ledger.warnings.push(message);
        Ok(())
    }

    async fn assemble_idm(
        &self,
        submission: &Submission,
        phase0: &Phase0Output,
        phase1: &Phase1Output,
        phase15: &Phase15Output,
        narrative: &NarrativeContent,
        ledger: &mut RunLedger,
    ) -> Result<IntegratedDataModel> {
        let id = &submission.submission_id;
        let phase = Phase::Assembly;

        if let Some(idm) = self
            .store
            .load::<IntegratedDataModel>(id, phase, phase.artifact_name())
            .await?
        {
            info!("{}: Skipped (resuming from artifact)", phase.name());
            ledger.resumed.push(phase);
            if self.config.features.persist_roadmap_artifact
                && !self.store.exists(id, phase, ROADMAP_ARTIFACT).await
            {
                info!("{}: Restoring missing roadmap artifact", phase.name());
                self.store
                    .write_once(id, phase, ROADMAP_ARTIFACT, &idm.roadmap)
                    .await?;
            }
            return Ok(idm);
        }

        info!("{}: Assembling integrated data model", phase.name());
        let idm = self.assembler.assemble(AssemblyInputs {
            phase0,
            phase1,
            phase15,
            overview: &submission.overview,
            narrative: Some(narrative),
        });

        self.store
            .write_once(id, phase, phase.artifact_name(), &idm)
            .await?;
        if self.config.features.persist_roadmap_artifact {
            self.store
                .write_once(id, phase, ROADMAP_ARTIFACT, &idm.roadmap)
                .await?;
        }
        Ok(idm)
    }

    fn check_cost(&self, ledger: &mut RunLedger) {
        let features = &self.config.features;
        if !features.cost_tracking_alerts
            || ledger.estimated_cost_usd <= features.cost_alert_threshold_usd
        {
            return;
        }
        warn!(
            estimated_cost_usd = ledger.estimated_cost_usd,
            threshold_usd = features.cost_alert_threshold_usd,
            jobs = ledger.jobs_submitted,
            "Cost alert"
        );
        ledger.warnings.push(format!(
            "Estimated batch spend ${:.2} exceeds alert threshold ${:.2}",
            ledger.estimated_cost_usd, features.cost_alert_threshold_usd
        ));
    }
}

fn phase1_record(document: Option<&Value>) -> Result<Phase1Output> {
    match document {
        Some(doc) => Ok(serde_json::from_value(doc.clone())?),
        None => Ok(Phase1Output::default()),
    }
}

fn collect_findings(phase1: &Phase1Output, phase3: Option<&Value>) -> Vec<String> {
    let mut findings = phase1.key_findings.clone();
    if let Some(doc) = phase3 {
        findings.extend(json_string_array(doc, "keyFindings"));
    }
    findings
}

/// Chapter score is the mean of its present member categories; the overall
/// summary carries the intake score of record.
fn roll_up(id: &SubmissionId, phase0: &Phase0Output, analyses: Vec<CategoryAnalysis>) -> Phase15Output {
    let chapter_summaries = ChapterCode::ALL
        .into_iter()
        .filter_map(|chapter| {
            let members: Vec<&CategoryAnalysis> = analyses
                .iter()
                .filter(|analysis| analysis.code.chapter() == chapter)
                .collect();
            if members.is_empty() {
                return None;
            }
            let score = members.iter().map(|a| a.score).sum::<f64>() / members.len() as f64;
            Some(ChapterSummary {
                code: chapter,
                name: chapter.display_name().to_string(),
                score,
                status: Status::from_score(score),
                categories: members.iter().map(|a| a.code).collect(),
            })
        })
        .collect();

    let health_score = phase0.overall_health_score;
    Phase15Output {
        submission_id: id.to_string(),
        category_analyses: analyses,
        chapter_summaries,
        overall_summary: OverallSummary {
            health_score,
            status: Status::from_score(health_score),
            summary: String::new(),
        },
    }
}
