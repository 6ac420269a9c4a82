//! bizhealth - Phase Orchestration & Contract Validation Pipeline
//!
//! Turns one business questionnaire submission into a suite of AI-generated
//! diagnostic artifacts. Each phase consumes the validated output of the
//! previous one; nothing crosses a phase boundary without passing its
//! contract.
//!
//! ## Core Features
//!
//! - **Contracts**: declarative shapes checked exhaustively at every boundary
//! - **Batch Jobs**: submit/poll with exponential backoff and hard deadlines
//! - **Integrated Data Model**: canonical per-submission artifact with a
//!   30/60/90-day roadmap
//! - **Validation Gates**: pre-report checks that separate errors from warnings
//! - **Resume**: phases whose artifacts exist are loaded instead of re-run
//!
//! ## Quick Start
//!
//! ```ignore
//! use bizhealth::{ArtifactStore, ConfigLoader, Environment, PhaseOrchestrator, ReplayService};
//!
//! let config = Arc::new(ConfigLoader::load(Environment::Production)?);
//! let service = ReplayService::from_dir(Path::new("responses")).await?;
//! let store = Arc::new(ArtifactStore::new("artifacts"));
//! let outcome = PhaseOrchestrator::new(config, Arc::new(service), store)
//!     .run(&submission)
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`config`]: layered per-phase configuration
//! - [`contract`]: phase boundary contracts and the validator
//! - [`batch`]: analysis service boundary and the batch job controller
//! - [`narrative`]: narrative extraction from loosely shaped phase output
//! - [`idm`]: integrated data model assembly and roadmap generation
//! - [`gate`]: report validation gates
//! - [`pipeline`]: phase orchestration and artifact storage

pub mod batch;
pub mod cli;
pub mod config;
pub mod constants;
pub mod contract;
pub mod gate;
pub mod idm;
pub mod narrative;
pub mod pipeline;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{ConfigLoader, ConfigValidation, Environment, PhaseConfig};

// Error Types
pub use types::error::{ErrorCategory, PipelineError, Result, ServiceError};

// Domain Types
pub use types::{CategoryCode, ChapterCode, Phase, Priority, Status, SubmissionId};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use batch::{
    AnalysisRequest, AnalysisService, BatchJobController, JobRecord, JobState, PollStatus,
    ReplayService, SharedService,
};
pub use contract::{
    ContractIssue, ContractReport, ContractValidator, IssueKind, assert_phase15_contract_safe,
    map_phase15_to_phase2_input,
};
pub use gate::{GateReport, ReportContext, ValidationGate};
pub use idm::{IdmAssembler, IntegratedDataModel, Roadmap, RoadmapBuilder};
pub use narrative::{NarrativeContent, NarrativeExtractor};
pub use pipeline::{ArtifactStore, PhaseOrchestrator, PipelineOutcome, Submission};
