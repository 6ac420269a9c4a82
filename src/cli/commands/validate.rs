//! Validate Command
//!
//! Checks one phase output file against the contract for that phase. An
//! assembled IDM (phase 4) goes through the report gate instead.
//!
//! Usage:
//!   bizhealth validate --phase phase1_5 category_synthesis.json

use serde_json::Value;
use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::read_json;
use crate::config::PhaseConfig;
use crate::contract::{ContractValidator, catalog};
use crate::gate::ValidationGate;
use crate::idm::IntegratedDataModel;
use crate::types::{Phase, PipelineError, Result};

pub fn run(config: &PhaseConfig, phase: Phase, file: &Path, format: &str) -> Result<()> {
    let document: Value = read_json(file)?;

    let Some(contract) = catalog::for_phase(phase) else {
        return validate_idm(config, phase, document, format);
    };

    let report = ContractValidator::new().validate(&document, &contract);
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let out = Output::new();
        out.header(&format!("Contract {} ({})", contract.name, file.display()));
        out.contract_report(&report);
    }

    if report.is_compatible {
        Ok(())
    } else {
        Err(PipelineError::pipeline(
            phase,
            format!("{} contract issue(s)", report.issues.len()),
        ))
    }
}

fn validate_idm(config: &PhaseConfig, phase: Phase, document: Value, format: &str) -> Result<()> {
    let idm: IntegratedDataModel = serde_json::from_value(document)?;
    let report = ValidationGate::new(&config.quality).validate_idm_for_report_generation(&idm);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let out = Output::new();
        out.header(&format!("Report gate for {}", idm.submission_id));
        out.gate_report(&report);
    }

    report.into_result(phase).map(|_| ())
}
