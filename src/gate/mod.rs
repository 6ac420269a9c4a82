//! Validation Gates
//!
//! Pure pre- and post-condition checks. Both gates return a [`GateReport`]
//! instead of failing, so the orchestrator can proceed on warnings and must
//! halt on errors.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::QualityThresholds;
use crate::constants::pipeline::{CATEGORY_COUNT, CHAPTER_COUNT};
use crate::idm::IntegratedDataModel;
use crate::types::{CategoryCode, Phase, PipelineError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl GateReport {
    fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Escalate errors into a gate failure for `phase`
    pub fn into_result(self, phase: Phase) -> Result<Vec<String>> {
        if self.is_valid {
            Ok(self.warnings)
        } else {
            Err(PipelineError::Gate {
                phase,
                errors: self.errors,
            })
        }
    }
}

/// Inputs to the report prerequisite check
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub findings: Vec<String>,
    pub recommendation_count: usize,
    /// Per-dimension data keyed by category code; missing codes are warned
    pub dimensions: Vec<(CategoryCode, Option<Value>)>,
}

impl ReportContext {
    /// Context for the report generator derived from an assembled model
    pub fn from_idm(idm: &IntegratedDataModel, findings: Vec<String>) -> Self {
        Self {
            findings,
            recommendation_count: idm.recommendation_count(),
            dimensions: CategoryCode::ALL
                .into_iter()
                .map(|code| {
                    let data = idm
                        .category_data
                        .get(&code)
                        .and_then(|analysis| serde_json::to_value(analysis).ok());
                    (code, data)
                })
                .collect(),
        }
    }
}

pub struct ValidationGate {
    thresholds: QualityThresholds,
}

impl ValidationGate {
    pub fn new(thresholds: &QualityThresholds) -> Self {
        Self {
            thresholds: thresholds.clone(),
        }
    }

    /// Hard checks before any report is rendered from the model
    pub fn validate_idm_for_report_generation(&self, idm: &IntegratedDataModel) -> GateReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        match idm.health_scores.overall {
            None => errors.push("Overall health score is missing".to_string()),
            Some(score) if !score.is_finite() || !(0.0..=100.0).contains(&score) => {
                errors.push(format!("Overall health score {} is outside 0-100", score))
            }
            Some(_) => {}
        }

        if idm.company_profile.name.trim().is_empty() {
            errors.push("Company name is missing".to_string());
        }

        let present = idm.category_data.len();
        let missing = idm.missing_categories();
        if present < self.thresholds.min_categories {
            errors.push(format!(
                "Insufficient category coverage: {}/{} categories present (minimum {})",
                present, CATEGORY_COUNT, self.thresholds.min_categories
            ));
        } else if !missing.is_empty() {
            warnings.push(format!(
                "{}/{} categories present; missing: {}",
                present,
                CATEGORY_COUNT,
                missing.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
            ));
        }

        if idm.health_scores.chapters.len() < CHAPTER_COUNT {
            warnings.push(format!(
                "Only {}/{} chapter scores present",
                idm.health_scores.chapters.len(),
                CHAPTER_COUNT
            ));
        }

        for (code, analysis) in &idm.category_data {
            if !analysis.score.is_finite() {
                warnings.push(format!("Category {} has a non-numeric score", code));
            }
            if !idm.health_scores.categories.contains_key(code) {
                warnings.push(format!("Category {} has no health score", code));
            }
        }

        debug!(
            errors = errors.len(),
            warnings = warnings.len(),
            "IDM report gate evaluated"
        );
        GateReport::from_parts(errors, warnings)
    }

    /// Minimum content before the report generator runs
    pub fn validate_prerequisites(&self, context: &ReportContext) -> GateReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if context.findings.len() < self.thresholds.min_findings {
            errors.push(format!(
                "Insufficient findings: {} (minimum {})",
                context.findings.len(),
                self.thresholds.min_findings
            ));
        }
        if context.recommendation_count < self.thresholds.min_recommendations {
            errors.push(format!(
                "Insufficient recommendations: {} (minimum {})",
                context.recommendation_count, self.thresholds.min_recommendations
            ));
        }

        let missing: Vec<&str> = context
            .dimensions
            .iter()
            .filter(|(_, data)| data.as_ref().is_none_or(Value::is_null))
            .map(|(code, _)| code.as_str())
            .collect();
        if !missing.is_empty() {
            warnings.push(format!("Missing dimension data: {}", missing.join(", ")));
        }

        GateReport::from_parts(errors, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idm::{CompanyProfile, ConsolidatedInsights, HealthScores, IdmMetadata, Roadmap};
    use crate::narrative::NarrativeContent;
    use crate::types::{CategoryAnalysis, ChapterCode, Priority, Recommendation, Status};
    use chrono::Utc;

    fn analysis(code: CategoryCode) -> CategoryAnalysis {
        CategoryAnalysis {
            code,
            name: code.display_name().to_string(),
            score: 62.0,
            status: Status::Developing,
            strengths: vec![],
            weaknesses: vec![],
            quick_wins: vec![],
            risks: vec![],
            executive_summary: String::new(),
            recommendations: vec![Recommendation {
                title: "Do it".to_string(),
                category: code,
                priority: Priority::Medium,
                timeframe: None,
                estimated_impact: String::new(),
            }],
        }
    }

    fn idm_with(count: usize) -> IntegratedDataModel {
        let codes = &CategoryCode::ALL[..count];
        IntegratedDataModel {
            submission_id: "sub-1".to_string(),
            company_profile: CompanyProfile {
                name: "Acme".to_string(),
                industry: String::new(),
                size: "Micro (2-5)".to_string(),
                years_in_business: None,
                employee_count: 3,
            },
            health_scores: HealthScores {
                overall: Some(62.0),
                chapters: ChapterCode::ALL.iter().map(|c| (*c, 60.0)).collect(),
                categories: codes.iter().map(|c| (*c, 62.0)).collect(),
            },
            insights: ConsolidatedInsights::default(),
            category_data: codes.iter().map(|c| (*c, analysis(*c))).collect(),
            cross_functional: NarrativeContent::default(),
            roadmap: Roadmap::default(),
            metadata: IdmMetadata {
                processed_at: Utc::now(),
                pipeline_version: "test".to_string(),
                narrative_words: 0,
                narrative_sufficient: false,
            },
        }
    }

    fn gate() -> ValidationGate {
        ValidationGate::new(&QualityThresholds::default())
    }

    #[test]
    fn test_nine_of_twelve_is_rejected() {
        let report = gate().validate_idm_for_report_generation(&idm_with(9));
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("9/12")), "{:?}", report.errors);
    }

    #[test]
    fn test_ten_of_twelve_passes_with_warning() {
        let report = gate().validate_idm_for_report_generation(&idm_with(10));
        assert!(report.is_valid, "{:?}", report.errors);
        let warning = report
            .warnings
            .iter()
            .find(|w| w.contains("missing"))
            .expect("missing-category warning");
        assert!(warning.contains("RMS"));
        assert!(warning.contains("CMP"));
    }

    #[test]
    fn test_complete_model_has_no_findings() {
        let report = gate().validate_idm_for_report_generation(&idm_with(12));
        assert!(report.is_valid);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_hard_errors() {
        let mut idm = idm_with(12);
        idm.health_scores.overall = None;
        idm.company_profile.name = " ".to_string();
        let report = gate().validate_idm_for_report_generation(&idm);
        assert_eq!(report.errors.len(), 2);

        idm.health_scores.overall = Some(130.0);
        idm.company_profile.name = "Acme".to_string();
        let report = gate().validate_idm_for_report_generation(&idm);
        assert!(report.errors[0].contains("outside 0-100"));
    }

    #[test]
    fn test_soft_warnings() {
        let mut idm = idm_with(12);
        idm.health_scores.chapters.remove(&ChapterCode::PeopleLeadership);
        idm.category_data.get_mut(&CategoryCode::Fin).unwrap().score = f64::NAN;
        let report = gate().validate_idm_for_report_generation(&idm);
        assert!(report.is_valid);
        assert!(report.warnings.iter().any(|w| w.contains("3/4 chapter")));
        assert!(report.warnings.iter().any(|w| w.contains("FIN has a non-numeric score")));
    }

    #[test]
    fn test_into_result() {
        let report = gate().validate_idm_for_report_generation(&idm_with(9));
        match report.into_result(Phase::Assembly) {
            Err(PipelineError::Gate { phase, errors }) => {
                assert_eq!(phase, Phase::Assembly);
                assert_eq!(errors.len(), 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_prerequisites() {
        let idm = idm_with(10);
        let context = ReportContext::from_idm(&idm, vec!["a".into(), "b".into(), "c".into()]);
        let report = gate().validate_prerequisites(&context);
        assert!(report.is_valid);
        assert_eq!(report.warnings, vec!["Missing dimension data: RMS, CMP"]);

        let context = ReportContext {
            findings: vec!["only one".into()],
            recommendation_count: 2,
            dimensions: vec![],
        };
        let report = gate().validate_prerequisites(&context);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 2);
    }
}
