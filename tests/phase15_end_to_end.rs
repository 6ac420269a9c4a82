//! Phase 1.5 hand-off: contract check, typed decode, phase 2 input and IDM
//! assembly from one synthetic category synthesis document.

use std::sync::Arc;

use bizhealth::config::PhaseConfig;
use bizhealth::idm::AssemblyInputs;
use bizhealth::types::{BusinessOverview, Phase0Output, Phase1Output};
use bizhealth::{
    CategoryCode, ChapterCode, ContractValidator, IdmAssembler, IssueKind, PipelineError,
    ValidationGate, assert_phase15_contract_safe, contract::catalog, map_phase15_to_phase2_input,
};
use serde_json::{Value, json};

// deliberately not in canonical order
const SCORES: [(&str, f64); 12] = [
    ("STR", 85.0),
    ("SAL", 40.0),
    ("FIN", 48.0),
    ("MKT", 62.0),
    ("CXP", 71.0),
    ("OPS", 55.0),
    ("HRS", 66.0),
    ("LDG", 74.0),
    ("CMP", 80.0),
    ("TIN", 58.0),
    ("ITD", 45.0),
    ("RMS", 52.0),
];

fn status(score: f64) -> &'static str {
    bizhealth::Status::from_score(score).as_str()
}

fn category(code: &str, score: f64) -> Value {
    let parsed: CategoryCode = code.parse().unwrap();
    json!({
        "code": code,
        "name": parsed.display_name(),
        "score": score,
        "status": status(score),
        "strengths": [format!("{code} strength")],
        "weaknesses": [format!("{code} weakness")],
        "quickWins": [format!("{code} quick win")],
        "risks": [],
        "executiveSummary": format!("{code} in brief"),
        "recommendations": [
            {
                "title": format!("{code} urgent fix"),
                "category": code,
                "priority": if score < 50.0 { "high" } else { "medium" },
                "timeframe": "30-day",
                "estimatedImpact": "high"
            },
            {
                "title": format!("{code} later"),
                "category": code,
                "priority": "low",
                "estimatedImpact": "low"
            }
        ]
    })
}

fn chapter(code: ChapterCode, score: f64) -> Value {
    json!({
        "code": code.as_str(),
        "name": code.display_name(),
        "score": score,
        "status": status(score),
        "categories": code.members().iter().map(|c| c.as_str()).collect::<Vec<_>>(),
    })
}

fn phase15_document() -> Value {
    json!({
        "submissionId": "sub-e2e",
        "categoryAnalyses": SCORES.iter().map(|(code, score)| category(code, *score)).collect::<Vec<_>>(),
        "chapterSummaries": [
            chapter(ChapterCode::GrowthEngine, 64.5),
            chapter(ChapterCode::PerformanceHealth, 51.5),
            chapter(ChapterCode::PeopleLeadership, 70.0),
            chapter(ChapterCode::ResilienceSafeguards, 58.75),
        ],
        "overallSummary": {
            "healthScore": 61.3,
            "status": "Developing",
            "summary": "A stable business held back by sales and finance."
        }
    })
}

#[test]
fn test_phase15_scenario_is_contract_safe() {
    let document = phase15_document();
    let report = ContractValidator::new().validate(&document, &catalog::phase15_output());
    assert!(report.is_compatible, "{:#?}", report.issues);

    let output = assert_phase15_contract_safe(&document).expect("contract safe");
    assert_eq!(output.category_analyses.len(), 12);
    assert_eq!(output.chapter_summaries.len(), 4);
}

#[test]
fn test_phase2_input_preserves_categories_and_order() {
    let output = assert_phase15_contract_safe(&phase15_document()).unwrap();
    let input = map_phase15_to_phase2_input(&output);

    let codes: Vec<&str> = input
        .category_analyses
        .iter()
        .map(|analysis| analysis.code.as_str())
        .collect();
    let expected: Vec<&str> = SCORES.iter().map(|(code, _)| *code).collect();
    assert_eq!(codes, expected);
    assert_eq!(input.category_analyses, output.category_analyses);
    assert_eq!(input.overall_score, output.overall_summary.health_score);
    assert_eq!(input.overall_score, 61.3);
    assert_eq!(input.submission_id, "sub-e2e");
}

#[test]
fn test_dropping_a_category_names_it() {
    let mut document = phase15_document();
    let analyses = document["categoryAnalyses"].as_array_mut().unwrap();
    analyses.retain(|analysis| analysis["code"] != "ITD");

    match assert_phase15_contract_safe(&document) {
        Err(PipelineError::Contract { issues, .. }) => {
            let missing: Vec<_> = issues
                .iter()
                .filter(|issue| issue.kind == IssueKind::MissingCategory)
                .collect();
            assert_eq!(missing.len(), 1);
            assert_eq!(missing[0].expected_type, "ITD");
            assert!(issues.iter().any(|issue| issue.kind == IssueKind::Cardinality));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_assembled_idm_passes_report_gate() {
    let output = assert_phase15_contract_safe(&phase15_document()).unwrap();
    let config = Arc::new(PhaseConfig::default());

    let phase0 = Phase0Output {
        submission_id: "sub-e2e".to_string(),
        overall_health_score: 61.3,
        chapter_scores: ChapterCode::ALL.iter().map(|c| (*c, 60.0)).collect(),
        category_scores: SCORES
            .iter()
            .map(|(code, score)| (code.parse().unwrap(), *score))
            .collect(),
    };
    let overview = BusinessOverview {
        company_name: "Northwind".to_string(),
        industry: "Wholesale".to_string(),
        years_in_business: Some(12),
        employee_count: 14,
    };

    let idm = IdmAssembler::new(config.clone()).assemble(AssemblyInputs {
        phase0: &phase0,
        phase1: &Phase1Output::default(),
        phase15: &output,
        overview: &overview,
        narrative: None,
    });

    // category data is keyed in canonical order regardless of arrival order
    let keys: Vec<CategoryCode> = idm.category_data.keys().copied().collect();
    assert_eq!(keys, CategoryCode::ALL.to_vec());
    assert_eq!(idm.company_profile.size, "Small-Medium (11-15)");
    assert_eq!(
        idm.insights.executive_summary,
        "A stable business held back by sales and finance."
    );

    // SAL, FIN and ITD score below 50 and carry the only high-priority items
    assert_eq!(idm.roadmap.thirty_day.len(), 3);
    assert_eq!(idm.roadmap.sixty_day.len(), 5);
    assert_eq!(idm.roadmap.ninety_day.len(), 5);
    assert_eq!(
        idm.insights.critical_actions,
        vec![
            "Sales: SAL urgent fix",
            "Financials: FIN urgent fix",
            "IT, Data & Systems: ITD urgent fix",
        ]
    );

    let report = ValidationGate::new(&config.quality).validate_idm_for_report_generation(&idm);
    assert!(report.is_valid, "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}
