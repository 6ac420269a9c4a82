//! Built-in phase boundary contracts
//!
//! One constructor per phase output. Enum lists carry every spelling the
//! typed records accept on deserialization.

use super::{Cardinality, Contract, FieldRule, FieldType, Shape};
use crate::constants::pipeline::{CATEGORY_COUNT, CHAPTER_COUNT};
use crate::types::{CategoryCode, ChapterCode, Phase, Status};

fn category_codes() -> Vec<String> {
    CategoryCode::ALL.iter().map(|c| c.as_str().to_string()).collect()
}

fn chapter_codes() -> Vec<String> {
    ChapterCode::ALL.iter().map(|c| c.as_str().to_string()).collect()
}

fn statuses() -> Vec<String> {
    Status::ALL
        .iter()
        .flat_map(|s| [s.as_str().to_string(), s.as_str().to_lowercase()])
        .collect()
}

fn priorities() -> Vec<String> {
    ["high", "medium", "low"]
        .iter()
        .flat_map(|p| {
            let mut title = p.to_string();
            title[..1].make_ascii_uppercase();
            [p.to_string(), title, p.to_uppercase()]
        })
        .collect()
}

fn score(name: &str) -> FieldRule {
    FieldRule::number(name).range(0.0, 100.0)
}

fn string_list(name: &str) -> FieldRule {
    FieldRule::array(name).of(FieldType::String)
}

fn recommendation_shape() -> Shape {
    Shape::new()
        .field(FieldRule::string("title").non_empty())
        .field(FieldRule::string("category").one_of(category_codes()))
        .field(FieldRule::string("priority").one_of(priorities()))
        .field(FieldRule::string("timeframe").optional())
        .field(FieldRule::string("estimatedImpact").optional())
}

/// Shape of one CategoryAnalysis record
pub fn category_analysis_shape() -> Shape {
    Shape::new()
        .field(FieldRule::string("code").one_of(category_codes()))
        .field(FieldRule::string("name").non_empty())
        .field(score("score"))
        .field(FieldRule::string("status").one_of(statuses()))
        .field(string_list("strengths"))
        .field(string_list("weaknesses"))
        .field(string_list("quickWins"))
        .field(string_list("risks"))
        .field(FieldRule::string("executiveSummary"))
        .field(
            FieldRule::array("recommendations")
                .items(recommendation_shape())
                .optional(),
        )
}

fn chapter_summary_shape() -> Shape {
    Shape::new()
        .field(FieldRule::string("code").one_of(chapter_codes()))
        .field(FieldRule::string("name").non_empty())
        .field(score("score"))
        .field(FieldRule::string("status").one_of(statuses()))
        .field(
            FieldRule::array("categories")
                .items_one_of(category_codes())
                .optional(),
        )
}

/// Phase 0 intake scores
pub fn phase0_output() -> Contract {
    Contract::new(
        "phase0_output",
        Phase::Intake,
        Shape::new()
            .field(FieldRule::string("submissionId").non_empty())
            .field(score("overallHealthScore"))
            .field(FieldRule::object(
                "chapterScores",
                ChapterCode::ALL
                    .iter()
                    .fold(Shape::new(), |shape, c| shape.field(score(c.as_str()))),
            ))
            .field(FieldRule::object(
                "categoryScores",
                CategoryCode::ALL
                    .iter()
                    .fold(Shape::new(), |shape, c| shape.field(score(c.as_str()))),
            )),
    )
}

/// Phase 1 first-pass analysis
pub fn phase1_output() -> Contract {
    Contract::new(
        "phase1_output",
        Phase::Analysis,
        Shape::new()
            .field(string_list("topStrengths"))
            .field(string_list("topWeaknesses"))
            .field(string_list("keyFindings").optional()),
    )
}

/// A single per-category analysis job result
pub fn category_analysis() -> Contract {
    Contract::new(
        "category_analysis",
        Phase::CategorySynthesis,
        category_analysis_shape(),
    )
}

/// Phase 1.5 category synthesis: exactly 12 categories, exactly 4 chapters
pub fn phase15_output() -> Contract {
    Contract::new(
        "phase15_output",
        Phase::CategorySynthesis,
        Shape::new()
            .field(FieldRule::string("submissionId").non_empty())
            .field(
                FieldRule::array("categoryAnalyses")
                    .cardinality(Cardinality::Exactly(CATEGORY_COUNT))
                    .items(category_analysis_shape())
                    .code_set("code", category_codes()),
            )
            .field(
                FieldRule::array("chapterSummaries")
                    .cardinality(Cardinality::Exactly(CHAPTER_COUNT))
                    .items(chapter_summary_shape())
                    .code_set("code", chapter_codes()),
            )
            .field(FieldRule::object(
                "overallSummary",
                Shape::new()
                    .field(score("healthScore"))
                    .field(FieldRule::string("status").one_of(statuses()))
                    .field(FieldRule::string("summary").optional()),
            )),
    )
}

/// Phase 2 cross-dimensional synthesis
pub fn phase2_output() -> Contract {
    Contract::new(
        "phase2_output",
        Phase::CrossDimensional,
        Shape::new()
            .field(string_list("crossFunctionalInsights").non_empty())
            .field(string_list("dependencies").optional()),
    )
}

/// Phase 3 executive synthesis
pub fn phase3_output() -> Contract {
    Contract::new(
        "phase3_output",
        Phase::Executive,
        Shape::new()
            .field(FieldRule::string("executiveSummary").non_empty())
            .field(string_list("keyFindings").non_empty()),
    )
}

/// Phase 4.5 bottom-line-up-front summary
pub fn bluf_output() -> Contract {
    Contract::new(
        "bluf_output",
        Phase::Bluf,
        Shape::new()
            .field(FieldRule::string("headline").non_empty())
            .field(FieldRule::string("bluf").non_empty())
            .field(
                string_list("keyMessages").cardinality(Cardinality::AtLeast(1)),
            ),
    )
}

/// Contract checked for the output of `phase`, if any
pub fn for_phase(phase: Phase) -> Option<Contract> {
    match phase {
        Phase::Intake => Some(phase0_output()),
        Phase::Analysis => Some(phase1_output()),
        Phase::CategorySynthesis => Some(phase15_output()),
        Phase::CrossDimensional => Some(phase2_output()),
        Phase::Executive => Some(phase3_output()),
        Phase::Assembly => None,
        Phase::Bluf => Some(bluf_output()),
    }
}
