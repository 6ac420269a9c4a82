//! Phase output records
//!
//! Typed views of the JSON artifacts exchanged between phases. Field names
//! follow the camelCase wire format consumed by the report renderer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::category::{CategoryCode, ChapterCode, Priority, Status, Timeframe};

// =============================================================================
// Intake (Phase 0)
// =============================================================================

/// Company facts captured by the questionnaire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessOverview {
    pub company_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub years_in_business: Option<u32>,
    #[serde(default)]
    pub employee_count: u32,
}

/// Normalized questionnaire scores. Phase 0 is the score of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase0Output {
    pub submission_id: String,
    pub overall_health_score: f64,
    pub chapter_scores: BTreeMap<ChapterCode, f64>,
    pub category_scores: BTreeMap<CategoryCode, f64>,
}

// =============================================================================
// Analysis (Phase 1)
// =============================================================================

/// First-pass analysis fields the assembler relies on. Narrative text is
/// read from the raw document by the narrative extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase1Output {
    #[serde(default)]
    pub top_strengths: Vec<String>,
    #[serde(default)]
    pub top_weaknesses: Vec<String>,
    #[serde(default)]
    pub key_findings: Vec<String>,
}

// =============================================================================
// Category Synthesis (Phase 1.5)
// =============================================================================

/// Action item produced by category analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    pub category: CategoryCode,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub estimated_impact: String,
}

impl Recommendation {
    pub fn horizon(&self) -> Timeframe {
        Timeframe::from_hint(self.timeframe.as_deref())
    }
}

/// Per-category analysis record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAnalysis {
    pub code: CategoryCode,
    pub name: String,
    pub score: f64,
    pub status: Status,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub quick_wins: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub executive_summary: String,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

/// Chapter roll-up over a fixed category subset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
    pub code: ChapterCode,
    pub name: String,
    pub score: f64,
    pub status: Status,
    #[serde(default)]
    pub categories: Vec<CategoryCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallSummary {
    pub health_score: f64,
    pub status: Status,
    #[serde(default)]
    pub summary: String,
}

/// Complete phase 1.5 output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase15Output {
    pub submission_id: String,
    pub category_analyses: Vec<CategoryAnalysis>,
    pub chapter_summaries: Vec<ChapterSummary>,
    pub overall_summary: OverallSummary,
}

/// Input handed to cross-dimensional synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase2Input {
    pub submission_id: String,
    pub category_analyses: Vec<CategoryAnalysis>,
    pub chapter_summaries: Vec<ChapterSummary>,
    pub overall_score: f64,
}
