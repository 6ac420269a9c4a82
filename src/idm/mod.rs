//! Integrated Data Model
//!
//! The canonical consolidated artifact for one submission. Built exactly once
//! by [`IdmAssembler`], persisted immediately and never mutated afterwards;
//! corrections mean regenerating the whole model.

mod assembler;
mod roadmap;

pub use assembler::{AssemblyInputs, IdmAssembler};
pub use roadmap::{Bucket, Roadmap, RoadmapBuilder, RoadmapItem};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::narrative::NarrativeContent;
use crate::types::{CategoryAnalysis, CategoryCode, ChapterCode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegratedDataModel {
    pub submission_id: String,
    pub company_profile: CompanyProfile,
    pub health_scores: HealthScores,
    pub insights: ConsolidatedInsights,
    /// Full analysis per category, in canonical code order
    pub category_data: BTreeMap<CategoryCode, CategoryAnalysis>,
    #[serde(default)]
    pub cross_functional: NarrativeContent,
    #[serde(default)]
    pub roadmap: Roadmap,
    pub metadata: IdmMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub name: String,
    #[serde(default)]
    pub industry: String,
    pub size: String,
    #[serde(default)]
    pub years_in_business: Option<u32>,
    #[serde(default)]
    pub employee_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScores {
    /// Absent only in hand-built or damaged models; the gate rejects it
    #[serde(default)]
    pub overall: Option<f64>,
    #[serde(default)]
    pub chapters: BTreeMap<ChapterCode, f64>,
    #[serde(default)]
    pub categories: BTreeMap<CategoryCode, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedInsights {
    pub executive_summary: String,
    pub top_strengths: Vec<String>,
    pub top_weaknesses: Vec<String>,
    pub critical_actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdmMetadata {
    pub processed_at: DateTime<Utc>,
    pub pipeline_version: String,
    #[serde(default)]
    pub narrative_words: usize,
    #[serde(default)]
    pub narrative_sufficient: bool,
}

impl IntegratedDataModel {
    /// Canonical category codes with no analysis in `category_data`
    pub fn missing_categories(&self) -> Vec<CategoryCode> {
        CategoryCode::ALL
            .into_iter()
            .filter(|code| !self.category_data.contains_key(code))
            .collect()
    }

    /// Recommendations across all categories
    pub fn recommendation_count(&self) -> usize {
        self.category_data
            .values()
            .map(|analysis| analysis.recommendations.len())
            .sum()
    }
}
