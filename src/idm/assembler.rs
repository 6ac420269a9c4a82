//! IDM assembly
//!
//! Pure transformation from validated upstream outputs to the integrated
//! model. Completeness is not re-checked here: the phase 1.5 contract has
//! already rejected incomplete category sets.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    CompanyProfile, ConsolidatedInsights, HealthScores, IdmMetadata, IntegratedDataModel,
    RoadmapBuilder,
};
use crate::config::PhaseConfig;
use crate::constants::pipeline::PIPELINE_VERSION;
use crate::narrative::NarrativeContent;
use crate::types::{
    BusinessOverview, CategoryAnalysis, CategoryCode, Phase0Output, Phase1Output, Phase15Output,
    Priority,
};

/// Borrowed upstream outputs consumed by one assembly
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInputs<'a> {
    pub phase0: &'a Phase0Output,
    pub phase1: &'a Phase1Output,
    pub phase15: &'a Phase15Output,
    pub overview: &'a BusinessOverview,
    pub narrative: Option<&'a NarrativeContent>,
}

pub struct IdmAssembler {
    config: Arc<PhaseConfig>,
}

impl IdmAssembler {
    pub fn new(config: Arc<PhaseConfig>) -> Self {
        Self { config }
    }

    pub fn assemble(&self, inputs: AssemblyInputs<'_>) -> IntegratedDataModel {
        self.assemble_at(inputs, Utc::now())
    }

    /// Assemble with an explicit processing timestamp
    pub fn assemble_at(
        &self,
        inputs: AssemblyInputs<'_>,
        processed_at: DateTime<Utc>,
    ) -> IntegratedDataModel {
        let AssemblyInputs {
            phase0,
            phase1,
            phase15,
            overview,
            narrative,
        } = inputs;

        // 1. index by code; arrival order is irrelevant from here on
        let category_data: BTreeMap<CategoryCode, CategoryAnalysis> = phase15
            .category_analyses
            .iter()
            .map(|analysis| (analysis.code, analysis.clone()))
            .collect();

        // 2. phase 0 is the score of record
        let health_scores = HealthScores {
            overall: Some(phase0.overall_health_score),
            chapters: phase0.chapter_scores.clone(),
            categories: phase0.category_scores.clone(),
        };

        // 3. strengths and weaknesses
        let (top_strengths, top_weaknesses) = self.top_insights(&category_data, phase1);

        // 4. roadmap
        let roadmap = RoadmapBuilder::new(self.config.roadmap.bucket_capacity).build(
            category_data
                .values()
                .flat_map(|analysis| analysis.recommendations.iter()),
        );

        // 5. critical actions
        let critical_actions = self.critical_actions(&category_data);

        // 6. company profile
        let company_profile = CompanyProfile {
            name: overview.company_name.trim().to_string(),
            industry: overview.industry.clone(),
            size: self.config.size_label(overview.employee_count).to_string(),
            years_in_business: overview.years_in_business,
            employee_count: overview.employee_count,
        };

        let cross_functional = narrative.cloned().unwrap_or_default();
        let executive_summary = executive_summary(phase15, &cross_functional);

        let idm = IntegratedDataModel {
            submission_id: phase15.submission_id.clone(),
            company_profile,
            health_scores,
            insights: ConsolidatedInsights {
                executive_summary,
                top_strengths,
                top_weaknesses,
                critical_actions,
            },
            category_data,
            metadata: IdmMetadata {
                processed_at,
                pipeline_version: PIPELINE_VERSION.to_string(),
                narrative_words: cross_functional.total_words,
                narrative_sufficient: cross_functional.content_sufficient,
            },
            cross_functional,
            roadmap,
        };

        info!(
            submission_id = %idm.submission_id,
            categories = idm.category_data.len(),
            roadmap_items = idm.roadmap.len(),
            critical_actions = idm.insights.critical_actions.len(),
            "IDM assembled"
        );
        idm
    }

    /// First strength of every strong category and first weakness of every
    /// weak one; phase 1's lists fill in when a side is empty. Both sides
    /// share one budget of `top_insights_limit`, handed out alternately
    /// starting with strengths, so a side with fewer candidates leaves its
    /// share to the other.
    fn top_insights(
        &self,
        categories: &BTreeMap<CategoryCode, CategoryAnalysis>,
        phase1: &Phase1Output,
    ) -> (Vec<String>, Vec<String>) {
        let quality = &self.config.quality;

        let mut strengths: Vec<String> = categories
            .values()
            .filter(|c| c.score >= quality.strength_threshold)
            .filter_map(|c| c.strengths.first().cloned())
            .collect();
        let mut weaknesses: Vec<String> = categories
            .values()
            .filter(|c| c.score < quality.weakness_threshold)
            .filter_map(|c| c.weaknesses.first().cloned())
            .collect();

        if strengths.is_empty() {
            debug!("No category qualified as a strength; using phase 1 list");
            strengths = phase1.top_strengths.clone();
        }
        if weaknesses.is_empty() {
            debug!("No category qualified as a weakness; using phase 1 list");
            weaknesses = phase1.top_weaknesses.clone();
        }

        let (strength_count, weakness_count) = split_budget(
            strengths.len(),
            weaknesses.len(),
            self.config.roadmap.top_insights_limit,
        );
        strengths.truncate(strength_count);
        weaknesses.truncate(weakness_count);
        (strengths, weaknesses)
    }

    fn critical_actions(&self, categories: &BTreeMap<CategoryCode, CategoryAnalysis>) -> Vec<String> {
        categories
            .values()
            .flat_map(|analysis| {
                analysis
                    .recommendations
                    .iter()
                    .filter(|rec| rec.priority == Priority::High)
                    .map(move |rec| format!("{}: {}", analysis.name, rec.title))
            })
            .take(self.config.roadmap.critical_actions_limit)
            .collect()
    }
}

fn split_budget(strengths: usize, weaknesses: usize, limit: usize) -> (usize, usize) {
    let (mut s, mut w) = (0, 0);
    while s + w < limit && (s < strengths || w < weaknesses) {
        if s < strengths && (s <= w || w == weaknesses) {
            s += 1;
        } else {
            w += 1;
        }
    }
    (s, w)
}

fn executive_summary(phase15: &Phase15Output, narrative: &NarrativeContent) -> String {
    let summary = phase15.overall_summary.summary.trim();
    if !summary.is_empty() {
        return summary.to_string();
    }
    narrative
        .phase3
        .as_deref()
        .and_then(|text| text.split("\n\n").next())
        .unwrap_or_default()
        .trim()
        .to_string()
}
