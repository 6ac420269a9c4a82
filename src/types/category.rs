//! Canonical business dimensions
//!
//! The twelve category codes, the four chapters that group them, and the
//! small closed enums (status, priority, timeframe) every phase shares.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Category Codes
// =============================================================================

/// One of the 12 canonical business-dimension codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryCode {
    Str,
    Sal,
    Mkt,
    Cxp,
    Ops,
    Fin,
    Hrs,
    Ldg,
    Tin,
    Itd,
    Rms,
    Cmp,
}

impl CategoryCode {
    /// All canonical codes in report order
    pub const ALL: [CategoryCode; 12] = [
        Self::Str,
        Self::Sal,
        Self::Mkt,
        Self::Cxp,
        Self::Ops,
        Self::Fin,
        Self::Hrs,
        Self::Ldg,
        Self::Tin,
        Self::Itd,
        Self::Rms,
        Self::Cmp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Str => "STR",
            Self::Sal => "SAL",
            Self::Mkt => "MKT",
            Self::Cxp => "CXP",
            Self::Ops => "OPS",
            Self::Fin => "FIN",
            Self::Hrs => "HRS",
            Self::Ldg => "LDG",
            Self::Tin => "TIN",
            Self::Itd => "ITD",
            Self::Rms => "RMS",
            Self::Cmp => "CMP",
        }
    }

    /// Human-readable dimension name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Str => "Strategy",
            Self::Sal => "Sales",
            Self::Mkt => "Marketing",
            Self::Cxp => "Customer Experience",
            Self::Ops => "Operations",
            Self::Fin => "Financials",
            Self::Hrs => "Human Resources",
            Self::Ldg => "Leadership & Governance",
            Self::Tin => "Technology & Innovation",
            Self::Itd => "IT, Data & Systems",
            Self::Rms => "Risk Management & Sustainability",
            Self::Cmp => "Compliance",
        }
    }

    /// Chapter this category rolls up into
    pub fn chapter(&self) -> ChapterCode {
        match self {
            Self::Str | Self::Sal | Self::Mkt | Self::Cxp => ChapterCode::GrowthEngine,
            Self::Ops | Self::Fin => ChapterCode::PerformanceHealth,
            Self::Hrs | Self::Ldg => ChapterCode::PeopleLeadership,
            Self::Tin | Self::Itd | Self::Rms | Self::Cmp => ChapterCode::ResilienceSafeguards,
        }
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                format!(
                    "Unknown category code '{}'. Valid values: {}",
                    trimmed,
                    Self::ALL.map(|c| c.as_str()).join(", ")
                )
            })
    }
}

/// Parse a comma-separated code list such as `"STR, SAL,FIN"`
pub fn parse_category_list(raw: &str) -> Result<Vec<CategoryCode>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(CategoryCode::from_str)
        .collect()
}

// =============================================================================
// Chapters
// =============================================================================

/// One of the 4 chapters grouping the categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChapterCode {
    #[serde(rename = "GE")]
    GrowthEngine,
    #[serde(rename = "PH")]
    PerformanceHealth,
    #[serde(rename = "PL")]
    PeopleLeadership,
    #[serde(rename = "RS")]
    ResilienceSafeguards,
}

impl ChapterCode {
    pub const ALL: [ChapterCode; 4] = [
        Self::GrowthEngine,
        Self::PerformanceHealth,
        Self::PeopleLeadership,
        Self::ResilienceSafeguards,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GrowthEngine => "GE",
            Self::PerformanceHealth => "PH",
            Self::PeopleLeadership => "PL",
            Self::ResilienceSafeguards => "RS",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GrowthEngine => "Growth Engine",
            Self::PerformanceHealth => "Performance & Health",
            Self::PeopleLeadership => "People & Leadership",
            Self::ResilienceSafeguards => "Resilience & Safeguards",
        }
    }

    /// Member categories in canonical order
    pub fn members(&self) -> Vec<CategoryCode> {
        CategoryCode::ALL
            .into_iter()
            .filter(|code| code.chapter() == *self)
            .collect()
    }
}

impl fmt::Display for ChapterCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Status
// =============================================================================

/// Qualitative health status, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    #[serde(alias = "critical")]
    Critical,
    #[serde(alias = "concerning")]
    Concerning,
    #[serde(alias = "developing")]
    Developing,
    #[serde(alias = "strong")]
    Strong,
    #[serde(alias = "excellent")]
    Excellent,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Self::Critical,
        Self::Concerning,
        Self::Developing,
        Self::Strong,
        Self::Excellent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::Concerning => "Concerning",
            Self::Developing => "Developing",
            Self::Strong => "Strong",
            Self::Excellent => "Excellent",
        }
    }

    /// Status band for a 0-100 score
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => Self::Excellent,
            s if s >= 65.0 => Self::Strong,
            s if s >= 50.0 => Self::Developing,
            s if s >= 35.0 => Self::Concerning,
            _ => Self::Critical,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Priority & Timeframe
// =============================================================================

/// Recommendation priority. Declaration order is the sort order: high first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[serde(alias = "High", alias = "HIGH")]
    High,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "Low", alias = "LOW")]
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Coarse timeframe hint attached to a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    ThirtyDay,
    SixtyDay,
    NinetyDay,
    Unspecified,
}

impl Timeframe {
    /// Interpret a free-text hint ("30-day", "60 days", "90d", ...)
    pub fn from_hint(hint: Option<&str>) -> Self {
        let Some(hint) = hint else {
            return Self::Unspecified;
        };
        let lower = hint.trim().to_lowercase();
        if lower.starts_with("30") || lower.contains("immediate") {
            Self::ThirtyDay
        } else if lower.starts_with("60") {
            Self::SixtyDay
        } else if lower.starts_with("90") {
            Self::NinetyDay
        } else {
            Self::Unspecified
        }
    }
}
