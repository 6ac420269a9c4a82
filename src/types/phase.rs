//! Pipeline phase identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase identifier in execution order
///
/// - 0: Intake - normalized questionnaire scores (score of record)
/// - 1: Analysis - first-pass AI analysis and narratives
/// - 1.5: CategorySynthesis - per-category analysis and chapter roll-up
/// - 2: CrossDimensional - cross-dimensional synthesis
/// - 3: Executive - executive synthesis
/// - 4: Assembly - Integrated Data Model
/// - 4.5: Bluf - bottom-line-up-front narratives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Intake,
    Analysis,
    CategorySynthesis,
    CrossDimensional,
    Executive,
    Assembly,
    Bluf,
}

impl Phase {
    /// All phases in execution order
    pub const ALL: [Phase; 7] = [
        Self::Intake,
        Self::Analysis,
        Self::CategorySynthesis,
        Self::CrossDimensional,
        Self::Executive,
        Self::Assembly,
        Self::Bluf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Intake => "Intake",
            Self::Analysis => "Analysis",
            Self::CategorySynthesis => "Category Synthesis",
            Self::CrossDimensional => "Cross-Dimensional Synthesis",
            Self::Executive => "Executive Synthesis",
            Self::Assembly => "IDM Assembly",
            Self::Bluf => "BLUF Generation",
        }
    }

    /// Artifact directory name under the submission root
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Intake => "phase0",
            Self::Analysis => "phase1",
            Self::CategorySynthesis => "phase1_5",
            Self::CrossDimensional => "phase2",
            Self::Executive => "phase3",
            Self::Assembly => "phase4",
            Self::Bluf => "phase4_5",
        }
    }

    /// Primary artifact file written when the phase completes
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Self::Intake => "intake.json",
            Self::Analysis => "analysis.json",
            Self::CategorySynthesis => "category_synthesis.json",
            Self::CrossDimensional => "cross_dimensional.json",
            Self::Executive => "executive.json",
            Self::Assembly => "idm.json",
            Self::Bluf => "bluf.json",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.dir_name() == name)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.dir_name())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '.'], "_").as_str() {
            "0" | "phase0" | "intake" => Ok(Self::Intake),
            "1" | "phase1" | "analysis" => Ok(Self::Analysis),
            "1_5" | "phase1_5" | "phase15" | "category_synthesis" => Ok(Self::CategorySynthesis),
            "2" | "phase2" | "cross_dimensional" => Ok(Self::CrossDimensional),
            "3" | "phase3" | "executive" => Ok(Self::Executive),
            "4" | "phase4" | "assembly" | "idm" => Ok(Self::Assembly),
            "4_5" | "phase4_5" | "phase_4_5" | "bluf" => Ok(Self::Bluf),
            _ => Err(format!(
                "Unknown phase '{}'. Valid values: phase0, phase1, phase1_5, phase2, phase3, phase4, phase4_5",
                s
            )),
        }
    }
}
