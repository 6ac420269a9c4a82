//! Narrative Extraction
//!
//! Phase outputs store their narrative under inconsistently named and
//! inconsistently cased keys. Every lookup goes through one ordered strategy
//! list so a renamed field is a one-line fix.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::{Phase, word_count};

/// Candidate field names per logical slot, in priority order
pub const NARRATIVE_FIELDS: &[&str] = &["content", "narrative", "analysis_text", "text"];

/// Wrapper objects some phase versions nest their narrative under
pub const WRAPPER_FIELDS: &[&str] = &["output", "result", "data"];

/// One accessor strategy: how to reach a candidate string in a phase document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    /// Top-level field, matched case-insensitively
    Field(&'static str),
    /// Field one level below a wrapper object
    Nested(&'static str, &'static str),
}

impl Accessor {
    fn apply<'a>(&self, document: &'a Value) -> Option<&'a str> {
        let object = document.as_object()?;
        let value = match *self {
            Self::Field(name) => get_ignore_case(object, name)?,
            Self::Nested(wrapper, name) => {
                get_ignore_case(get_ignore_case(object, wrapper)?.as_object()?, name)?
            }
        };
        value.as_str().map(str::trim).filter(|s| !s.is_empty())
    }
}

fn get_ignore_case<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    object.get(name).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

/// Default strategy order: every top-level candidate first, then every
/// wrapped candidate
pub fn default_strategies() -> Vec<Accessor> {
    let mut strategies: Vec<Accessor> = NARRATIVE_FIELDS.iter().copied().map(Accessor::Field).collect();
    for wrapper in WRAPPER_FIELDS {
        for field in NARRATIVE_FIELDS {
            strategies.push(Accessor::Nested(*wrapper, *field));
        }
    }
    strategies
}

/// Canonical narrative slots with word-count sufficiency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeContent {
    pub phase1: Option<String>,
    pub phase2: Option<String>,
    pub phase3: Option<String>,
    pub total_words: usize,
    pub content_sufficient: bool,
}

impl NarrativeContent {
    /// Slots that produced no narrative
    pub fn missing_slots(&self) -> Vec<Phase> {
        [
            (Phase::Analysis, &self.phase1),
            (Phase::CrossDimensional, &self.phase2),
            (Phase::Executive, &self.phase3),
        ]
        .into_iter()
        .filter(|(_, slot)| slot.is_none())
        .map(|(phase, _)| phase)
        .collect()
    }
}

pub struct NarrativeExtractor {
    strategies: Vec<Accessor>,
    min_words: usize,
}

impl NarrativeExtractor {
    pub fn new(min_words: usize) -> Self {
        Self {
            strategies: default_strategies(),
            min_words,
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<Accessor>) -> Self {
        self.strategies = strategies;
        self
    }

    /// First non-empty trimmed string any strategy reaches
    pub fn extract_slot(&self, document: &Value) -> Option<String> {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.apply(document))
            .map(str::to_string)
    }

    pub fn extract(
        &self,
        phase1: Option<&Value>,
        phase2: Option<&Value>,
        phase3: Option<&Value>,
    ) -> NarrativeContent {
        let phase1 = phase1.and_then(|doc| self.extract_slot(doc));
        let phase2 = phase2.and_then(|doc| self.extract_slot(doc));
        let phase3 = phase3.and_then(|doc| self.extract_slot(doc));

        let total_words: usize = [&phase1, &phase2, &phase3]
            .into_iter()
            .flatten()
            .map(|text| word_count(text))
            .sum();
        let content_sufficient = total_words >= self.min_words;

        let content = NarrativeContent {
            phase1,
            phase2,
            phase3,
            total_words,
            content_sufficient,
        };

        if content_sufficient {
            debug!(total_words, "Narrative content sufficient");
        } else {
            warn!(
                total_words,
                required = self.min_words,
                missing = ?content.missing_slots(),
                "Narrative content below threshold"
            );
        }
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_candidate_wins() {
        let extractor = NarrativeExtractor::new(10);
        let doc = json!({"narrative": "second", "content": "  first  "});
        assert_eq!(extractor.extract_slot(&doc).as_deref(), Some("first"));
    }

    #[test]
    fn test_empty_candidates_are_skipped() {
        let extractor = NarrativeExtractor::new(10);
        let doc = json!({"content": "   ", "narrative": 42, "analysis_text": "real text"});
        assert_eq!(extractor.extract_slot(&doc).as_deref(), Some("real text"));
    }

    #[test]
    fn test_case_insensitive_and_nested() {
        let extractor = NarrativeExtractor::new(10);
        assert_eq!(
            extractor.extract_slot(&json!({"Analysis_Text": "upper"})).as_deref(),
            Some("upper")
        );
        assert_eq!(
            extractor
                .extract_slot(&json!({"Result": {"TEXT": "wrapped"}}))
                .as_deref(),
            Some("wrapped")
        );
        assert_eq!(extractor.extract_slot(&json!({"summary": "no"})), None);
        assert_eq!(extractor.extract_slot(&json!("bare string")), None);
    }

    #[test]
    fn test_word_count_and_sufficiency() {
        let extractor = NarrativeExtractor::new(6);
        let p1 = json!({"content": "one two three"});
        let p2 = json!({"output": {"narrative": "four five"}});
        let p3 = json!({"text": "six"});

        let content = extractor.extract(Some(&p1), Some(&p2), Some(&p3));
        assert_eq!(content.total_words, 6);
        assert!(content.content_sufficient);
        assert!(content.missing_slots().is_empty());

        let content = extractor.extract(Some(&p1), None, Some(&json!({})));
        assert_eq!(content.total_words, 3);
        assert!(!content.content_sufficient);
        assert_eq!(
            content.missing_slots(),
            vec![Phase::CrossDimensional, Phase::Executive]
        );
    }

    #[test]
    fn test_custom_strategy_list() {
        let extractor =
            NarrativeExtractor::new(1).with_strategies(vec![Accessor::Field("summary")]);
        assert_eq!(
            extractor.extract_slot(&json!({"content": "x", "summary": "y"})).as_deref(),
            Some("y")
        );
    }
}
