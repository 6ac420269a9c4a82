//! Phase Boundary Contracts
//!
//! A contract is the declarative shape one phase's output must satisfy to be
//! legal input for the next phase: required fields, JSON types, numeric
//! ranges, enum membership, cardinalities and canonical code-set coverage.
//!
//! ## Design
//! - Contracts are static values built once per phase pair (see [`catalog`])
//! - The validator never stops at the first problem; it reports every issue
//!   so schema drift can be fixed in one pass
//! - `assert_safe` is the thin fail-fast wrapper for call sites that want it

pub mod catalog;
mod phase15;
mod validator;

pub use phase15::{assert_phase15_contract_safe, map_phase15_to_phase2_input};
pub use validator::{ContractReport, ContractValidator};

use serde::Serialize;
use std::fmt;

use crate::types::Phase;

// =============================================================================
// Issues
// =============================================================================

/// What kind of violation an issue records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingField,
    TypeMismatch,
    EmptyValue,
    EnumViolation,
    OutOfRange,
    Cardinality,
    MissingCategory,
    DuplicateCategory,
}

/// Exactly one contract violation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractIssue {
    pub kind: IssueKind,
    pub path: String,
    pub expected_type: String,
    pub actual_type: String,
    pub message: String,
}

impl ContractIssue {
    pub fn new(
        kind: IssueKind,
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let expected_type = expected.into();
        let actual_type = actual.into();
        let message = match kind {
            IssueKind::MissingField => "required field is missing".to_string(),
            IssueKind::TypeMismatch => "wrong type".to_string(),
            IssueKind::EmptyValue => "value must not be empty".to_string(),
            IssueKind::EnumViolation => "value is not an allowed member".to_string(),
            IssueKind::OutOfRange => "value is out of range".to_string(),
            IssueKind::Cardinality => "wrong number of items".to_string(),
            IssueKind::MissingCategory => format!("missing category {}", expected_type),
            IssueKind::DuplicateCategory => "duplicate code".to_string(),
        };
        Self {
            kind,
            path,
            expected_type,
            actual_type,
            message,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl fmt::Display for ContractIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (expected {}, got {})",
            self.path, self.message, self.expected_type, self.actual_type
        )
    }
}

// =============================================================================
// Contract Shape
// =============================================================================

/// JSON type a field must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    pub fn matches(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        matches!(
            (self, value),
            (Self::String, Value::String(_))
                | (Self::Number, Value::Number(_))
                | (Self::Boolean, Value::Bool(_))
                | (Self::Array, Value::Array(_))
                | (Self::Object, Value::Object(_))
        )
    }
}

/// Allowed item count for an array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
}

impl Cardinality {
    pub fn allows(&self, len: usize) -> bool {
        match *self {
            Self::Exactly(n) => len == n,
            Self::AtLeast(n) => len >= n,
            Self::AtMost(n) => len <= n,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "exactly {} items", n),
            Self::AtLeast(n) => write!(f, "at least {} items", n),
            Self::AtMost(n) => write!(f, "at most {} items", n),
        }
    }
}

/// Every canonical code must appear exactly once under `key` across the
/// items of an array
#[derive(Debug, Clone, PartialEq)]
pub struct CodeSet {
    pub key: String,
    pub canonical: Vec<String>,
}

/// Rule for one named field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub non_empty: bool,
    pub range: Option<(f64, f64)>,
    /// Allowed values for a string field, or for every item of a string array
    pub allowed: Option<Vec<String>>,
    pub cardinality: Option<Cardinality>,
    /// Scalar type every array item must have
    pub item_type: Option<FieldType>,
    /// Shape every array item (object) must satisfy
    pub item_shape: Option<Shape>,
    /// Shape of a nested object
    pub shape: Option<Shape>,
    pub code_set: Option<CodeSet>,
}

impl FieldRule {
    fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required: true,
            non_empty: false,
            range: None,
            allowed: None,
            cardinality: None,
            item_type: None,
            item_shape: None,
            shape: None,
            code_set: None,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn array(name: &str) -> Self {
        Self::new(name, FieldType::Array)
    }

    pub fn object(name: &str, shape: Shape) -> Self {
        let mut rule = Self::new(name, FieldType::Object);
        rule.shape = Some(shape);
        rule
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    /// Allowed values, matched exactly
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    pub fn of(mut self, item_type: FieldType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    /// String array whose every item must be one of `values`
    pub fn items_one_of<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.of(FieldType::String).one_of(values)
    }

    pub fn items(mut self, shape: Shape) -> Self {
        self.item_shape = Some(shape);
        self
    }

    pub fn code_set<I, S>(mut self, key: &str, canonical: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.code_set = Some(CodeSet {
            key: key.to_string(),
            canonical: canonical.into_iter().map(Into::into).collect(),
        });
        self
    }
}

/// Ordered set of field rules for one JSON object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pub fields: Vec<FieldRule>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }
}

/// Declared input contract for a phase boundary
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub name: String,
    /// Phase whose output is checked
    pub phase: Phase,
    pub root: Shape,
}

impl Contract {
    pub fn new(name: impl Into<String>, phase: Phase, root: Shape) -> Self {
        Self {
            name: name.into(),
            phase,
            root,
        }
    }
}
