//! Exhaustive contract validation
//!
//! Walks a [`Contract`] field by field against a loosely typed JSON document
//! and accumulates every violation it finds.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

use super::{Cardinality, CodeSet, Contract, ContractIssue, FieldRule, FieldType, IssueKind, Shape};
use crate::types::{PipelineError, Result, json_type_name};

/// Outcome of one validation run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractReport {
    pub contract: String,
    pub is_compatible: bool,
    pub issues: Vec<ContractIssue>,
}

impl ContractReport {
    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &ContractIssue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }
}

/// Stateless validator over declarative contracts
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractValidator;

impl ContractValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `output` against `contract`, collecting every issue
    pub fn validate(&self, output: &Value, contract: &Contract) -> ContractReport {
        let mut issues = Vec::new();

        match output.as_object() {
            Some(object) => validate_shape(object, &contract.root, "", &mut issues),
            None => issues.push(ContractIssue::new(
                IssueKind::TypeMismatch,
                "$",
                FieldType::Object.name(),
                json_type_name(output),
            )),
        }

        debug!(
            contract = %contract.name,
            issues = issues.len(),
            "Contract validated"
        );

        ContractReport {
            contract: contract.name.clone(),
            is_compatible: issues.is_empty(),
            issues,
        }
    }

    /// Validate and convert any issue into an aggregated contract error
    pub fn assert_safe(&self, output: &Value, contract: &Contract) -> Result<()> {
        let report = self.validate(output, contract);
        if report.is_compatible {
            Ok(())
        } else {
            Err(PipelineError::Contract {
                phase: contract.phase,
                issues: report.issues,
            })
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn validate_shape(
    object: &Map<String, Value>,
    shape: &Shape,
    prefix: &str,
    issues: &mut Vec<ContractIssue>,
) {
    for rule in &shape.fields {
        validate_field(object, rule, prefix, issues);
    }
}

fn validate_field(
    object: &Map<String, Value>,
    rule: &FieldRule,
    prefix: &str,
    issues: &mut Vec<ContractIssue>,
) {
    let path = join_path(prefix, &rule.name);
    let expected = rule.field_type.name();

    let value = match object.get(&rule.name) {
        None | Some(Value::Null) => {
            if rule.required {
                let actual = if object.contains_key(&rule.name) {
                    "null"
                } else {
                    "missing"
                };
                issues.push(ContractIssue::new(IssueKind::MissingField, path, expected, actual));
            }
            return;
        }
        Some(value) => value,
    };

    if !rule.field_type.matches(value) {
        issues.push(ContractIssue::new(
            IssueKind::TypeMismatch,
            path,
            expected,
            json_type_name(value),
        ));
        return;
    }

    match value {
        Value::String(s) => check_string(s, rule, &path, issues),
        Value::Number(n) => {
            if let (Some((min, max)), Some(n)) = (rule.range, n.as_f64())
                && !(min..=max).contains(&n)
            {
                issues.push(
                    ContractIssue::new(IssueKind::OutOfRange, path, expected, n.to_string())
                        .with_message(format!("value {} outside [{}, {}]", n, min, max)),
                );
            }
        }
        Value::Array(items) => check_array(items, rule, &path, issues),
        Value::Object(nested) => {
            if let Some(shape) = &rule.shape {
                validate_shape(nested, shape, &path, issues);
            }
        }
        _ => {}
    }
}

fn check_string(value: &str, rule: &FieldRule, path: &str, issues: &mut Vec<ContractIssue>) {
    if rule.non_empty && value.trim().is_empty() {
        issues.push(ContractIssue::new(IssueKind::EmptyValue, path, "string", "empty string"));
        return;
    }
    if let Some(allowed) = &rule.allowed {
        check_member(value, allowed, path, issues);
    }
}

fn check_member(value: &str, allowed: &[String], path: &str, issues: &mut Vec<ContractIssue>) {
    if !allowed.iter().any(|candidate| candidate == value) {
        issues.push(
            ContractIssue::new(IssueKind::EnumViolation, path, "enum", format!("\"{}\"", value))
                .with_message(format!(
                    "'{}' is not one of: {}",
                    value,
                    allowed.join(", ")
                )),
        );
    }
}

fn check_array(items: &[Value], rule: &FieldRule, path: &str, issues: &mut Vec<ContractIssue>) {
    match rule.cardinality {
        Some(cardinality) if !cardinality.allows(items.len()) => {
            issues.push(
                ContractIssue::new(
                    IssueKind::Cardinality,
                    path,
                    cardinality.to_string(),
                    format!("{} items", items.len()),
                )
                .with_message(format!(
                    "expected {}, found {}",
                    cardinality,
                    items.len()
                )),
            );
        }
        None if rule.non_empty && items.is_empty() => {
            issues.push(ContractIssue::new(
                IssueKind::EmptyValue,
                path,
                Cardinality::AtLeast(1).to_string(),
                "0 items",
            ));
        }
        _ => {}
    }

    for (index, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, index);
        if let Some(item_type) = rule.item_type
            && !item_type.matches(item)
        {
            issues.push(ContractIssue::new(
                IssueKind::TypeMismatch,
                item_path,
                item_type.name(),
                json_type_name(item),
            ));
            continue;
        }
        if let (Some(allowed), Value::String(value)) = (&rule.allowed, item) {
            check_member(value, allowed, &item_path, issues);
        }
        if let Some(shape) = &rule.item_shape {
            match item.as_object() {
                Some(object) => validate_shape(object, shape, &item_path, issues),
                None => issues.push(ContractIssue::new(
                    IssueKind::TypeMismatch,
                    item_path,
                    FieldType::Object.name(),
                    json_type_name(item),
                )),
            }
        }
    }

    if let Some(code_set) = &rule.code_set {
        check_code_set(items, code_set, path, issues);
    }
}

/// Every canonical code exactly once. Unknown codes are left to the item
/// shape's enum rule so they are not reported twice.
fn check_code_set(items: &[Value], code_set: &CodeSet, path: &str, issues: &mut Vec<ContractIssue>) {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();

    for (index, item) in items.iter().enumerate() {
        let Some(code) = item.get(&code_set.key).and_then(Value::as_str) else {
            continue;
        };
        if !code_set.canonical.iter().any(|c| c == code) {
            continue;
        }
        match first_seen.get(code) {
            Some(&first) => issues.push(
                ContractIssue::new(
                    IssueKind::DuplicateCategory,
                    format!("{}[{}].{}", path, index, code_set.key),
                    "unique code",
                    format!("\"{}\"", code),
                )
                .with_message(format!(
                    "code {} appears at indices {} and {}",
                    code, first, index
                )),
            ),
            None => {
                first_seen.insert(code, index);
            }
        }
    }

    for canonical in &code_set.canonical {
        if !first_seen.contains_key(canonical.as_str()) {
            issues.push(ContractIssue::new(
                IssueKind::MissingCategory,
                path,
                canonical.clone(),
                "absent",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn simple_contract() -> Contract {
        Contract::new(
            "simple",
            crate::types::Phase::Analysis,
            Shape::new()
                .field(FieldRule::string("name").non_empty())
                .field(FieldRule::number("score").range(0.0, 100.0))
                .field(FieldRule::string("status").one_of(["ok", "bad"]))
                .field(FieldRule::array("tags").of(FieldType::String).optional())
                .field(FieldRule::object(
                    "meta",
                    Shape::new().field(FieldRule::boolean("reviewed")),
                )),
        )
    }

    #[test]
    fn test_valid_document() {
        let doc = json!({
            "name": "Acme",
            "score": 42,
            "status": "ok",
            "tags": ["a", "b"],
            "meta": {"reviewed": true}
        });
        let report = ContractValidator::new().validate(&doc, &simple_contract());
        assert!(report.is_compatible, "{:?}", report.issues);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_collects_every_issue() {
        let doc = json!({
            "name": "  ",
            "score": 140,
            "status": "meh",
            "tags": ["a", 3],
            "meta": {}
        });
        let report = ContractValidator::new().validate(&doc, &simple_contract());
        assert!(!report.is_compatible);

        let kinds: Vec<_> = report.issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IssueKind::EmptyValue,
                IssueKind::OutOfRange,
                IssueKind::EnumViolation,
                IssueKind::TypeMismatch,
                IssueKind::MissingField,
            ]
        );
        assert_eq!(report.issues[3].path, "tags[1]");
        assert_eq!(report.issues[4].path, "meta.reviewed");
    }

    #[test]
    fn test_missing_and_null_fields() {
        let doc = json!({"name": null, "score": 1, "status": "ok", "meta": {"reviewed": false}});
        let report = ContractValidator::new().validate(&doc, &simple_contract());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::MissingField);
        assert_eq!(report.issues[0].actual_type, "null");
    }

    #[test]
    fn test_type_mismatch_reports_actual_type() {
        let doc = json!({"name": "x", "score": "high", "status": "ok", "meta": []});
        let report = ContractValidator::new().validate(&doc, &simple_contract());
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].expected_type, "number");
        assert_eq!(report.issues[0].actual_type, "string");
        assert_eq!(report.issues[1].actual_type, "array");
    }

    #[test]
    fn test_non_object_root() {
        let report = ContractValidator::new().validate(&json!([1, 2]), &simple_contract());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].path, "$");
    }

    #[test]
    fn test_code_set_missing_and_duplicate() {
        let contract = Contract::new(
            "codes",
            crate::types::Phase::Analysis,
            Shape::new().field(
                FieldRule::array("items")
                    .items(Shape::new().field(FieldRule::string("code").one_of(["A", "B", "C"])))
                    .code_set("code", ["A", "B", "C"]),
            ),
        );
        let doc = json!({"items": [{"code": "A"}, {"code": "B"}, {"code": "A"}]});
        let report = ContractValidator::new().validate(&doc, &contract);

        let duplicates: Vec<_> = report.issues_of(IssueKind::DuplicateCategory).collect();
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates[0].message.contains("indices 0 and 2"));
        assert_eq!(duplicates[0].path, "items[2].code");

        let missing: Vec<_> = report.issues_of(IssueKind::MissingCategory).collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].expected_type, "C");
    }

    #[test]
    fn test_assert_safe_aggregates() {
        let err = ContractValidator::new()
            .assert_safe(&json!({}), &simple_contract())
            .unwrap_err();
        match err {
            PipelineError::Contract { phase, issues } => {
                assert_eq!(phase, crate::types::Phase::Analysis);
                assert_eq!(issues.len(), 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
