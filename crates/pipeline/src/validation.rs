//! Field-level validation rules and their evaluation.
//!
//! A command kind declares its rules with a [`RuleSet`]; the validation stage
//! evaluates them in declaration order and records every violation on the
//! command. Evaluation never stops at the first failure.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use milestone_core::{DomainError, PrincipalId, RecordId};

use crate::failure::Failure;

static URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://[a-z0-9](?:[a-z0-9.-]*[a-z0-9])?(?::\d{1,5})?(?:[/?#][^\s]*)?$")
        .expect("static URI pattern is valid")
});

/// Record lookups needed by `exists`/`unique` rules and the ownership stage.
///
/// This is the pipeline's view of the data store; implementations provide their
/// own concurrency safety.
pub trait RecordStore: Send + Sync {
    fn exists(&self, collection: &str, id: RecordId) -> Result<bool, DomainError>;

    /// Whether `value` is already used for `field` by a record other than `except`.
    fn is_taken(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        except: Option<RecordId>,
    ) -> Result<bool, DomainError>;

    /// Owner of a record, or `None` when the record does not exist.
    fn owner_of(&self, collection: &str, id: RecordId) -> Result<Option<PrincipalId>, DomainError>;
}

impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    fn exists(&self, collection: &str, id: RecordId) -> Result<bool, DomainError> {
        (**self).exists(collection, id)
    }

    fn is_taken(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        except: Option<RecordId>,
    ) -> Result<bool, DomainError> {
        (**self).is_taken(collection, field, value, except)
    }

    fn owner_of(&self, collection: &str, id: RecordId) -> Result<Option<PrincipalId>, DomainError> {
        (**self).owner_of(collection, id)
    }
}

/// Value of a command field as seen by the rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Absent,
    Text(String),
    Id(RecordId),
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::Text).unwrap_or(FieldValue::Absent)
    }
}

impl From<&Option<String>> for FieldValue {
    fn from(value: &Option<String>) -> Self {
        value.clone().into()
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<Option<RecordId>> for FieldValue {
    fn from(value: Option<RecordId>) -> Self {
        value.map(FieldValue::Id).unwrap_or(FieldValue::Absent)
    }
}

impl From<RecordId> for FieldValue {
    fn from(value: RecordId) -> Self {
        FieldValue::Id(value)
    }
}

/// A named field-level rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Value must be present and not blank.
    Presence,
    /// Character count within bounds (inclusive).
    Length { min: Option<usize>, max: Option<usize> },
    /// Value must match a pattern; `description` is shown to the caller.
    Format { pattern: Regex, description: &'static str },
    /// Value must be a well-formed http(s) URI.
    Uri,
    /// Referenced record must exist in `collection`.
    Exists { collection: &'static str },
    /// No other record in `collection` may use the same value for this field.
    Unique { collection: &'static str, except: Option<RecordId> },
    /// Media type must be one of `allowed` (`type/*` entries match any subtype).
    ContentType { allowed: &'static [&'static str] },
}

impl Rule {
    pub fn length(min: usize, max: usize) -> Self {
        Rule::Length { min: Some(min), max: Some(max) }
    }

    pub fn max_length(max: usize) -> Self {
        Rule::Length { min: None, max: Some(max) }
    }

    pub fn format(pattern: Regex, description: &'static str) -> Self {
        Rule::Format { pattern, description }
    }

    pub fn exists(collection: &'static str) -> Self {
        Rule::Exists { collection }
    }

    pub fn unique(collection: &'static str) -> Self {
        Rule::Unique { collection, except: None }
    }

    pub fn unique_except(collection: &'static str, except: Option<RecordId>) -> Self {
        Rule::Unique { collection, except }
    }

    pub fn content_type(allowed: &'static [&'static str]) -> Self {
        Rule::ContentType { allowed }
    }

    /// Stable rule name reported with violations.
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Presence => "presence",
            Rule::Length { .. } => "length",
            Rule::Format { .. } => "format",
            Rule::Uri => "uri",
            Rule::Exists { .. } => "exists",
            Rule::Unique { .. } => "unique",
            Rule::ContentType { .. } => "content_type",
        }
    }
}

/// A rule bound to one field value.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: &'static str,
    pub value: FieldValue,
    pub rule: Rule,
}

/// Ordered list of field rules declared by a command kind.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<FieldRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `rule` for `field`.
    pub fn check(mut self, field: &'static str, value: impl Into<FieldValue>, rule: Rule) -> Self {
        self.rules.push(FieldRule {
            field,
            value: value.into(),
            rule,
        });
        self
    }

    /// Append several rules for the same field, in order.
    pub fn field(
        mut self,
        field: &'static str,
        value: impl Into<FieldValue>,
        rules: impl IntoIterator<Item = Rule>,
    ) -> Self {
        let value = value.into();
        for rule in rules {
            self.rules.push(FieldRule {
                field,
                value: value.clone(),
                rule,
            });
        }
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldRule> {
        self.rules.iter()
    }

    /// Evaluate every rule in order, recording violations into `errors`.
    ///
    /// Only store failures and rules that cannot apply to their value abort
    /// evaluation.
    pub fn evaluate(&self, store: &dyn RecordStore, errors: &mut ValidationErrors) -> Result<(), Failure> {
        for rule in &self.rules {
            if let Some(message) = check(rule, store)? {
                errors.add(rule.field, rule.rule.name(), message);
            }
        }
        Ok(())
    }
}

/// One failed rule on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub message: String,
}

/// Per-field set of violations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<Violation>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, rule: &str, message: impl Into<String>) {
        self.fields.entry(field.to_string()).or_default().push(Violation {
            rule: rule.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total number of violations across all fields.
    pub fn len(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    pub fn get(&self, field: &str) -> &[Violation] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str, rule: &str) -> bool {
        self.get(field).iter().any(|v| v.rule == rule)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Violation)> {
        self.fields
            .iter()
            .flat_map(|(field, vs)| vs.iter().map(move |v| (field.as_str(), v)))
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (field, violation) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{field} {} ({})", violation.message, violation.rule)?;
        }
        Ok(())
    }
}

/// Returns the violation message, if the rule fails.
fn check(rule: &FieldRule, store: &dyn RecordStore) -> Result<Option<String>, Failure> {
    let value = &rule.value;

    if let Rule::Presence = rule.rule {
        let blank = match value {
            FieldValue::Absent => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Id(_) => false,
        };
        return Ok(blank.then(|| "can't be blank".to_string()));
    }

    // Absence is the presence rule's concern.
    if *value == FieldValue::Absent {
        return Ok(None);
    }

    let message = match (&rule.rule, value) {
        (Rule::Length { min, max }, FieldValue::Text(s)) => {
            let n = s.chars().count();
            match (min, max) {
                (Some(min), _) if n < *min => Some(format!("is too short (minimum is {min} characters)")),
                (_, Some(max)) if n > *max => Some(format!("is too long (maximum is {max} characters)")),
                _ => None,
            }
        }
        (Rule::Format { pattern, description }, FieldValue::Text(s)) => {
            (!pattern.is_match(s)).then(|| format!("must be {description}"))
        }
        (Rule::Uri, FieldValue::Text(s)) => (!URI.is_match(s.trim())).then(|| "is not a valid URI".to_string()),
        (Rule::Exists { collection }, FieldValue::Id(id)) => {
            (!store.exists(collection, *id)?).then(|| "does not exist".to_string())
        }
        (Rule::Unique { collection, except }, FieldValue::Text(s)) => store
            .is_taken(collection, rule.field, s, *except)?
            .then(|| "has already been taken".to_string()),
        (Rule::ContentType { allowed }, FieldValue::Text(s)) => {
            (!content_type_matches(s, allowed)).then(|| format!("must be one of: {}", allowed.join(", ")))
        }
        (mismatched, value) => {
            return Err(Failure::unclassified(format!(
                "rule {} cannot apply to {value:?} on field {}",
                mismatched.name(),
                rule.field,
            )));
        }
    };
    Ok(message)
}

fn content_type_matches(value: &str, allowed: &[&str]) -> bool {
    let essence = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    let Some((kind, _subtype)) = essence.split_once('/') else {
        return false;
    };
    allowed.iter().any(|a| {
        let a = a.to_ascii_lowercase();
        match a.strip_suffix("/*") {
            Some(prefix) => prefix == kind,
            None => a == essence,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::MemoryRecords;

    fn evaluate(rules: RuleSet, store: &MemoryRecords) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        rules.evaluate(store, &mut errors).unwrap();
        errors
    }

    #[test]
    fn presence_rejects_absent_and_blank() {
        let store = MemoryRecords::default();
        let errors = evaluate(
            RuleSet::new()
                .check("a", None::<String>, Rule::Presence)
                .check("b", "   ", Rule::Presence)
                .check("c", "ok", Rule::Presence),
            &store,
        );

        assert!(errors.has("a", "presence"));
        assert!(errors.has("b", "presence"));
        assert!(errors.get("c").is_empty());
    }

    #[test]
    fn rules_other_than_presence_skip_absent_values() {
        let store = MemoryRecords::default();
        let errors = evaluate(
            RuleSet::new()
                .check("url", None::<String>, Rule::Uri)
                .check("id", None::<RecordId>, Rule::exists("notes")),
            &store,
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn length_counts_characters() {
        let store = MemoryRecords::default();
        let errors = evaluate(
            RuleSet::new()
                .check("short", "ab", Rule::length(3, 5))
                .check("long", "abcdef", Rule::length(3, 5))
                .check("unicode", "ééé", Rule::length(3, 5)),
            &store,
        );

        assert!(errors.has("short", "length"));
        assert!(errors.has("long", "length"));
        assert!(errors.get("unicode").is_empty());
    }

    #[test]
    fn uri_accepts_http_and_https_only() {
        let store = MemoryRecords::default();
        let errors = evaluate(
            RuleSet::new()
                .check("a", "https://example.com/goals?id=1", Rule::Uri)
                .check("b", "http://localhost:8080", Rule::Uri)
                .check("c", "ftp://example.com", Rule::Uri)
                .check("d", "not a url", Rule::Uri),
            &store,
        );

        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["c", "d"]);
    }

    #[test]
    fn format_reports_description() {
        let store = MemoryRecords::default();
        let pattern = Regex::new(r"^[a-z-]+$").unwrap();
        let errors = evaluate(
            RuleSet::new().check("slug", "Not A Slug", Rule::format(pattern, "lowercase words joined by dashes")),
            &store,
        );
        assert_eq!(errors.get("slug")[0].message, "must be lowercase words joined by dashes");
    }

    #[test]
    fn exists_and_unique_consult_the_store() {
        let store = MemoryRecords::default();
        let owner = PrincipalId::new();
        store.put("notes", RecordId::new(1), owner, "taken");

        let errors = evaluate(
            RuleSet::new()
                .check("id", RecordId::new(1), Rule::exists("notes"))
                .check("other_id", RecordId::new(2), Rule::exists("notes"))
                .check("title", "taken", Rule::unique("notes"))
                .check("title_again", "free", Rule::unique("notes")),
            &store,
        );

        assert!(errors.get("id").is_empty());
        assert!(errors.has("other_id", "exists"));
        assert!(errors.has("title", "unique"));
        assert!(errors.get("title_again").is_empty());
    }

    #[test]
    fn unique_ignores_the_record_being_updated() {
        let store = MemoryRecords::default();
        store.put("notes", RecordId::new(1), PrincipalId::new(), "taken");

        let errors = evaluate(
            RuleSet::new().check("title", "taken", Rule::unique_except("notes", Some(RecordId::new(1)))),
            &store,
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn content_type_ignores_parameters_and_supports_wildcards() {
        assert!(content_type_matches("image/PNG; q=0.9", &["image/png"]));
        assert!(content_type_matches("image/webp", &["image/*"]));
        assert!(!content_type_matches("text/html", &["image/*", "application/pdf"]));
        assert!(!content_type_matches("garbage", &["image/*"]));
    }

    #[test]
    fn errors_accumulate_per_field_in_declaration_order() {
        let store = MemoryRecords::default();
        let errors = evaluate(
            RuleSet::new().field("title", "x", [Rule::length(3, 80), Rule::format(Regex::new(r"^\d+$").unwrap(), "numeric")]),
            &store,
        );

        let rules: Vec<_> = errors.get("title").iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(rules, vec!["length", "format"]);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn rules_on_the_wrong_value_type_are_a_programming_error() {
        let store = MemoryRecords::default();
        let mut errors = ValidationErrors::new();

        let err = RuleSet::new()
            .check("id", RecordId::new(1), Rule::Uri)
            .evaluate(&store, &mut errors)
            .unwrap_err();

        assert!(matches!(err, Failure::Unclassified(detail) if detail.contains("uri")));
        assert!(errors.is_empty());
    }

    #[test]
    fn store_failures_abort_evaluation() {
        let store = MemoryRecords::default();
        store.poison();

        let mut errors = ValidationErrors::new();
        let err = RuleSet::new()
            .check("id", RecordId::new(1), Rule::exists("notes"))
            .evaluate(&store, &mut errors)
            .unwrap_err();
        assert!(matches!(err, Failure::Unclassified(_)));
    }
}
