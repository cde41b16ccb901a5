// Field validation: error types, result mapping and the rule table used by every form

use crate::draft::Draft;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("valid email pattern"));

/// One failing field with the text key of its message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

/// Aggregate of field errors that blocked a step advance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("step {step} has {} invalid field(s)", errors.len())]
pub struct StepValidationError {
    pub step: usize,
    pub errors: Vec<FieldValidationError>,
}

/// Mapping from field name to message key. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationResult {
    errors: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records an error unless the field already has one.
    pub fn insert(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.errors.remove(field)
    }

    pub fn merge(&mut self, other: &ValidationResult) {
        for (field, message) in &other.errors {
            self.insert(field, message);
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_field_errors(&self) -> Vec<FieldValidationError> {
        self.iter()
            .map(|(field, message)| FieldValidationError {
                field: field.to_string(),
                message: message.to_string(),
            })
            .collect()
    }

    pub fn into_step_result(self, step: usize) -> Result<(), StepValidationError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(StepValidationError {
                step,
                errors: self.to_field_errors(),
            })
        }
    }
}

/// Anything able to check a draft for one wizard step.
pub trait StepValidator: Send + Sync {
    fn validate(&self, draft: &Draft) -> ValidationResult;
}

impl<F> StepValidator for F
where
    F: Fn(&Draft) -> ValidationResult + Send + Sync,
{
    fn validate(&self, draft: &Draft) -> ValidationResult {
        self(draft)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Present and not blank (non-empty text/set, checked flag).
    Required,
    /// Whole number, at least the given value.
    Count(u32),
    /// Shape `something@host.tld`.
    Email,
    /// Parses as a date or date-time.
    Date,
    /// Strictly after the date held by another field; skipped while either is unparseable.
    DateAfter(&'static str),
    /// 16 digits once whitespace is stripped.
    CardNumber,
    /// `MM/YY`.
    CardExpiry,
    /// 3 or 4 digits.
    CardCvc,
}

impl Rule {
    fn check(&self, draft: &Draft, field: &str) -> bool {
        match self {
            Rule::Required => !draft.is_blank(field),
            Rule::Count(min) => draft
                .number(field)
                .map_or(false, |n| n.fract() == 0.0 && n >= f64::from(*min)),
            Rule::Email => EMAIL_RE.is_match(draft.text(field)),
            Rule::Date => draft.date(field).is_some(),
            Rule::DateAfter(other) => match (draft.date(other), draft.date(field)) {
                (Some(start), Some(end)) => end > start,
                _ => true,
            },
            Rule::CardNumber => {
                let digits: String = draft
                    .text(field)
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                digits.len() == 16 && all_digits(&digits)
            }
            Rule::CardExpiry => {
                let value = draft.text(field);
                match value.split_once('/') {
                    Some((month, year)) => {
                        month.len() == 2 && year.len() == 2 && all_digits(month) && all_digits(year)
                    }
                    None => false,
                }
            }
            Rule::CardCvc => {
                let value = draft.text(field);
                (3..=4).contains(&value.len()) && all_digits(value)
            }
        }
    }
}

fn all_digits(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_digit())
}

/// Guard that enables a rule only for some draft states.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(&'static str, &'static str),
}

impl Condition {
    fn holds(&self, draft: &Draft) -> bool {
        match self {
            Condition::Equals(field, expected) => draft.text(field) == *expected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub field: &'static str,
    pub rule: Rule,
    pub message: &'static str,
    pub when: Option<Condition>,
}

/// Ordered rule table. The first failing rule of a field sets its message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<FieldRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, field: &'static str, rule: Rule, message: &'static str) -> Self {
        self.rules.push(FieldRule {
            field,
            rule,
            message,
            when: None,
        });
        self
    }

    pub fn rule_when(
        mut self,
        condition: Condition,
        field: &'static str,
        rule: Rule,
        message: &'static str,
    ) -> Self {
        self.rules.push(FieldRule {
            field,
            rule,
            message,
            when: Some(condition),
        });
        self
    }

    /// Appends another table's rules after this one's.
    pub fn and(mut self, other: RuleSet) -> Self {
        self.rules.extend(other.rules);
        self
    }

    /// Fields mentioned by the table, in first-mention order.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        for rule in &self.rules {
            if !fields.contains(&rule.field) {
                fields.push(rule.field);
            }
        }
        fields
    }
}

impl StepValidator for RuleSet {
    fn validate(&self, draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();

        for rule in &self.rules {
            if result.contains(rule.field) {
                continue;
            }
            if let Some(condition) = &rule.when {
                if !condition.holds(draft) {
                    continue;
                }
            }
            if !rule.rule.check(draft, rule.field) {
                result.insert(rule.field, rule.message);
            }
        }

        result
    }
}
