// In-progress form record shared by every wizard

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single value collected by a form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
    Set(BTreeSet<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    // Text inputs deliver numbers as strings ("2"), so both shapes are accepted.
    // "inf" and "NaN" parse as f64 but are not numbers a form can hold.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(text) => text.trim().parse().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            FieldValue::Set(values) => Some(values),
            _ => None,
        }
    }

    /// Whether the value counts as "not filled in".
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Flag(flag) => !flag,
            FieldValue::Number(n) => n.is_nan(),
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Set(values) => values.is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(values: Vec<&str>) -> Self {
        FieldValue::Set(values.into_iter().map(str::to_string).collect())
    }
}

/// Mapping from field name to value, mutated one field at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Draft {
    fields: BTreeMap<String, FieldValue>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, handy for prefilled forms.
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_blank(&self, name: &str) -> bool {
        self.get(name).map_or(true, FieldValue::is_blank)
    }

    /// Text content of a field, or "" when absent or not text.
    pub fn text(&self, name: &str) -> &str {
        self.get(name).and_then(FieldValue::as_text).unwrap_or("")
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_number)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(FieldValue::as_flag).unwrap_or(false)
    }

    pub fn values(&self, name: &str) -> Vec<String> {
        self.get(name)
            .and_then(FieldValue::as_set)
            .map(|values| values.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains_value(&self, name: &str, value: &str) -> bool {
        self.get(name)
            .and_then(FieldValue::as_set)
            .map_or(false, |values| values.contains(value))
    }

    /// Checkbox-group update: adds or removes one option of a set field.
    pub fn toggle(&mut self, name: &str, value: &str, checked: bool) {
        let entry = self
            .fields
            .entry(name.to_string())
            .or_insert_with(|| FieldValue::Set(BTreeSet::new()));

        if !matches!(entry, FieldValue::Set(_)) {
            *entry = FieldValue::Set(BTreeSet::new());
        }

        if let FieldValue::Set(values) = entry {
            if checked {
                values.insert(value.to_string());
            } else {
                values.remove(value);
            }
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDateTime> {
        parse_instant(self.text(name))
    }
}

/// Parses a date (`YYYY-MM-DD`) or a local date-time (`YYYY-MM-DDTHH:MM[:SS]`).
/// Plain dates are taken at midnight.
pub fn parse_instant(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}
