//! Exact (multi-value) and fuzzy (substring) filters and the outbound query payload
//!
//! The two kinds are mutually exclusive per field: setting one clears the other.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Suffix of the payload key carrying a fuzzy pattern
pub const LIKE_SUFFIX: &str = "__like";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    exact: BTreeMap<String, Vec<String>>,
    fuzzy: BTreeMap<String, String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exact(&self, field: &str) -> &[String] {
        self.exact.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fuzzy(&self, field: &str) -> &str {
        self.fuzzy.get(field).map(String::as_str).unwrap_or("")
    }

    /// Replace a field's admitted values (duplicates dropped, order kept).
    /// A non-empty set clears the field's fuzzy pattern.
    pub fn set_exact(&mut self, field: &str, values: Vec<String>) {
        let mut deduped: Vec<String> = Vec::with_capacity(values.len());
        for v in values {
            if !deduped.contains(&v) {
                deduped.push(v);
            }
        }
        if deduped.is_empty() {
            self.exact.remove(field);
        } else {
            self.fuzzy.remove(field);
            self.exact.insert(field.to_string(), deduped);
        }
    }

    /// Remove one admitted value. Returns whether it was present.
    pub fn remove_exact_value(&mut self, field: &str, value: &str) -> bool {
        let Some(values) = self.exact.get_mut(field) else {
            return false;
        };
        let before = values.len();
        values.retain(|v| v != value);
        let removed = values.len() != before;
        if values.is_empty() {
            self.exact.remove(field);
        }
        removed
    }

    /// Set a field's substring pattern. A non-empty pattern clears the field's exact set.
    pub fn set_fuzzy(&mut self, field: &str, pattern: &str) {
        if pattern.is_empty() {
            self.fuzzy.remove(field);
        } else {
            self.exact.remove(field);
            self.fuzzy.insert(field.to_string(), pattern.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.exact.clear();
        self.fuzzy.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.fuzzy.is_empty()
    }

    /// Filter payload entries for the given fields.
    ///
    /// Exact sets go under the field key as a comma-joined list; fuzzy patterns
    /// go under `<field>__like`. Used for both page queries and exports.
    pub fn payload(&self, fields: &[String]) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for field in fields {
            if let Some(values) = self.exact.get(field).filter(|v| !v.is_empty()) {
                out.insert(field.clone(), values.join(","));
            }
            if let Some(pattern) = self.fuzzy.get(field).filter(|p| !p.is_empty()) {
                out.insert(format!("{field}{LIKE_SUFFIX}"), pattern.clone());
            }
        }
        out
    }
}

/// Pending edit of one field's exact filter, committed or discarded as a whole
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactFilterEditor {
    pub field: String,
    pub candidates: Vec<String>,
}

impl ExactFilterEditor {
    pub fn open(field: &str, filters: &FilterState) -> Self {
        Self {
            field: field.to_string(),
            candidates: filters.exact(field).to_vec(),
        }
    }

    /// Tick or untick a value; returns whether it is now admitted
    pub fn toggle(&mut self, value: &str) -> bool {
        if let Some(pos) = self.candidates.iter().position(|v| v == value) {
            self.candidates.remove(pos);
            false
        } else {
            self.candidates.push(value.to_string());
            true
        }
    }

    pub fn is_checked(&self, value: &str) -> bool {
        self.candidates.iter().any(|v| v == value)
    }

    pub fn commit(self, filters: &mut FilterState) {
        filters.set_exact(&self.field, self.candidates);
    }
}
