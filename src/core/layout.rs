//! Column layout: field order, flags, widths, visibility and aliases

use crate::config::GridConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Generate spreadsheet-style column letters: A..Z, AA..AZ, BA..
pub fn column_letters(n: usize) -> Vec<String> {
    (0..n).map(column_letter).collect()
}

/// Letter label for a zero-based ordinal
pub fn column_letter(ordinal: usize) -> String {
    let mut label = Vec::new();
    let mut k = ordinal as i64;
    loop {
        label.push(b'A' + (k % 26) as u8);
        k = k / 26 - 1;
        if k < 0 {
            break;
        }
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// A grid column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub read_only: bool,
    pub numeric: bool,
    pub date: bool,
    pub visible: bool,
    /// Pixel width
    pub width: f64,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            read_only: false,
            numeric: false,
            date: false,
            visible: true,
            width: 120.0,
        }
    }

    /// Convert typed-in or pasted text into the value stored for this field
    pub fn coerce(&self, text: &str) -> Value {
        if self.numeric {
            if let Ok(n) = text.trim().parse::<i64>() {
                return Value::from(n);
            }
            if let Some(n) = crate::core::models::parse_number(text)
                .and_then(serde_json::Number::from_f64)
            {
                return Value::Number(n);
            }
        }
        Value::String(text.to_string())
    }
}

/// Ordered field list with per-field presentation state
///
/// A field's ordinal is its index in `fields`; hidden fields keep their ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    fields: Vec<Field>,
    aliases: HashMap<String, String>,
    min_width: f64,
}

impl ColumnLayout {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            aliases: HashMap::new(),
            min_width: 40.0,
        }
    }

    /// Build the layout described by a grid config
    pub fn from_config(config: &GridConfig) -> Self {
        let fields = config
            .fields
            .iter()
            .map(|name| Field {
                name: name.clone(),
                read_only: config.read_only.contains(name),
                numeric: config.number_fields.contains(name),
                date: config.date_fields.contains(name),
                visible: true,
                width: config.default_column_width,
            })
            .collect();
        Self {
            fields,
            aliases: HashMap::new(),
            min_width: config.min_column_width,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_at(&self, ordinal: usize) -> Option<&Field> {
        self.fields.get(ordinal)
    }

    pub fn ordinal(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn letter(&self, name: &str) -> Option<String> {
        self.ordinal(name).map(column_letter)
    }

    pub fn letters(&self) -> Vec<String> {
        column_letters(self.fields.len())
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.visible)
    }

    pub fn is_read_only(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.read_only)
    }

    /// Whether a cell in this field may be written by edit, fill or paste
    pub fn is_writable(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.visible && !f.read_only)
    }

    /// Names of visible fields in ordinal order
    pub fn visible_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.visible)
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn all_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Returns false if the field is unknown
    pub fn set_visible(&mut self, name: &str, visible: bool) -> bool {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(f) => {
                f.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn set_all_visible(&mut self, visible: bool) {
        for f in &mut self.fields {
            f.visible = visible;
        }
    }

    pub fn is_all_visible(&self) -> bool {
        self.fields.iter().all(|f| f.visible)
    }

    /// Restore visibility from a persisted list; empty means everything visible
    pub fn apply_visible_list(&mut self, names: &[String]) {
        if names.is_empty() {
            self.set_all_visible(true);
            return;
        }
        for f in &mut self.fields {
            f.visible = names.iter().any(|n| n == &f.name);
        }
    }

    pub fn width(&self, name: &str) -> Option<f64> {
        self.field(name).map(|f| f.width)
    }

    pub fn min_width(&self) -> f64 {
        self.min_width
    }

    /// Set a width, clamped to the minimum. Returns the applied width.
    pub fn set_width(&mut self, name: &str, width: f64) -> Option<f64> {
        let min = self.min_width;
        self.fields.iter_mut().find(|f| f.name == name).map(|f| {
            f.width = width.max(min);
            f.width
        })
    }

    /// Move a field to a new ordinal, shifting the others
    pub fn move_field(&mut self, from: usize, to: usize) -> bool {
        if from >= self.fields.len() || to >= self.fields.len() {
            return false;
        }
        if from != to {
            let f = self.fields.remove(from);
            self.fields.insert(to, f);
        }
        true
    }

    pub fn alias(&self, name: &str) -> String {
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    pub fn aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }

    pub fn set_aliases(&mut self, aliases: HashMap<String, String>) {
        self.aliases = aliases;
    }

    /// Visible field names whose ordinals fall in `lo..=hi`
    pub fn visible_in_ordinal_range(&self, lo: usize, hi: usize) -> Vec<String> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(i, f)| *i >= lo && *i <= hi && f.visible)
            .map(|(_, f)| f.name.clone())
            .collect()
    }
}
