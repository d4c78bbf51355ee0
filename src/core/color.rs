//! Per-record, per-field color annotations
//!
//! Keyed by durable record id so marks survive row reorder and refetch. Local
//! entries hold the hex value used for rendering; the store is written with the
//! palette *name*.

use crate::config::PaletteEntry;
use crate::core::models::OperationRow;
use crate::core::types::RecordId;
use std::collections::HashMap;
use tracing::warn;

/// The ten built-in pastel fill colors
pub fn default_palette() -> Vec<PaletteEntry> {
    [
        ("淡黄色", "#ffffcc"),
        ("淡蓝色", "#ccffff"),
        ("淡红色", "#ffcccc"),
        ("淡绿色", "#ccffcc"),
        ("淡灰色", "#f2f2f2"),
        ("浅紫色", "#e6ccff"),
        ("浅橙色", "#ffe6cc"),
        ("浅藏青", "#ccd9ff"),
        ("浅玫红", "#ffccd9"),
        ("白色", "#ffffff"),
    ]
    .into_iter()
    .map(|(name, value)| PaletteEntry {
        name: name.to_string(),
        value: value.to_string(),
    })
    .collect()
}

/// Name ↔ hex lookup over the configured palette
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(default_palette())
    }
}

impl Palette {
    pub fn new(entries: Vec<PaletteEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn hex_for(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }

    pub fn by_name(&self, name: &str) -> Option<&PaletteEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// One entry written by an optimistic apply; used to undo exactly that write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMark {
    pub id: RecordId,
    pub field: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorMarks {
    marks: HashMap<RecordId, HashMap<String, String>>,
}

impl ColorMarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: RecordId, field: &str) -> Option<&str> {
        self.marks
            .get(&id)
            .and_then(|fields| fields.get(field))
            .map(String::as_str)
    }

    pub fn set(&mut self, id: RecordId, field: &str, hex: &str) {
        self.marks
            .entry(id)
            .or_default()
            .insert(field.to_string(), hex.to_string());
    }

    pub fn remove(&mut self, id: RecordId, field: &str) {
        if let Some(fields) = self.marks.get_mut(&id) {
            fields.remove(field);
            if fields.is_empty() {
                self.marks.remove(&id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.marks.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }

    /// Set `hex` on every target and return what was written
    pub fn apply(&mut self, targets: &[(RecordId, String)], hex: &str) -> Vec<AppliedMark> {
        targets
            .iter()
            .map(|(id, field)| {
                self.set(*id, field, hex);
                AppliedMark {
                    id: *id,
                    field: field.clone(),
                }
            })
            .collect()
    }

    /// Delete the entries written by `apply`. Prior values are not restored.
    pub fn rollback(&mut self, applied: &[AppliedMark]) {
        for mark in applied {
            self.remove(mark.id, &mark.field);
        }
    }

    /// Clear the table and repopulate it from bulk query rows.
    ///
    /// Rows with a blank or non-numeric id, an unparsable payload, or an unknown
    /// color name are skipped. Returns the number of skipped rows.
    pub fn rebuild(&mut self, rows: &[OperationRow], palette: &Palette) -> usize {
        self.marks.clear();
        let mut skipped = 0;
        for row in rows {
            let raw_id = row.business_id.trim();
            if raw_id.is_empty() {
                skipped += 1;
                continue;
            }
            let Ok(id) = raw_id.parse::<RecordId>() else {
                warn!("Skipping color mark row with unusable id '{raw_id}'");
                skipped += 1;
                continue;
            };
            let payload = match row.payload() {
                Ok(p) => p,
                Err(e) => {
                    warn!("Skipping color mark row for {id}: {e}");
                    skipped += 1;
                    continue;
                }
            };
            for (field, color_name) in payload {
                match palette.hex_for(&color_name) {
                    Some(hex) => self.set(id, &field, hex),
                    None => warn!("Unknown color '{color_name}' on {id}.{field}"),
                }
            }
        }
        skipped
    }
}
