//! The loaded page and its per-record flags

use crate::core::models::{Record, RecordPage};
use crate::core::types::RecordId;
use serde_json::Value;
use std::collections::BTreeSet;

/// Client-side cache of the current page
///
/// `records` keeps fetch order; `view` maps display positions to indices into
/// `records`. All row arguments are display positions.
#[derive(Debug, Clone)]
pub struct RecordCache {
    records: Vec<Record>,
    view: Vec<usize>,
    page: usize,
    page_size: usize,
    total: usize,
    modified: BTreeSet<RecordId>,
    checked: BTreeSet<RecordId>,
}

impl RecordCache {
    pub fn new(page_size: usize) -> Self {
        Self {
            records: Vec::new(),
            view: Vec::new(),
            page: 1,
            page_size: page_size.max(1),
            total: 0,
            modified: BTreeSet::new(),
            checked: BTreeSet::new(),
        }
    }

    /// Replace the page wholesale with a fetch response.
    ///
    /// Unsaved edits belonged to the old record objects and are dropped with them,
    /// so the modified set is cleared. Checked rows that are no longer present are dropped.
    pub fn replace(&mut self, page: RecordPage) {
        self.records = page.records;
        self.total = page.total;
        self.view = (0..self.records.len()).collect();
        self.modified.clear();
        let present: BTreeSet<RecordId> = self.records.iter().filter_map(|r| r.id).collect();
        self.checked.retain(|id| present.contains(id));
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn row(&self, row: usize) -> Option<&Record> {
        self.view.get(row).and_then(|&i| self.records.get(i))
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut Record> {
        match self.view.get(row) {
            Some(&i) => self.records.get_mut(i),
            None => None,
        }
    }

    pub fn value(&self, row: usize, field: &str) -> Option<&Value> {
        self.row(row).and_then(|r| r.get(field))
    }

    /// Records in display order
    pub fn rows(&self) -> impl Iterator<Item = &Record> + '_ {
        self.view.iter().filter_map(|&i| self.records.get(i))
    }

    /// Records in fetch order, as the sort sees them
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn find(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|r| r.id == Some(id))
    }

    pub fn position_of(&self, id: RecordId) -> Option<usize> {
        self.view
            .iter()
            .position(|&i| self.records.get(i).is_some_and(|r| r.id == Some(id)))
    }

    /// Display order as indices into `records`
    pub fn view(&self) -> &[usize] {
        &self.view
    }

    /// Install a display order produced by the sort
    pub fn set_view(&mut self, order: Vec<usize>) {
        debug_assert_eq!(order.len(), self.records.len());
        self.view = order;
    }

    /// Move a row between display positions; the current display order becomes
    /// the new fetch order
    pub fn move_row(&mut self, from: usize, to: usize) -> bool {
        if from >= self.view.len() || to >= self.view.len() {
            return false;
        }
        let mut ordered: Vec<Record> = self
            .view
            .iter()
            .filter_map(|&i| self.records.get(i).cloned())
            .collect();
        let moved = ordered.remove(from);
        ordered.insert(to, moved);
        self.records = ordered;
        self.view = (0..self.records.len()).collect();
        true
    }

    /// Drop records with the given ids from the page, keeping display order
    pub fn remove_ids(&mut self, ids: &[RecordId]) -> usize {
        let before = self.records.len();
        let kept: Vec<Record> = self
            .view
            .iter()
            .filter_map(|&i| self.records.get(i))
            .filter(|r| !r.id.is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect();
        self.records = kept;
        self.view = (0..self.records.len()).collect();
        for id in ids {
            self.modified.remove(id);
            self.checked.remove(id);
        }
        before - self.records.len()
    }

    /// Distinct non-null values of a field in display order
    pub fn unique_values(&self, field: &str) -> Vec<Value> {
        let mut out: Vec<Value> = Vec::new();
        for v in self.rows().filter_map(|r| r.get(field)) {
            if !v.is_null() && !out.contains(v) {
                out.push(v.clone());
            }
        }
        out
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of pages given the last authoritative total; at least one
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size).max(1)
    }

    /// Returns false when the record has no id yet
    pub fn mark_modified(&mut self, id: Option<RecordId>) -> bool {
        match id {
            Some(id) => {
                self.modified.insert(id);
                true
            }
            None => false,
        }
    }

    pub fn is_modified(&self, id: RecordId) -> bool {
        self.modified.contains(&id)
    }

    pub fn modified_ids(&self) -> Vec<RecordId> {
        self.modified.iter().copied().collect()
    }

    pub fn clear_modified(&mut self, id: RecordId) {
        self.modified.remove(&id);
    }

    pub fn clear_all_modified(&mut self) {
        self.modified.clear();
    }

    /// Modified records present on this page, in display order
    pub fn modified_records(&self) -> Vec<Record> {
        self.rows()
            .filter(|r| r.id.is_some_and(|id| self.modified.contains(&id)))
            .cloned()
            .collect()
    }

    pub fn toggle_checked(&mut self, id: RecordId) -> bool {
        if !self.checked.remove(&id) {
            self.checked.insert(id);
            true
        } else {
            false
        }
    }

    pub fn is_checked(&self, id: RecordId) -> bool {
        self.checked.contains(&id)
    }

    pub fn checked_ids(&self) -> Vec<RecordId> {
        self.checked.iter().copied().collect()
    }
}
