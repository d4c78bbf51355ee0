//! Fill-drag: propagate one cell's value across a rectangle

use crate::core::layout::ColumnLayout;
use crate::core::record_cache::RecordCache;
use crate::core::selection::CellRange;
use crate::core::types::{CellAddress, PixelRect};
use tracing::debug;

/// An armed fill-drag with a fixed source cell
#[derive(Debug, Clone, PartialEq)]
pub struct FillDrag {
    source: CellAddress,
    target: Option<CellRange>,
    preview: Option<PixelRect>,
}

/// Result of applying a fill
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillOutcome {
    /// Cells whose value was written
    pub written: Vec<CellAddress>,
    /// Cells in the rectangle left alone because the field is read-only
    pub skipped: usize,
}

impl FillDrag {
    pub fn start(source: CellAddress) -> Self {
        Self {
            source,
            target: None,
            preview: None,
        }
    }

    pub fn source(&self) -> &CellAddress {
        &self.source
    }

    pub fn target(&self) -> Option<CellRange> {
        self.target
    }

    /// Pixel bounds of the pending rectangle while it is shown
    pub fn preview(&self) -> Option<PixelRect> {
        self.preview
    }

    /// Retarget to the cell under the cursor.
    ///
    /// `bounds` gives the pixel rectangle of the rectangle's two extreme corners.
    /// An unresolvable cursor or missing cell geometry hides the preview and
    /// disarms the pending rectangle.
    pub fn retarget(
        &mut self,
        cursor: Option<&CellAddress>,
        layout: &ColumnLayout,
        bounds: impl Fn(&CellRange) -> Option<PixelRect>,
    ) -> Option<PixelRect> {
        let range = cursor.and_then(|c| CellRange::spanning(&self.source, c, layout));
        match range.and_then(|r| bounds(&r).map(|px| (r, px))) {
            Some((r, px)) => {
                self.target = Some(r);
                self.preview = Some(px);
            }
            None => {
                self.target = None;
                self.preview = None;
            }
        }
        self.preview
    }

    /// Write the source value into every non-read-only cell of the active
    /// rectangle, hidden fields included, and mark owning records modified.
    ///
    /// No-op if no rectangle is active or the source row is no longer on the page.
    pub fn apply(&self, cache: &mut RecordCache, layout: &ColumnLayout) -> FillOutcome {
        let mut outcome = FillOutcome::default();
        let Some(range) = self.target else {
            return outcome;
        };
        let Some(source) = cache.row(self.source.row) else {
            debug!("Fill source row {} is gone; nothing applied", self.source.row);
            return outcome;
        };
        let value = source
            .get(&self.source.field)
            .cloned()
            .unwrap_or_else(|| serde_json::Value::String(String::new()));

        let last_row = range.end_row.min(cache.len().saturating_sub(1));
        if cache.is_empty() || range.start_row > last_row {
            return outcome;
        }
        for row in range.start_row..=last_row {
            for col in range.start_col..=range.end_col {
                let Some(field) = layout.field_at(col) else {
                    continue;
                };
                if field.read_only {
                    outcome.skipped += 1;
                    continue;
                }
                let name = field.name.clone();
                if let Some(record) = cache.row_mut(row) {
                    record.set(&name, value.clone());
                    let id = record.id;
                    if !cache.mark_modified(id) {
                        debug!("Filled row {row} has no id yet; not tracked as modified");
                    }
                    outcome.written.push(CellAddress::new(row, name));
                }
            }
        }
        outcome
    }
}
