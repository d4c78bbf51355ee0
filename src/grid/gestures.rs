//! Pointer gestures: click and drag-select, fill-drag, column resize
//!
//! At most one gesture runs at a time. While one runs the grid reports
//! `is_capturing_pointer() == true`; the host forwards global pointer moves
//! and the release to the grid only during that window.

use super::{DataGrid, GridEvent};
use crate::core::fill::{FillDrag, FillOutcome};
use crate::core::selection::{CellRange, DragSelect};
use crate::core::types::{CellAddress, Modifiers, PixelRect, Point};
use crate::error::{GridError, Result};
use tracing::debug;

/// Geometry queries answered by the rendering layer
pub trait CellLocator {
    /// Cell under a point, if any
    fn cell_at(&self, point: Point) -> Option<CellAddress>;

    /// Pixel bounds of the cell at a display row and field ordinal
    fn cell_rect(&self, row: usize, col: usize) -> Option<PixelRect>;
}

/// Pixel bounds covering a range's two extreme corners
fn range_bounds(locator: &dyn CellLocator, range: &CellRange) -> Option<PixelRect> {
    let first = locator.cell_rect(range.start_row, range.start_col)?;
    let last = locator.cell_rect(range.end_row, range.end_col)?;
    Some(first.union(&last))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) enum Gesture {
    #[default]
    Idle,
    Select {
        drag: DragSelect,
        pressed: CellAddress,
        modifiers: Modifiers,
    },
    Fill(FillDrag),
    Resize {
        field: String,
        origin_x: f64,
        start_width: f64,
    },
}

impl DataGrid {
    pub fn is_capturing_pointer(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    fn begin(&mut self, gesture: Gesture) {
        self.gesture = gesture;
        self.emit(GridEvent::PointerCapture(true));
    }

    /// Primary-button press on the grid body
    ///
    /// Starts a drag-select candidate on the pressed cell. Nothing is selected
    /// until release (a click) or until the pointer travels past the drag threshold.
    pub fn pointer_down(&mut self, point: Point, modifiers: Modifiers, locator: &dyn CellLocator) -> bool {
        if self.is_capturing_pointer() {
            return false;
        }
        let Some(pressed) = locator.cell_at(point) else {
            return false;
        };
        self.begin(Gesture::Select {
            drag: DragSelect::press(pressed.clone(), point),
            pressed,
            modifiers,
        });
        true
    }

    /// Press on a cell's fill handle
    pub fn start_fill_drag(&mut self, source: CellAddress) -> Result<()> {
        if self.layout.field(&source.field).is_none() {
            return Err(GridError::UnknownField(source.field));
        }
        if source.row >= self.cache.len() {
            return Err(GridError::RowOutOfRange(source.row));
        }
        self.cancel_gesture();
        self.begin(Gesture::Fill(FillDrag::start(source)));
        Ok(())
    }

    /// Press on a column header's resize handle
    pub fn start_resize(&mut self, field: &str, x: f64) -> Result<()> {
        let start_width = self
            .layout
            .width(field)
            .ok_or_else(|| GridError::UnknownField(field.to_string()))?;
        self.cancel_gesture();
        self.begin(Gesture::Resize {
            field: field.to_string(),
            origin_x: x,
            start_width,
        });
        Ok(())
    }

    pub fn pointer_move(&mut self, point: Point, locator: &dyn CellLocator) {
        let threshold = self.config.drag_threshold;
        let mut events = Vec::new();
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Select { drag, .. } => {
                if let Some(anchor) = drag.on_move(point, threshold) {
                    let anchor = anchor.clone();
                    if let Some(cursor) = locator.cell_at(point) {
                        if self.selection.select_range(&anchor, &cursor, &self.layout) {
                            events.push(GridEvent::SelectionChanged);
                        }
                    }
                }
            }
            Gesture::Fill(fill) => {
                let cursor = locator.cell_at(point);
                let before = fill.preview();
                let after = fill.retarget(cursor.as_ref(), &self.layout, |r| range_bounds(locator, r));
                if before != after {
                    events.push(GridEvent::FillPreview(after));
                }
            }
            Gesture::Resize {
                field,
                origin_x,
                start_width,
            } => {
                let wanted = *start_width + (point.x - *origin_x);
                if self.layout.set_width(field, wanted).is_some() {
                    events.push(GridEvent::LayoutChanged);
                }
            }
        }
        for event in events {
            self.emit(event);
        }
    }

    /// Release ends whatever gesture is running
    ///
    /// A press that never became a drag is a click. A fill with a live preview
    /// re-resolves the cell under the release point and applies. Returns the fill
    /// outcome when a fill was applied.
    pub fn pointer_up(&mut self, point: Point, locator: &dyn CellLocator) -> Option<FillOutcome> {
        let gesture = std::mem::take(&mut self.gesture);
        let mut outcome = None;
        match gesture {
            Gesture::Idle => return None,
            Gesture::Select {
                drag,
                pressed,
                modifiers,
            } => {
                if !drag.is_dragging() {
                    self.click(pressed, modifiers);
                }
            }
            Gesture::Fill(mut fill) => {
                if fill.preview().is_some() {
                    let cursor = locator.cell_at(point);
                    fill.retarget(cursor.as_ref(), &self.layout, |r| range_bounds(locator, r));
                    let applied = fill.apply(&mut self.cache, &self.layout);
                    debug!(
                        "Fill from {} wrote {} cells, skipped {}",
                        fill.source(),
                        applied.written.len(),
                        applied.skipped
                    );
                    if !applied.written.is_empty() {
                        self.emit(GridEvent::CellsEdited(applied.written.clone()));
                        self.emit(GridEvent::ModifiedChanged);
                    }
                    outcome = Some(applied);
                }
                self.emit(GridEvent::FillPreview(None));
            }
            Gesture::Resize { .. } => {}
        }
        self.emit(GridEvent::PointerCapture(false));
        if outcome.as_ref().is_some_and(|o| !o.written.is_empty()) {
            self.resort_after_edit();
        }
        outcome
    }

    /// End the running gesture without applying it
    pub fn cancel_gesture(&mut self) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => return,
            Gesture::Fill(fill) if fill.preview().is_some() => {
                self.emit(GridEvent::FillPreview(None));
            }
            _ => {}
        }
        self.emit(GridEvent::PointerCapture(false));
    }
}
