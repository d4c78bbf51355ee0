//! Cell selection: click, shift-extend, multi-toggle, column and drag selection

use crate::core::layout::ColumnLayout;
use crate::core::types::{CellAddress, Point};
use std::collections::HashSet;

/// Inclusive row × field-ordinal rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl CellRange {
    /// Normalizing constructor: corners may be given in any order
    pub fn new(r1: usize, c1: usize, r2: usize, c2: usize) -> Self {
        Self {
            start_row: r1.min(r2),
            end_row: r1.max(r2),
            start_col: c1.min(c2),
            end_col: c1.max(c2),
        }
    }

    /// Rectangle spanned by two addresses; `None` if either field is unknown
    pub fn spanning(a: &CellAddress, b: &CellAddress, layout: &ColumnLayout) -> Option<Self> {
        let ca = layout.ordinal(&a.field)?;
        let cb = layout.ordinal(&b.field)?;
        Some(Self::new(a.row, ca, b.row, cb))
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }

    /// Addresses in row-major order, restricted to visible fields
    pub fn addresses(&self, layout: &ColumnLayout) -> Vec<CellAddress> {
        let fields = layout.visible_in_ordinal_range(self.start_col, self.end_col);
        let mut out = Vec::with_capacity(fields.len() * (self.end_row - self.start_row + 1));
        for row in self.start_row..=self.end_row {
            for field in &fields {
                out.push(CellAddress::new(row, field.clone()));
            }
        }
        out
    }
}

/// Ordered set of unique selected cells; the last one is the anchor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    cells: Vec<CellAddress>,
    index: HashSet<CellAddress>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cells(&self) -> &[CellAddress] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, addr: &CellAddress) -> bool {
        self.index.contains(addr)
    }

    pub fn is_selected(&self, row: usize, field: &str) -> bool {
        self.contains(&CellAddress::new(row, field))
    }

    /// The most recently selected address
    pub fn anchor(&self) -> Option<&CellAddress> {
        self.cells.last()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.index.clear();
    }

    fn replace(&mut self, cells: Vec<CellAddress>) {
        self.clear();
        for c in cells {
            self.push(c);
        }
    }

    fn push(&mut self, addr: CellAddress) {
        if self.index.insert(addr.clone()) {
            self.cells.push(addr);
        }
    }

    /// Replace the selection with one cell. Hidden or unknown fields are ignored.
    pub fn select_single(&mut self, addr: CellAddress, layout: &ColumnLayout) -> bool {
        if !layout.is_visible(&addr.field) {
            return false;
        }
        self.replace(vec![addr]);
        true
    }

    /// Replace the selection with the rectangle between the anchor and `addr`.
    /// Without an anchor this behaves like `select_single`.
    pub fn extend_shift(&mut self, addr: CellAddress, layout: &ColumnLayout) -> bool {
        let Some(anchor) = self.anchor().cloned() else {
            return self.select_single(addr, layout);
        };
        self.select_range(&anchor, &addr, layout)
    }

    /// Replace the selection with the rectangle spanned by two corners
    pub fn select_range(&mut self, a: &CellAddress, b: &CellAddress, layout: &ColumnLayout) -> bool {
        match CellRange::spanning(a, b, layout) {
            Some(range) => {
                self.replace(range.addresses(layout));
                true
            }
            None => false,
        }
    }

    /// Add `addr` if absent, remove it if present
    pub fn toggle_multi(&mut self, addr: CellAddress, layout: &ColumnLayout) -> bool {
        if self.index.remove(&addr) {
            self.cells.retain(|c| c != &addr);
            return true;
        }
        if !layout.is_visible(&addr.field) {
            return false;
        }
        self.push(addr);
        true
    }

    /// Select every row's cell in a visible field
    pub fn select_column(&mut self, field: &str, row_count: usize, layout: &ColumnLayout) -> bool {
        if !layout.is_visible(field) {
            return false;
        }
        self.replace((0..row_count).map(|r| CellAddress::new(r, field)).collect());
        true
    }

    /// Whether every current row's cell in `field` is selected.
    /// False with zero rows or a hidden field.
    pub fn is_column_fully_selected(&self, field: &str, row_count: usize, layout: &ColumnLayout) -> bool {
        if row_count == 0 || !layout.is_visible(field) {
            return false;
        }
        (0..row_count).all(|r| self.is_selected(r, field))
    }

    /// Drop addresses whose field is hidden or unknown, or whose row is out of range
    pub fn prune(&mut self, layout: &ColumnLayout, row_count: usize) -> bool {
        let before = self.cells.len();
        self.cells
            .retain(|c| c.row < row_count && layout.is_visible(&c.field));
        if self.cells.len() != before {
            self.index = self.cells.iter().cloned().collect();
            true
        } else {
            false
        }
    }
}

/// Drag-select gesture state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragSelect {
    #[default]
    Idle,
    /// Pointer is down on a cell but has not travelled far enough to be a drag
    Candidate { anchor: CellAddress, origin: Point },
    Dragging { anchor: CellAddress, origin: Point },
}

impl DragSelect {
    pub fn press(anchor: CellAddress, origin: Point) -> Self {
        DragSelect::Candidate { anchor, origin }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragSelect::Dragging { .. })
    }

    /// Advance on pointer movement.
    ///
    /// Returns the fixed anchor once the gesture is (or becomes) a drag; callers
    /// then span the selection from it to the cell under the cursor.
    pub fn on_move(&mut self, at: Point, threshold: f64) -> Option<&CellAddress> {
        let promoted = match self {
            DragSelect::Candidate { anchor, origin } => {
                let dx = (at.x - origin.x).abs();
                let dy = (at.y - origin.y).abs();
                (dx >= threshold || dy >= threshold).then(|| DragSelect::Dragging {
                    anchor: anchor.clone(),
                    origin: *origin,
                })
            }
            _ => None,
        };
        if let Some(next) = promoted {
            *self = next;
        }
        match self {
            DragSelect::Dragging { anchor, .. } => Some(anchor),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::Field;
    use pretty_assertions::assert_eq;

    fn layout() -> ColumnLayout {
        ColumnLayout::new(vec![
            Field::new("a"),
            Field::new("b"),
            Field::new("c"),
            Field::new("d"),
        ])
    }

    fn addr(row: usize, field: &str) -> CellAddress {
        CellAddress::new(row, field)
    }

    #[test]
    fn test_extend_shift_is_rectangle() {
        let l = layout();
        let mut sel = SelectionSet::new();
        sel.select_single(addr(3, "c"), &l);
        sel.extend_shift(addr(1, "a"), &l);
        let expected: Vec<CellAddress> = vec![
            addr(1, "a"), addr(1, "b"), addr(1, "c"),
            addr(2, "a"), addr(2, "b"), addr(2, "c"),
            addr(3, "a"), addr(3, "b"), addr(3, "c"),
        ];
        assert_eq!(sel.cells(), expected.as_slice());
        assert_eq!(sel.anchor(), Some(&addr(3, "c")));
    }

    #[test]
    fn test_extend_shift_skips_hidden_fields() {
        let mut l = layout();
        l.set_visible("b", false);
        let mut sel = SelectionSet::new();
        sel.select_single(addr(0, "a"), &l);
        sel.extend_shift(addr(1, "c"), &l);
        assert_eq!(sel.len(), 4);
        assert!(!sel.is_selected(0, "b"));
        assert!(sel.is_selected(1, "c"));
    }

    #[test]
    fn test_extend_shift_without_anchor() {
        let l = layout();
        let mut sel = SelectionSet::new();
        sel.extend_shift(addr(2, "b"), &l);
        assert_eq!(sel.cells(), &[addr(2, "b")]);
    }

    #[test]
    fn test_toggle_multi() {
        let l = layout();
        let mut sel = SelectionSet::new();
        sel.select_single(addr(0, "a"), &l);
        sel.toggle_multi(addr(4, "d"), &l);
        assert_eq!(sel.len(), 2);
        assert_eq!(sel.anchor(), Some(&addr(4, "d")));
        sel.toggle_multi(addr(0, "a"), &l);
        assert_eq!(sel.cells(), &[addr(4, "d")]);
    }

    #[test]
    fn test_hidden_field_cannot_be_selected() {
        let mut l = layout();
        l.set_visible("b", false);
        let mut sel = SelectionSet::new();
        assert!(!sel.select_single(addr(0, "b"), &l));
        assert!(!sel.toggle_multi(addr(0, "b"), &l));
        assert!(!sel.select_column("b", 3, &l));
        assert!(sel.is_empty());
    }

    #[test]
    fn test_select_column_and_fully_selected() {
        let l = layout();
        let mut sel = SelectionSet::new();
        assert!(!sel.is_column_fully_selected("b", 0, &l));
        sel.select_column("b", 3, &l);
        assert!(sel.is_column_fully_selected("b", 3, &l));
        sel.toggle_multi(addr(1, "b"), &l);
        assert!(!sel.is_column_fully_selected("b", 3, &l));
    }

    #[test]
    fn test_prune_hidden_and_out_of_range() {
        let mut l = layout();
        let mut sel = SelectionSet::new();
        sel.select_single(addr(0, "a"), &l);
        sel.extend_shift(addr(2, "c"), &l);
        l.set_visible("b", false);
        assert!(sel.prune(&l, 2));
        assert_eq!(sel.cells(), &[addr(0, "a"), addr(0, "c"), addr(1, "a"), addr(1, "c")]);
        assert!(!sel.is_selected(0, "b"));
    }

    #[test]
    fn test_drag_threshold() {
        let mut drag = DragSelect::press(addr(0, "a"), Point::new(100.0, 100.0));
        assert!(drag.on_move(Point::new(103.0, 102.0), 5.0).is_none());
        assert!(!drag.is_dragging());
        assert_eq!(drag.on_move(Point::new(100.0, 105.0), 5.0), Some(&addr(0, "a")));
        assert!(drag.is_dragging());
        // stays a drag even when the pointer comes back
        assert!(drag.on_move(Point::new(100.0, 100.0), 5.0).is_some());
    }

    #[test]
    fn test_cell_range_normalizes() {
        let r = CellRange::new(5, 3, 1, 0);
        assert_eq!((r.start_row, r.end_row, r.start_col, r.end_col), (1, 5, 0, 3));
        assert!(r.contains(2, 2));
        assert!(!r.contains(6, 2));
    }
}
