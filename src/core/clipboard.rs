//! Clipboard bridge: selection ⇄ tab/newline text

use crate::core::layout::ColumnLayout;
use crate::core::record_cache::RecordCache;
use crate::core::types::CellAddress;
use std::collections::BTreeMap;
use tracing::debug;

/// Serialize selected cells grouped by row.
///
/// Rows ascend; within a row cells are ordered by field ordinal and joined with
/// tabs. Gaps in a sparse selection are not padded.
pub fn copy_text(cells: &[CellAddress], cache: &RecordCache, layout: &ColumnLayout) -> String {
    let mut rows: BTreeMap<usize, Vec<(usize, String)>> = BTreeMap::new();
    for cell in cells {
        let Some(ordinal) = layout.ordinal(&cell.field) else {
            continue;
        };
        let Some(record) = cache.row(cell.row) else {
            continue;
        };
        rows.entry(cell.row)
            .or_default()
            .push((ordinal, record.display(&cell.field)));
    }
    rows.into_values()
        .map(|mut cols| {
            cols.sort_by_key(|(ordinal, _)| *ordinal);
            cols.into_iter()
                .map(|(_, v)| v)
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split clipboard text into rows of cells.
///
/// Accepts `\n` or `\r\n`. A single trailing line break is ignored; interior
/// blank lines are kept so rows stay aligned. Whitespace-only text yields nothing.
pub fn parse_paste(text: &str) -> Vec<Vec<String>> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let body = text
        .strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text);
    body.split('\n')
        .map(|line| {
            line.strip_suffix('\r')
                .unwrap_or(line)
                .split('\t')
                .map(str::to_string)
                .collect()
        })
        .collect()
}

/// Write a parsed block starting at `anchor`.
///
/// Rows advance from the anchor row; columns advance over visible fields from
/// the anchor's field. Read-only fields consume a column but are not written.
/// Writing stops at the page's row and column bounds. Returns written cells.
pub fn paste_block(
    block: &[Vec<String>],
    anchor: &CellAddress,
    cache: &mut RecordCache,
    layout: &ColumnLayout,
) -> Vec<CellAddress> {
    let visible = layout.visible_names();
    let Some(start_col) = visible.iter().position(|f| f == &anchor.field) else {
        return Vec::new();
    };
    let mut written = Vec::new();
    for (dr, values) in block.iter().enumerate() {
        let row = anchor.row + dr;
        if row >= cache.len() {
            break;
        }
        for (dc, text) in values.iter().enumerate() {
            let Some(field_name) = visible.get(start_col + dc) else {
                break;
            };
            let Some(field) = layout.field(field_name) else {
                continue;
            };
            if field.read_only {
                continue;
            }
            let value = field.coerce(text);
            if let Some(record) = cache.row_mut(row) {
                record.set(field_name, value);
                let id = record.id;
                if !cache.mark_modified(id) {
                    debug!("Pasted row {row} has no id yet; not tracked as modified");
                }
                written.push(CellAddress::new(row, field_name.clone()));
            }
        }
    }
    written
}

/// Host clipboard access, injected so the engine never touches a platform API directly
pub trait ClipboardPort {
    fn read_text(&mut self) -> Option<String>;
    fn write_text(&mut self, text: &str) -> bool;
}

/// System clipboard backed by `arboard`
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        let inner = match arboard::Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!("System clipboard unavailable: {e}");
                None
            }
        };
        Self { inner }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardPort for SystemClipboard {
    fn read_text(&mut self) -> Option<String> {
        self.inner.as_mut().and_then(|c| c.get_text().ok())
    }

    fn write_text(&mut self, text: &str) -> bool {
        match self.inner.as_mut() {
            Some(c) => c.set_text(text.to_string()).is_ok(),
            None => false,
        }
    }
}

/// In-process clipboard, for tests and headless hosts
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    pub text: Option<String>,
}

impl ClipboardPort for MemoryClipboard {
    fn read_text(&mut self) -> Option<String> {
        self.text.clone()
    }

    fn write_text(&mut self, text: &str) -> bool {
        self.text = Some(text.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::Field;
    use crate::core::models::{Record, RecordPage};
    use crate::core::types::RecordId;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn setup() -> (RecordCache, ColumnLayout) {
        let mut id = Field::new("id");
        id.read_only = true;
        let layout = ColumnLayout::new(vec![id, Field::new("a"), Field::new("b"), Field::new("c")]);
        let mut cache = RecordCache::new(10);
        cache.replace(RecordPage {
            records: (1..=3)
                .map(|i| {
                    Record::new(Some(RecordId(i)))
                        .with("id", i)
                        .with("a", format!("a{i}"))
                        .with("b", format!("b{i}"))
                        .with("c", format!("c{i}"))
                })
                .collect(),
            total: 3,
        });
        (cache, layout)
    }

    #[test]
    fn test_copy_orders_rows_and_columns() {
        let (cache, layout) = setup();
        let cells = vec![
            CellAddress::new(1, "b"),
            CellAddress::new(0, "c"),
            CellAddress::new(1, "a"),
            CellAddress::new(0, "a"),
        ];
        assert_eq!(copy_text(&cells, &cache, &layout), "a1\tc1\na2\tb2");
    }

    #[test]
    fn test_parse_paste_lines() {
        assert_eq!(parse_paste("x\ty\r\nz\n"), vec![vec!["x", "y"], vec!["z"]]);
        assert_eq!(parse_paste("x\n\ny"), vec![vec!["x"], vec![""], vec!["y"]]);
        assert!(parse_paste("  \n\t ").is_empty());
    }

    #[test]
    fn test_paste_skips_read_only_and_stops_at_bounds() {
        let (mut cache, layout) = setup();
        let block = parse_paste("p\tq\tr\ts\nu\tv\tw\tx\n1\t2\t3\t4\n9\t9\t9\t9");
        let written = paste_block(&block, &CellAddress::new(1, "id"), &mut cache, &layout);
        // rows 1 and 2 only, id skipped, three writable columns each
        assert_eq!(written.len(), 6);
        assert_eq!(cache.value(1, "id"), Some(&json!(2)));
        assert_eq!(cache.value(1, "a"), Some(&json!("q")));
        assert_eq!(cache.value(2, "c"), Some(&json!("x")));
        assert_eq!(cache.value(0, "a"), Some(&json!("a1")));
        assert_eq!(cache.modified_ids(), vec![RecordId(2), RecordId(3)]);
    }

    #[test]
    fn test_paste_walks_visible_fields_only() {
        let (mut cache, mut layout) = setup();
        layout.set_visible("b", false);
        let block = parse_paste("X\tY");
        paste_block(&block, &CellAddress::new(0, "a"), &mut cache, &layout);
        assert_eq!(cache.value(0, "a"), Some(&json!("X")));
        assert_eq!(cache.value(0, "b"), Some(&json!("b1")));
        assert_eq!(cache.value(0, "c"), Some(&json!("Y")));
    }

    #[test]
    fn test_copy_then_paste_round_trip() {
        let (mut cache, layout) = setup();
        let cells: Vec<CellAddress> = [(0, "a"), (0, "b"), (1, "a"), (1, "b")]
            .iter()
            .map(|(r, f)| CellAddress::new(*r, *f))
            .collect();
        let text = copy_text(&cells, &cache, &layout);
        for c in &cells {
            cache.row_mut(c.row).unwrap().set(&c.field, json!("changed"));
        }
        paste_block(&parse_paste(&text), &cells[0], &mut cache, &layout);
        assert_eq!(cache.value(0, "a"), Some(&json!("a1")));
        assert_eq!(cache.value(0, "b"), Some(&json!("b1")));
        assert_eq!(cache.value(1, "a"), Some(&json!("a2")));
        assert_eq!(cache.value(1, "b"), Some(&json!("b2")));
    }

    #[test]
    fn test_memory_clipboard() {
        let mut cb = MemoryClipboard::default();
        assert!(cb.read_text().is_none());
        assert!(cb.write_text("a\tb"));
        assert_eq!(cb.read_text().as_deref(), Some("a\tb"));
    }
}
