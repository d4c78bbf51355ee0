use async_trait::async_trait;
use datagrid::core::models::Record;
use datagrid::core::{MemoryClipboard, NotifyKind, OperationRow};
use datagrid::services::{InMemoryStore, MemoryPreferences, StoreCall};
use datagrid::{
    Action, CellAddress, CellLocator, DataGrid, GridConfig, GridError, GridEvent, GridHost,
    Modifiers, PixelRect, Point, RecordId,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const CELL_W: f64 = 100.0;
const CELL_H: f64 = 20.0;

#[derive(Default)]
struct Host {
    notes: Mutex<Vec<(String, NotifyKind)>>,
    refuse: Mutex<bool>,
}

impl Host {
    fn last(&self) -> Option<(String, NotifyKind)> {
        self.notes.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GridHost for Host {
    async fn confirm(&self, _message: &str) -> bool {
        !*self.refuse.lock().unwrap()
    }

    fn notify(&self, message: &str, kind: NotifyKind) {
        self.notes.lock().unwrap().push((message.to_string(), kind));
    }
}

/// Fixed-size cells laid out over the visible fields
struct Layout {
    fields: Vec<String>,
    rows: usize,
}

impl Layout {
    fn of(grid: &DataGrid) -> Self {
        Self {
            fields: grid.layout().all_names(),
            rows: grid.cache().len(),
        }
    }

    fn at(row: usize, col: usize) -> Point {
        Point::new(col as f64 * CELL_W + CELL_W / 2.0, row as f64 * CELL_H + CELL_H / 2.0)
    }
}

impl CellLocator for Layout {
    fn cell_at(&self, point: Point) -> Option<CellAddress> {
        if point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let row = (point.y / CELL_H) as usize;
        let col = (point.x / CELL_W) as usize;
        (row < self.rows)
            .then(|| self.fields.get(col).map(|f| CellAddress::new(row, f.as_str())))
            .flatten()
    }

    fn cell_rect(&self, row: usize, col: usize) -> Option<PixelRect> {
        (row < self.rows && col < self.fields.len()).then(|| {
            let left = col as f64 * CELL_W;
            let top = row as f64 * CELL_H;
            PixelRect::new(left, top, left + CELL_W, top + CELL_H)
        })
    }
}

fn grid_config() -> GridConfig {
    let mut config = GridConfig::with_fields(&["id", "customer", "status", "qty", "a"]);
    config.read_only = vec!["id".to_string()];
    config.number_fields = vec!["qty".to_string()];
    config.alias_fields = vec!["customer".to_string(), "status".to_string()];
    config
}

fn orders() -> Vec<Record> {
    [
        (5, "Acme", "open", 3, "10"),
        (6, "Bolt", "held", 8, "2"),
        (7, "Acme", "closed", 1, "33"),
    ]
    .into_iter()
    .map(|(id, customer, status, qty, a)| {
        Record::new(Some(RecordId(id)))
            .with("customer", customer)
            .with("status", status)
            .with("qty", qty)
            .with("a", a)
    })
    .collect()
}

async fn session() -> (DataGrid, Arc<InMemoryStore>, Arc<Host>) {
    let store = Arc::new(InMemoryStore::with_records(orders()));
    let host = Arc::new(Host::default());
    let mut grid = DataGrid::new(grid_config(), store.clone(), host.clone())
        .with_color_store(store.clone())
        .with_alias_store(store.clone())
        .with_preferences(Arc::new(MemoryPreferences::new()));
    grid.init().await.unwrap();
    (grid, store, host)
}

fn row_of(grid: &DataGrid, id: i64) -> usize {
    grid.cache().position_of(RecordId(id)).unwrap()
}

#[tokio::test]
async fn test_failed_color_write_rolls_back() {
    let (mut grid, store, host) = session().await;
    let row = row_of(&grid, 7);
    grid.select_single(CellAddress::new(row, "status"));
    store.fail(StoreCall::WriteColor, "color service down").await;

    let err = grid.apply_fill_color("淡黄色").await.unwrap_err();
    assert!(matches!(err, GridError::OptimisticWrite { rolled_back: 1, .. }));
    assert_eq!(grid.colors().get(RecordId(7), "status"), None);
    assert_eq!(grid.color_at(row, "status"), None);
    assert_eq!(host.last().unwrap().1, NotifyKind::Error);
    assert!(!grid.is_loading());
}

#[tokio::test]
async fn test_color_marks_survive_refetch() {
    let (mut grid, store, _) = session().await;
    grid.select_single(CellAddress::new(row_of(&grid, 7), "status"));
    grid.apply_fill_color("淡黄色").await.unwrap();
    assert_eq!(store.color_rows().await.len(), 1);

    grid.toggle_sort("qty").unwrap();
    grid.fetch_page().await.unwrap();
    let row = row_of(&grid, 7);
    assert_eq!(grid.color_at(row, "status"), Some("#ffffcc"));
}

#[tokio::test]
async fn test_unparsable_color_rows_are_skipped() {
    let (mut grid, store, _) = session().await;
    store
        .seed_color_rows(vec![
            OperationRow {
                business_id: "5".to_string(),
                column_key: Some("status".to_string()),
                operation_result: json!("{not json"),
            },
            OperationRow {
                business_id: "6".to_string(),
                column_key: Some("customer".to_string()),
                operation_result: json!({"customer": "淡蓝色"}),
            },
        ])
        .await;
    grid.fetch_page().await.unwrap();
    assert_eq!(grid.colors().get(RecordId(5), "status"), None);
    assert_eq!(grid.colors().get(RecordId(6), "customer"), Some("#ccffff"));
}

#[tokio::test]
async fn test_sort_by_numeric_text() {
    let store = Arc::new(InMemoryStore::with_records(vec![
        Record::new(Some(RecordId(1))).with("a", "10"),
        Record::new(Some(RecordId(2))).with("a", "2"),
    ]));
    let mut grid = DataGrid::new(GridConfig::with_fields(&["id", "a"]), store, Arc::new(Host::default()));
    grid.fetch_page().await.unwrap();

    grid.toggle_sort("a").unwrap();
    let ids: Vec<_> = grid.cache().rows().filter_map(|r| r.id).collect();
    assert_eq!(ids, vec![RecordId(2), RecordId(1)]);

    grid.toggle_sort("a").unwrap();
    let ids: Vec<_> = grid.cache().rows().filter_map(|r| r.id).collect();
    assert_eq!(ids, vec![RecordId(1), RecordId(2)]);
}

#[tokio::test]
async fn test_mixed_selection_stats() {
    let store = Arc::new(InMemoryStore::with_records(vec![
        Record::new(None).with("v", 5),
        Record::new(None).with("v", "x"),
        Record::new(None).with("v", 10),
    ]));
    let mut grid = DataGrid::new(GridConfig::with_fields(&["id", "v"]), store, Arc::new(Host::default()));
    grid.fetch_page().await.unwrap();
    grid.select_column("v");

    let stats = grid.stats();
    assert_eq!(stats.count, 3);
    assert_eq!(stats.sum, None);
    assert_eq!(stats.average, None);
}

#[tokio::test]
async fn test_save_all_with_nothing_modified() {
    let (mut grid, store, host) = session().await;
    let mut clipboard = MemoryClipboard::default();
    let err = grid.dispatch(Action::SaveAll, &mut clipboard).await.unwrap_err();
    assert!(matches!(err, GridError::Precondition(_)));
    assert_eq!(store.calls(StoreCall::Save).await, 0);
    assert_eq!(host.last(), Some(("Nothing to save".to_string(), NotifyKind::Error)));
}

#[tokio::test]
async fn test_refused_delete_keeps_everything() {
    let (mut grid, store, host) = session().await;
    grid.toggle_row_checked(RecordId(6));
    *host.refuse.lock().unwrap() = true;
    assert!(matches!(grid.delete_checked().await, Err(GridError::Cancelled)));
    assert_eq!(store.calls(StoreCall::Delete).await, 0);
    assert_eq!(grid.cache().len(), 3);
    assert_eq!(grid.cache().checked_ids(), vec![RecordId(6)]);
}

#[tokio::test]
async fn test_edit_save_and_refetch() {
    let (mut grid, store, _) = session().await;
    let row = row_of(&grid, 6);
    grid.set_cell_text(&CellAddress::new(row, "qty"), "12").unwrap();
    assert_eq!(grid.cache().value(row, "qty"), Some(&json!(12)));
    assert!(grid.cache().is_modified(RecordId(6)));

    grid.save_batch().await.unwrap();
    assert!(grid.cache().modified_ids().is_empty());
    assert_eq!(store.record(RecordId(6)).await.unwrap().get("qty"), Some(&json!(12)));
}

#[tokio::test]
async fn test_refetch_drops_unsaved_edits() {
    let (mut grid, _, _) = session().await;
    grid.set_cell(&CellAddress::new(0, "status"), json!("draft")).unwrap();
    grid.fetch_page().await.unwrap();
    assert!(grid.cache().modified_ids().is_empty());
    assert_ne!(grid.cache().value(0, "status"), Some(&json!("draft")));
}

#[tokio::test]
async fn test_insert_row_then_refetch() {
    let (mut grid, store, _) = session().await;
    let mut clipboard = MemoryClipboard::default();
    grid.dispatch(Action::InsertRow, &mut clipboard).await.unwrap();
    assert_eq!(grid.cache().len(), 4);
    assert_eq!(grid.cache().total(), 4);
    assert!(grid.cache().find(RecordId(8)).is_some());
    assert_eq!(store.calls(StoreCall::Query).await, 2);
}

#[tokio::test]
async fn test_hiding_a_field_prunes_selection() {
    let (mut grid, _, _) = session().await;
    grid.select_range(&CellAddress::new(0, "customer"), &CellAddress::new(1, "qty"));
    assert_eq!(grid.selection().len(), 6);
    let mut rx = grid.subscribe();

    grid.set_field_visible("status", false).unwrap();
    assert_eq!(grid.selection().len(), 4);
    assert!(!grid.selection().is_selected(0, "status"));
    assert_eq!(rx.recv().await, Some(GridEvent::LayoutChanged));
    assert_eq!(rx.recv().await, Some(GridEvent::SelectionChanged));
}

#[tokio::test]
async fn test_visibility_and_aliases_persist() {
    let (mut grid, store, host) = session().await;
    grid.set_field_visible("a", false).unwrap();
    let mut form = grid.alias_form();
    form.insert("customer".to_string(), "  Client ".to_string());
    form.insert("qty".to_string(), "ignored".to_string());
    grid.save_fields_and_aliases(&form).await.unwrap();
    assert_eq!(host.last().unwrap().1, NotifyKind::Success);

    let prefs = Arc::new(MemoryPreferences::new());
    let mut first = DataGrid::new(grid_config(), store.clone(), host.clone())
        .with_alias_store(store.clone())
        .with_preferences(prefs.clone());
    first.set_field_visible("a", false).unwrap();
    first.persist_visibility().unwrap();

    let mut second = DataGrid::new(grid_config(), store.clone(), host.clone())
        .with_alias_store(store.clone())
        .with_preferences(prefs);
    second.init().await.unwrap();
    assert!(!second.layout().is_visible("a"));
    assert_eq!(second.alias("customer"), "Client");
    assert_eq!(second.alias("qty"), "qty");
}

#[tokio::test]
async fn test_blank_alias_form_only_saves_visibility() {
    let (mut grid, store, host) = session().await;
    let form: BTreeMap<String, String> = grid.alias_form();
    grid.save_fields_and_aliases(&form).await.unwrap();
    assert_eq!(store.calls(StoreCall::SaveAliases).await, 0);
    assert_eq!(host.last().unwrap().1, NotifyKind::Info);
}

#[tokio::test]
async fn test_small_wobble_is_still_a_click() {
    let (mut grid, _, _) = session().await;
    let locator = Layout::of(&grid);
    let press = Layout::at(1, 1);
    grid.pointer_down(press, Modifiers::NONE, &locator);
    grid.pointer_move(Point::new(press.x + 4.0, press.y - 4.0), &locator);
    assert!(grid.selection().is_empty());
    grid.pointer_up(press, &locator);
    assert_eq!(grid.selection().cells(), &[CellAddress::new(1, "customer")]);

    // five pixels on one axis is a drag
    grid.pointer_down(Layout::at(0, 2), Modifiers::NONE, &locator);
    grid.pointer_move(Layout::at(2, 3), &locator);
    grid.pointer_up(Layout::at(2, 3), &locator);
    assert_eq!(grid.selection().len(), 6);
    assert!(!grid.is_capturing_pointer());
}

#[tokio::test]
async fn test_fill_drag_skips_read_only_fields() {
    let (mut grid, _, _) = session().await;
    let locator = Layout::of(&grid);
    grid.start_fill_drag(CellAddress::new(0, "status")).unwrap();
    // drag down and left across the read-only id column
    grid.pointer_move(Layout::at(2, 0), &locator);
    let outcome = grid.pointer_up(Layout::at(2, 0), &locator).unwrap();

    let status = grid.cache().value(0, "status").cloned().unwrap();
    for row in 0..3 {
        assert_eq!(grid.cache().value(row, "status"), Some(&status));
        assert_eq!(grid.cache().value(row, "customer"), Some(&status));
    }
    assert_eq!(outcome.skipped, 3);
    assert_eq!(grid.cache().modified_ids().len(), 3);
}

#[tokio::test]
async fn test_copy_paste_round_trip() {
    let (mut grid, _, _) = session().await;
    let mut clipboard = MemoryClipboard::default();
    grid.set_field_visible("status", false).unwrap();
    grid.select_range(&CellAddress::new(0, "customer"), &CellAddress::new(1, "qty"));
    grid.dispatch(Action::Copy, &mut clipboard).await.unwrap();
    let copied = clipboard.text.clone().unwrap();
    assert_eq!(copied, "Acme\t3\nBolt\t8");

    for row in 0..2 {
        grid.set_cell_text(&CellAddress::new(row, "customer"), "changed").unwrap();
        grid.set_cell_text(&CellAddress::new(row, "qty"), "0").unwrap();
    }

    grid.select_single(CellAddress::new(0, "customer"));
    grid.dispatch(Action::Paste, &mut clipboard).await.unwrap();
    grid.select_range(&CellAddress::new(0, "customer"), &CellAddress::new(1, "qty"));
    assert_eq!(grid.copy(), copied);
    assert_eq!(grid.cache().value(1, "qty"), Some(&json!(8)));
    // the hidden column between them was not touched
    assert_eq!(grid.cache().value(0, "status"), Some(&json!("open")));
}

#[tokio::test]
async fn test_paste_coerces_numeric_text() {
    let (mut grid, _, _) = session().await;
    grid.select_single(CellAddress::new(2, "customer"));
    let written = grid.paste("Crane\tpaused\t42");
    assert_eq!(written.len(), 3);
    assert_eq!(grid.cache().value(2, "customer"), Some(&json!("Crane")));
    assert_eq!(grid.cache().value(2, "status"), Some(&json!("paused")));
    assert_eq!(grid.cache().value(2, "qty"), Some(&json!(42)));
}

#[tokio::test]
async fn test_filter_payload_and_export() {
    let (mut grid, _, _) = session().await;
    grid.set_exact_filter("customer", vec!["Acme".to_string()]);
    grid.set_fuzzy_filter("status", "o");
    let query = grid.query();
    assert_eq!(query.filters.get("customer").map(String::as_str), Some("Acme"));
    assert_eq!(query.filters.get("status__like").map(String::as_str), Some("o"));

    grid.apply_filters().await.unwrap();
    assert_eq!(grid.cache().total(), 2);

    // a fuzzy pattern replaces the exact set on the same field
    grid.set_fuzzy_filter("customer", "Bo");
    assert!(!grid.query().filters.contains_key("customer"));

    let export = grid.export_csv().await.unwrap();
    assert!(export.file_name.starts_with("export_"));
    let text = String::from_utf8(export.bytes).unwrap();
    assert_eq!(text.lines().count(), 1);

    grid.reset_filters().await.unwrap();
    assert_eq!(grid.cache().total(), 3);
}

#[tokio::test]
async fn test_failed_fetch_reports_server_message() {
    let (mut grid, store, host) = session().await;
    store.fail(StoreCall::Query, "Session expired").await;
    assert!(grid.fetch_page().await.is_err());
    assert_eq!(host.last(), Some(("Session expired".to_string(), NotifyKind::Error)));
    assert!(!grid.is_loading());
    // the grid stays usable
    assert_eq!(grid.cache().len(), 3);
    grid.select_single(CellAddress::new(0, "qty"));
    assert_eq!(grid.selection().len(), 1);
}

#[tokio::test]
async fn test_two_grids_are_independent() {
    let (mut left, store, host) = session().await;
    let mut right = DataGrid::new(grid_config(), store, host);
    right.fetch_page().await.unwrap();
    left.select_column("qty");
    assert_eq!(left.selection().len(), 3);
    assert!(right.selection().is_empty());
}
