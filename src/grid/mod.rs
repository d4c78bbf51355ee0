//! The grid engine
//!
//! `DataGrid` owns one grid's state (page cache, layout, selection, filters,
//! sort, color marks) and reaches the outside world only through the
//! collaborator traits in [`crate::services`]. Hosts observe it through
//! [`DataGrid::subscribe`] and drive it with commands and pointer events.

mod gestures;
mod mutations;
mod remote;

pub use gestures::CellLocator;
pub use remote::CsvExport;

use crate::action::Action;
use crate::config::GridConfig;
use crate::core::clipboard::{self, ClipboardPort};
use crate::core::color::{ColorMarks, Palette};
use crate::core::filter::{ExactFilterEditor, FilterState};
use crate::core::layout::ColumnLayout;
use crate::core::record_cache::RecordCache;
use crate::core::selection::SelectionSet;
use crate::core::sort::SortState;
use crate::core::stats::SelectionStats;
use crate::core::types::{CellAddress, Modifiers, NotifyKind, PixelRect, RecordId};
use crate::error::{GridError, Result};
use crate::services::{AliasStore, ColorMarkStore, GridHost, PreferenceStore, RecordStore};
use gestures::Gesture;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error, info, warn};

/// Change notifications published to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    SelectionChanged,
    /// A fetch replaced the page
    RecordsReplaced { total: usize },
    CellsEdited(Vec<CellAddress>),
    RowsRemoved(Vec<RecordId>),
    /// Row order changed without a fetch
    RowsReordered,
    ModifiedChanged,
    CheckedChanged,
    ColorsChanged,
    /// Visibility, order, width or aliases of columns changed
    LayoutChanged,
    FiltersChanged,
    SortChanged,
    LoadingChanged(bool),
    FillPreview(Option<PixelRect>),
    /// True while a pointer gesture needs global move/up events
    PointerCapture(bool),
    ExportReady(CsvExport),
}

pub struct DataGrid {
    config: GridConfig,
    layout: ColumnLayout,
    cache: RecordCache,
    selection: SelectionSet,
    filters: FilterState,
    exact_editor: Option<ExactFilterEditor>,
    sort: SortState,
    colors: ColorMarks,
    palette: Palette,
    store: Arc<dyn RecordStore>,
    color_store: Option<Arc<dyn ColorMarkStore>>,
    alias_store: Option<Arc<dyn AliasStore>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
    host: Arc<dyn GridHost>,
    loading: bool,
    gesture: Gesture,
    subscribers: Vec<UnboundedSender<GridEvent>>,
}

impl DataGrid {
    pub fn new(config: GridConfig, store: Arc<dyn RecordStore>, host: Arc<dyn GridHost>) -> Self {
        Self {
            layout: ColumnLayout::from_config(&config),
            cache: RecordCache::new(config.page_size),
            palette: Palette::new(config.palette.clone()),
            config,
            selection: SelectionSet::new(),
            filters: FilterState::new(),
            exact_editor: None,
            sort: SortState::default(),
            colors: ColorMarks::new(),
            store,
            color_store: None,
            alias_store: None,
            preferences: None,
            host,
            loading: false,
            gesture: Gesture::Idle,
            subscribers: Vec::new(),
        }
    }

    pub fn with_color_store(mut self, store: Arc<dyn ColorMarkStore>) -> Self {
        self.color_store = Some(store);
        self
    }

    pub fn with_alias_store(mut self, store: Arc<dyn AliasStore>) -> Self {
        self.alias_store = Some(store);
        self
    }

    pub fn with_preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Receive every subsequent change event. Dropped receivers are pruned.
    pub fn subscribe(&mut self) -> UnboundedReceiver<GridEvent> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: GridEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn notify(&self, message: &str, kind: NotifyKind) {
        self.host.notify(message, kind);
    }

    /// Log a failure and tell the user about it
    fn report(&self, err: &GridError) {
        match err {
            GridError::Cancelled => info!("Action cancelled by user"),
            GridError::Precondition(msg) => {
                warn!("{msg}");
                self.notify(msg, NotifyKind::Error);
            }
            other => {
                error!("{other}");
                self.notify(&other.user_message(), NotifyKind::Error);
            }
        }
    }

    /// Report an unmet precondition and hand back the error
    fn precondition(&self, message: &str) -> GridError {
        let err = GridError::Precondition(message.to_string());
        self.report(&err);
        err
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.emit(GridEvent::LoadingChanged(loading));
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    pub fn colors(&self) -> &ColorMarks {
        &self.colors
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Fill color (hex) of a cell, if marked
    pub fn color_at(&self, row: usize, field: &str) -> Option<&str> {
        let id = self.cache.row(row)?.id?;
        self.colors.get(id, field)
    }

    pub fn alias(&self, field: &str) -> String {
        self.layout.alias(field)
    }

    pub fn stats(&self) -> SelectionStats {
        SelectionStats::compute(self.selection.cells(), &self.cache)
    }

    // --- selection -------------------------------------------------------

    fn selection_changed(&mut self, changed: bool) -> bool {
        if changed {
            self.emit(GridEvent::SelectionChanged);
        }
        changed
    }

    pub fn select_single(&mut self, addr: CellAddress) -> bool {
        let changed = self.selection.select_single(addr, &self.layout);
        self.selection_changed(changed)
    }

    pub fn extend_shift(&mut self, addr: CellAddress) -> bool {
        let changed = self.selection.extend_shift(addr, &self.layout);
        self.selection_changed(changed)
    }

    pub fn toggle_multi(&mut self, addr: CellAddress) -> bool {
        let changed = self.selection.toggle_multi(addr, &self.layout);
        self.selection_changed(changed)
    }

    pub fn select_range(&mut self, anchor: &CellAddress, cursor: &CellAddress) -> bool {
        let changed = self.selection.select_range(anchor, cursor, &self.layout);
        self.selection_changed(changed)
    }

    pub fn select_column(&mut self, field: &str) -> bool {
        let rows = self.cache.len();
        let changed = self.selection.select_column(field, rows, &self.layout);
        self.selection_changed(changed)
    }

    pub fn is_column_fully_selected(&self, field: &str) -> bool {
        self.selection
            .is_column_fully_selected(field, self.cache.len(), &self.layout)
    }

    /// A plain, shift or multi click on a cell
    pub fn click(&mut self, addr: CellAddress, modifiers: Modifiers) -> bool {
        if modifiers.shift {
            self.extend_shift(addr)
        } else if modifiers.multi {
            self.toggle_multi(addr)
        } else {
            self.select_single(addr)
        }
    }

    pub fn clear_selection(&mut self) {
        let changed = !self.selection.is_empty();
        self.selection.clear();
        self.selection_changed(changed);
    }

    /// Row positions no longer mean what they did: drop the selection and any
    /// gesture holding a cell address
    fn invalidate_positions(&mut self) {
        self.cancel_gesture();
        self.clear_selection();
    }

    // --- cell edits ------------------------------------------------------

    fn check_cell(&self, addr: &CellAddress) -> Result<()> {
        if self.layout.field(&addr.field).is_none() {
            return Err(GridError::UnknownField(addr.field.clone()));
        }
        if self.layout.is_read_only(&addr.field) {
            return Err(GridError::ReadOnlyField(addr.field.clone()));
        }
        if addr.row >= self.cache.len() {
            return Err(GridError::RowOutOfRange(addr.row));
        }
        Ok(())
    }

    /// Write one cell and mark its record modified
    pub fn set_cell(&mut self, addr: &CellAddress, value: Value) -> Result<()> {
        self.check_cell(addr)?;
        let Some(record) = self.cache.row_mut(addr.row) else {
            return Err(GridError::RowOutOfRange(addr.row));
        };
        record.set(&addr.field, value);
        let id = record.id;
        if !self.cache.mark_modified(id) {
            debug!("Edited row {} has no id yet; not tracked as modified", addr.row);
        }
        self.emit(GridEvent::CellsEdited(vec![addr.clone()]));
        self.emit(GridEvent::ModifiedChanged);
        self.resort_after_edit();
        Ok(())
    }

    /// Write typed-in text, converted to a number for numeric fields
    pub fn set_cell_text(&mut self, addr: &CellAddress, text: &str) -> Result<()> {
        let value = match self.layout.field(&addr.field) {
            Some(field) => field.coerce(text),
            None => return Err(GridError::UnknownField(addr.field.clone())),
        };
        self.set_cell(addr, value)
    }

    // --- clipboard -------------------------------------------------------

    /// Selected cells as tab/newline text
    pub fn copy(&self) -> String {
        clipboard::copy_text(self.selection.cells(), &self.cache, &self.layout)
    }

    /// Write pasted text at the selection anchor. Returns the written cells.
    pub fn paste(&mut self, text: &str) -> Vec<CellAddress> {
        let Some(anchor) = self.selection.anchor().cloned() else {
            debug!("Paste ignored: no selection anchor");
            return Vec::new();
        };
        let block = clipboard::parse_paste(text);
        if block.is_empty() {
            return Vec::new();
        }
        let written = clipboard::paste_block(&block, &anchor, &mut self.cache, &self.layout);
        if !written.is_empty() {
            self.emit(GridEvent::CellsEdited(written.clone()));
            self.emit(GridEvent::ModifiedChanged);
            self.resort_after_edit();
        }
        written
    }

    pub fn copy_to(&mut self, port: &mut dyn ClipboardPort) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        let text = self.copy();
        if port.write_text(&text) {
            self.notify("Copied", NotifyKind::Success);
            true
        } else {
            self.report(&GridError::Precondition("Copy failed".to_string()));
            false
        }
    }

    pub fn paste_from(&mut self, port: &mut dyn ClipboardPort) -> Vec<CellAddress> {
        if self.selection.is_empty() {
            return Vec::new();
        }
        match port.read_text() {
            Some(text) => {
                let written = self.paste(&text);
                if !written.is_empty() {
                    self.notify("Paste complete", NotifyKind::Success);
                }
                written
            }
            None => {
                self.report(&GridError::Precondition("Paste failed".to_string()));
                Vec::new()
            }
        }
    }

    // --- columns ---------------------------------------------------------

    /// Show or hide a field; hiding drops its cells from the selection
    pub fn set_field_visible(&mut self, field: &str, visible: bool) -> Result<()> {
        if !self.layout.set_visible(field, visible) {
            return Err(GridError::UnknownField(field.to_string()));
        }
        self.emit(GridEvent::LayoutChanged);
        let pruned = self.selection.prune(&self.layout, self.cache.len());
        self.selection_changed(pruned);
        Ok(())
    }

    /// Returns the new visibility
    pub fn toggle_field_visibility(&mut self, field: &str) -> Result<bool> {
        let visible = !self.layout.is_visible(field);
        self.set_field_visible(field, visible)?;
        Ok(visible)
    }

    pub fn set_all_visible(&mut self, visible: bool) {
        self.layout.set_all_visible(visible);
        self.emit(GridEvent::LayoutChanged);
        let pruned = self.selection.prune(&self.layout, self.cache.len());
        self.selection_changed(pruned);
    }

    pub fn move_field(&mut self, from: usize, to: usize) -> bool {
        let moved = self.layout.move_field(from, to);
        if moved {
            self.emit(GridEvent::LayoutChanged);
        }
        moved
    }

    /// Returns the applied (clamped) width
    pub fn set_column_width(&mut self, field: &str, width: f64) -> Result<f64> {
        let applied = self
            .layout
            .set_width(field, width)
            .ok_or_else(|| GridError::UnknownField(field.to_string()))?;
        self.emit(GridEvent::LayoutChanged);
        Ok(applied)
    }

    /// Write the current visibility to the preference store
    pub fn persist_visibility(&mut self) -> Result<()> {
        let Some(prefs) = self.preferences.clone() else {
            debug!("No preference store; visibility not persisted");
            return Ok(());
        };
        let visible = Value::from(self.layout.visible_names());
        prefs
            .write_preference(&self.config.visibility_key, visible)
            .map_err(|e| GridError::Preference(e.to_string()))
    }

    fn restore_visibility(&mut self) {
        let Some(prefs) = self.preferences.clone() else {
            return;
        };
        let names = match prefs.read_preference(&self.config.visibility_key) {
            Ok(Some(value)) => match serde_json::from_value::<Vec<String>>(value) {
                Ok(names) => names,
                Err(e) => {
                    warn!("Ignoring stored column visibility: {e}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Could not read column visibility: {e}");
                Vec::new()
            }
        };
        self.layout.apply_visible_list(&names);
        self.emit(GridEvent::LayoutChanged);
    }

    // --- sort and row order ----------------------------------------------

    fn refresh_view(&mut self) {
        let order = self.sort.order(self.cache.records());
        self.cache.set_view(order);
    }

    /// Keep an active sort honest after values changed. If rows move, their
    /// positions are invalidated.
    fn resort_after_edit(&mut self) {
        if !self.sort.is_active() {
            return;
        }
        let order = self.sort.order(self.cache.records());
        if order.as_slice() == self.cache.view() {
            return;
        }
        self.cache.set_view(order);
        self.emit(GridEvent::RowsReordered);
        self.invalidate_positions();
    }

    /// Header click. Row positions change, so the selection is cleared.
    pub fn toggle_sort(&mut self, field: &str) -> Result<()> {
        if self.layout.field(field).is_none() {
            return Err(GridError::UnknownField(field.to_string()));
        }
        self.sort.toggle(field);
        self.refresh_view();
        self.emit(GridEvent::SortChanged);
        self.invalidate_positions();
        Ok(())
    }

    pub fn clear_sort(&mut self) {
        if !self.sort.is_active() {
            return;
        }
        self.sort.clear();
        self.refresh_view();
        self.emit(GridEvent::SortChanged);
        self.invalidate_positions();
    }

    /// Manual row drag. Drops any active sort and clears the selection.
    pub fn move_row(&mut self, from: usize, to: usize) -> bool {
        if from == to || !self.cache.move_row(from, to) {
            return false;
        }
        if self.sort.is_active() {
            self.sort.clear();
            self.emit(GridEvent::SortChanged);
        }
        self.emit(GridEvent::RowsReordered);
        self.invalidate_positions();
        true
    }

    // --- row check-boxes -------------------------------------------------

    pub fn toggle_row_checked(&mut self, id: RecordId) -> bool {
        let checked = self.cache.toggle_checked(id);
        self.emit(GridEvent::CheckedChanged);
        checked
    }

    // --- commands ---------------------------------------------------------

    /// Run a bound command
    pub async fn dispatch(&mut self, action: Action, port: &mut dyn ClipboardPort) -> Result<()> {
        debug!("Dispatching {action}");
        match action {
            Action::Copy => {
                self.copy_to(port);
            }
            Action::Paste => {
                self.paste_from(port);
            }
            Action::SaveAll => self.save_batch().await?,
            Action::DeleteChecked => self.delete_checked().await?,
            Action::InsertRow => self.insert_empty().await?,
            Action::ApplyFilters => self.apply_filters().await?,
            Action::ResetFilters => self.reset_filters().await?,
            Action::NextPage => {
                self.next_page().await?;
            }
            Action::PrevPage => {
                self.prev_page().await?;
            }
            Action::ExportCsv => {
                self.export_csv().await?;
            }
            Action::ClearSelection => self.clear_selection(),
            Action::CancelGesture => self.cancel_gesture(),
            Action::ShowAllColumns => self.set_all_visible(true),
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::core::models::Record;
    use crate::services::InMemoryStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Host that records notifications and answers confirms from a script
    #[derive(Default)]
    pub struct ScriptedHost {
        pub notes: Mutex<Vec<(String, NotifyKind)>>,
        pub prompts: Mutex<Vec<String>>,
        pub answers: Mutex<VecDeque<bool>>,
    }

    impl ScriptedHost {
        pub fn declining() -> Self {
            let host = Self::default();
            host.answers.lock().unwrap().push_back(false);
            host
        }

        pub fn last_note(&self) -> Option<(String, NotifyKind)> {
            self.notes.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl GridHost for ScriptedHost {
        async fn confirm(&self, message: &str) -> bool {
            self.prompts.lock().unwrap().push(message.to_string());
            self.answers.lock().unwrap().pop_front().unwrap_or(true)
        }

        fn notify(&self, message: &str, kind: NotifyKind) {
            self.notes.lock().unwrap().push((message.to_string(), kind));
        }
    }

    pub fn records() -> Vec<Record> {
        (1..=4)
            .map(|i| {
                Record::new(None)
                    .with("name", format!("n{i}"))
                    .with("qty", i * 10)
                    .with("note", "")
            })
            .collect()
    }

    pub fn config() -> GridConfig {
        let mut config = GridConfig::with_fields(&["id", "name", "qty", "note"]);
        config.read_only = vec!["id".to_string()];
        config.number_fields = vec!["qty".to_string()];
        config
    }

    pub async fn loaded() -> (DataGrid, Arc<InMemoryStore>, Arc<ScriptedHost>) {
        let store = Arc::new(InMemoryStore::with_records(records()));
        let host = Arc::new(ScriptedHost::default());
        let mut grid = DataGrid::new(config(), store.clone(), host.clone())
            .with_color_store(store.clone())
            .with_alias_store(store.clone());
        grid.fetch_page().await.unwrap();
        (grid, store, host)
    }
}
