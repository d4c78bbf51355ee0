//! Page fetch, filters, pagination, export, color marks and aliases

use super::{DataGrid, GridEvent};
use crate::core::filter::ExactFilterEditor;
use crate::core::models::{ColorMarkWrite, RecordPage, RecordQuery, display_value};
use crate::core::types::{NotifyKind, RecordId};
use crate::error::{GridError, Result};
use futures::future::try_join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A CSV export ready for the host to save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    /// Suggested name, `export_<unix millis>.csv`
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DataGrid {
    /// Restore aliases and column visibility, then load the first page
    pub async fn init(&mut self) -> Result<()> {
        self.load_aliases().await;
        self.restore_visibility();
        self.fetch_page().await
    }

    /// The query the next fetch will send
    pub fn query(&self) -> RecordQuery {
        RecordQuery {
            page: self.cache.page(),
            page_size: self.cache.page_size(),
            filters: self.filters.payload(&self.layout.all_names()),
        }
    }

    /// Reload the current page with the current filters
    ///
    /// Replaces the page wholesale: unsaved edits are dropped, the selection is
    /// cleared, the sort is re-applied and color marks are rebuilt.
    pub async fn fetch_page(&mut self) -> Result<()> {
        let query = self.query();
        self.set_loading(true);
        let store = Arc::clone(&self.store);
        let result = store.query_records(&query).await;

        let outcome = match result {
            Ok(page) => {
                self.install_page(page);
                self.refresh_color_marks().await;
                Ok(())
            }
            Err(e) => Err(GridError::from(e)),
        };
        self.set_loading(false);
        if let Err(err) = &outcome {
            self.report(err);
        }
        outcome
    }

    fn install_page(&mut self, page: RecordPage) {
        let total = page.total;
        debug!("Loaded {} records of {total}", page.records.len());
        self.cache.replace(page);
        self.refresh_view();
        self.emit(GridEvent::RecordsReplaced { total });
        self.emit(GridEvent::ModifiedChanged);
        self.invalidate_positions();
    }

    /// Rebuild the color table from the store. Failures are logged only.
    pub async fn refresh_color_marks(&mut self) {
        let Some(colors) = self.color_store.clone() else {
            return;
        };
        match colors.read_color_marks().await {
            Ok(rows) => {
                let skipped = self.colors.rebuild(&rows, &self.palette);
                if skipped > 0 {
                    debug!("Skipped {skipped} color mark rows");
                }
                self.emit(GridEvent::ColorsChanged);
            }
            Err(e) => error!("Color mark query failed: {e}"),
        }
    }

    // --- filters ---------------------------------------------------------

    pub fn set_exact_filter(&mut self, field: &str, values: Vec<String>) {
        self.filters.set_exact(field, values);
        self.emit(GridEvent::FiltersChanged);
    }

    /// Set a substring filter. Takes effect on the next fetch.
    pub fn set_fuzzy_filter(&mut self, field: &str, pattern: &str) {
        self.filters.set_fuzzy(field, pattern);
        self.emit(GridEvent::FiltersChanged);
    }

    pub async fn apply_filters(&mut self) -> Result<()> {
        self.fetch_page().await
    }

    pub async fn reset_filters(&mut self) -> Result<()> {
        self.filters.clear();
        self.emit(GridEvent::FiltersChanged);
        self.fetch_page().await
    }

    /// Distinct values of a field on the loaded page, as shown
    pub fn unique_values(&self, field: &str) -> Vec<String> {
        self.cache
            .unique_values(field)
            .iter()
            .map(display_value)
            .collect()
    }

    /// Start editing a field's exact filter; returns the values to pick from
    pub fn open_exact_filter(&mut self, field: &str) -> Result<Vec<String>> {
        if self.layout.field(field).is_none() {
            return Err(GridError::UnknownField(field.to_string()));
        }
        self.exact_editor = Some(ExactFilterEditor::open(field, &self.filters));
        Ok(self.unique_values(field))
    }

    pub fn exact_editor(&self) -> Option<&ExactFilterEditor> {
        self.exact_editor.as_ref()
    }

    /// Tick or untick a candidate; `None` when no editor is open
    pub fn toggle_exact_candidate(&mut self, value: &str) -> Option<bool> {
        self.exact_editor.as_mut().map(|e| e.toggle(value))
    }

    pub fn cancel_exact_filter(&mut self) {
        self.exact_editor = None;
    }

    /// Commit the open editor and reload
    pub async fn confirm_exact_filter(&mut self) -> Result<()> {
        let Some(editor) = self.exact_editor.take() else {
            return Ok(());
        };
        editor.commit(&mut self.filters);
        self.emit(GridEvent::FiltersChanged);
        self.fetch_page().await
    }

    pub async fn remove_exact_filter_value(&mut self, field: &str, value: &str) -> Result<()> {
        if self.filters.remove_exact_value(field, value) {
            self.emit(GridEvent::FiltersChanged);
        }
        self.fetch_page().await
    }

    // --- pagination ------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.cache.page_count()
    }

    pub async fn set_page(&mut self, page: usize) -> Result<()> {
        self.cache.set_page(page);
        self.fetch_page().await
    }

    /// Returns false when already on the last page
    pub async fn next_page(&mut self) -> Result<bool> {
        let page = self.cache.page();
        if page >= self.page_count() {
            return Ok(false);
        }
        self.set_page(page + 1).await?;
        Ok(true)
    }

    /// Returns false when already on the first page
    pub async fn prev_page(&mut self) -> Result<bool> {
        let page = self.cache.page();
        if page <= 1 {
            return Ok(false);
        }
        self.set_page(page - 1).await?;
        Ok(true)
    }

    /// Change the page size and go back to the first page
    pub async fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        self.cache.set_page_size(page_size);
        self.cache.set_page(1);
        self.fetch_page().await
    }

    // --- export ----------------------------------------------------------

    /// Export every record matching the current filters
    pub async fn export_csv(&mut self) -> Result<CsvExport> {
        let filters = self.filters.payload(&self.layout.all_names());
        self.set_loading(true);
        let store = Arc::clone(&self.store);
        let result = store.export_csv(&filters).await;
        self.set_loading(false);

        match result {
            Ok(bytes) => {
                let export = CsvExport {
                    file_name: format!("export_{}.csv", chrono::Utc::now().timestamp_millis()),
                    bytes,
                };
                info!("Exported {} bytes as {}", export.bytes.len(), export.file_name);
                self.emit(GridEvent::ExportReady(export.clone()));
                Ok(export)
            }
            Err(e) => {
                let err = GridError::from(e);
                self.report(&err);
                Err(err)
            }
        }
    }

    // --- color marks -----------------------------------------------------

    /// Color every selected cell with a palette entry
    ///
    /// The local table is updated first; one write per cell then goes out
    /// concurrently. If any write fails, exactly the entries set here are
    /// removed again.
    pub async fn apply_fill_color(&mut self, color_name: &str) -> Result<()> {
        if self.selection.is_empty() {
            return Err(self.precondition("Select the cells to fill first"));
        }
        let Some(hex) = self.palette.hex_for(color_name).map(str::to_string) else {
            return Err(self.precondition(&format!("Unknown color {color_name}")));
        };

        let mut targets: Vec<(RecordId, String)> = Vec::new();
        for cell in self.selection.cells() {
            match self.cache.row(cell.row).and_then(|r| r.id) {
                Some(id) => targets.push((id, cell.field.clone())),
                None => debug!("Cell {cell} has no record id; not colored"),
            }
        }
        let applied = self.colors.apply(&targets, &hex);
        self.emit(GridEvent::ColorsChanged);

        let Some(colors) = self.color_store.clone() else {
            debug!("No color store; {} marks kept locally", applied.len());
            return Ok(());
        };
        let writes: Vec<ColorMarkWrite> = applied
            .iter()
            .map(|m| ColorMarkWrite::new(m.id, &m.field, color_name))
            .collect();

        self.set_loading(true);
        let result = try_join_all(writes.iter().map(|w| colors.write_color_mark(w))).await;
        self.set_loading(false);

        match result {
            Ok(_) => {
                self.notify("Colors saved", NotifyKind::Success);
                Ok(())
            }
            Err(source) => {
                self.colors.rollback(&applied);
                self.emit(GridEvent::ColorsChanged);
                let err = GridError::OptimisticWrite {
                    rolled_back: applied.len(),
                    source,
                };
                self.report(&err);
                Err(err)
            }
        }
    }

    // --- aliases ---------------------------------------------------------

    /// Load the newest alias set. Failures are logged and leave aliases as they were.
    pub async fn load_aliases(&mut self) {
        let Some(aliases) = self.alias_store.clone() else {
            return;
        };
        let rows = match aliases.read_alias_set().await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Loading column aliases failed: {e}");
                return;
            }
        };
        let Some(latest) = rows.first() else {
            return;
        };
        match latest.payload() {
            Ok(map) => {
                self.layout.set_aliases(map.into_iter().collect());
                self.emit(GridEvent::LayoutChanged);
            }
            Err(e) => warn!("Ignoring unparsable alias set: {e}"),
        }
    }

    /// Current aliases of the editable alias fields, blank where unset
    pub fn alias_form(&self) -> BTreeMap<String, String> {
        self.config
            .alias_fields
            .iter()
            .map(|f| {
                let current = self.layout.aliases().get(f).cloned().unwrap_or_default();
                (f.clone(), current)
            })
            .collect()
    }

    /// Persist column visibility, then save the non-blank aliases from `form`
    pub async fn save_fields_and_aliases(&mut self, form: &BTreeMap<String, String>) -> Result<()> {
        if let Err(err) = self.persist_visibility() {
            self.report(&err);
            return Err(err);
        }

        let aliases: BTreeMap<String, String> = form
            .iter()
            .filter(|(field, _)| self.config.alias_fields.contains(*field))
            .map(|(field, alias)| (field.clone(), alias.trim().to_string()))
            .filter(|(_, alias)| !alias.is_empty())
            .collect();
        if aliases.is_empty() {
            self.notify(
                "No aliases entered; only column visibility was saved",
                NotifyKind::Info,
            );
            return Ok(());
        }

        if let Some(store) = self.alias_store.clone() {
            self.set_loading(true);
            let result = store.save_alias_set(&aliases).await;
            self.set_loading(false);
            if let Err(e) = result {
                let err = GridError::from(e);
                self.report(&err);
                return Err(err);
            }
        }
        let map: HashMap<String, String> = aliases.into_iter().collect();
        self.layout.set_aliases(map);
        self.emit(GridEvent::LayoutChanged);
        self.notify("Column aliases saved", NotifyKind::Success);
        Ok(())
    }
}
