//! In-process record, color-mark and alias store
//!
//! Backs the demo binary and the test suite. Behaves like the remote service:
//! assigns ids on first save, filters by exact lists and `__like` patterns,
//! paginates, and can be told to fail specific calls.

use crate::core::filter::LIKE_SUFFIX;
use crate::core::models::{ColorMarkWrite, ID_FIELD, OperationRow, Record, RecordPage, RecordQuery};
use crate::core::types::RecordId;
use crate::error::StoreError;
use crate::services::{AliasStore, ColorMarkStore, RecordStore};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use strum::{Display, EnumIter};
use tokio::sync::Mutex;
use tracing::debug;

/// Store operations, for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum StoreCall {
    Query,
    Save,
    Delete,
    Export,
    WriteColor,
    ReadColors,
    SaveAliases,
    ReadAliases,
}

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<Record>,
    next_id: i64,
    columns: Vec<String>,
    color_rows: Vec<OperationRow>,
    alias_rows: Vec<OperationRow>,
    calls: HashMap<StoreCall, usize>,
    failing: HashMap<StoreCall, String>,
    failing_saves: HashSet<RecordId>,
}

impl StoreState {
    fn enter(&mut self, call: StoreCall) -> Result<(), StoreError> {
        *self.calls.entry(call).or_default() += 1;
        match self.failing.get(&call) {
            Some(message) => Err(StoreError::remote(message.clone())),
            None => Ok(()),
        }
    }

    fn matching(&self, filters: &BTreeMap<String, String>) -> Vec<Record> {
        self.records
            .iter()
            .filter(|r| filters.iter().all(|(key, wanted)| matches_filter(r, key, wanted)))
            .cloned()
            .collect()
    }
}

fn matches_filter(record: &Record, key: &str, wanted: &str) -> bool {
    if let Some(field) = key.strip_suffix(LIKE_SUFFIX) {
        return record.display(field).contains(wanted);
    }
    let actual = record.display(key);
    wanted.split(',').any(|v| v == actual)
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with records. Records without an id get one assigned.
    pub fn with_records(records: Vec<Record>) -> Self {
        let mut state = StoreState {
            next_id: records.iter().filter_map(|r| r.id).map(|id| id.get()).max().unwrap_or(0),
            ..StoreState::default()
        };
        for mut record in records {
            if record.id.is_none() {
                state.next_id += 1;
                record.set_id(Some(RecordId(state.next_id)));
            }
            state.records.push(record);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Column order used for CSV export; defaults to first-seen field order
    pub async fn set_columns(&self, columns: Vec<String>) {
        self.state.lock().await.columns = columns;
    }

    pub async fn seed_color_rows(&self, rows: Vec<OperationRow>) {
        self.state.lock().await.color_rows = rows;
    }

    pub async fn seed_alias_rows(&self, rows: Vec<OperationRow>) {
        self.state.lock().await.alias_rows = rows;
    }

    /// Make every subsequent `call` fail with `message`
    pub async fn fail(&self, call: StoreCall, message: &str) {
        self.state.lock().await.failing.insert(call, message.to_string());
    }

    /// Make saves of one particular record fail
    pub async fn fail_save_of(&self, id: RecordId) {
        self.state.lock().await.failing_saves.insert(id);
    }

    pub async fn recover(&self) {
        let mut state = self.state.lock().await;
        state.failing.clear();
        state.failing_saves.clear();
    }

    pub async fn calls(&self, call: StoreCall) -> usize {
        self.state.lock().await.calls.get(&call).copied().unwrap_or(0)
    }

    pub async fn records(&self) -> Vec<Record> {
        self.state.lock().await.records.clone()
    }

    pub async fn record(&self, id: RecordId) -> Option<Record> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .find(|r| r.id == Some(id))
            .cloned()
    }

    pub async fn color_rows(&self) -> Vec<OperationRow> {
        self.state.lock().await.color_rows.clone()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn query_records(&self, query: &RecordQuery) -> Result<RecordPage, StoreError> {
        let mut state = self.state.lock().await;
        state.enter(StoreCall::Query)?;
        let matching = state.matching(&query.filters);
        let total = matching.len();
        let size = query.page_size.max(1);
        let records: Vec<Record> = matching
            .into_iter()
            .skip(query.page.saturating_sub(1) * size)
            .take(size)
            .collect();
        debug!("Query page {} returned {} of {total}", query.page, records.len());
        Ok(RecordPage { records, total })
    }

    async fn save_record(&self, record: &Record) -> Result<Record, StoreError> {
        let mut state = self.state.lock().await;
        state.enter(StoreCall::Save)?;
        if let Some(id) = record.id {
            if state.failing_saves.contains(&id) {
                return Err(StoreError::remote(format!("Could not save record {id}")));
            }
            if let Some(existing) = state.records.iter_mut().find(|r| r.id == Some(id)) {
                *existing = record.clone();
                return Ok(record.clone());
            }
            state.next_id = state.next_id.max(id.get());
            state.records.push(record.clone());
            return Ok(record.clone());
        }
        state.next_id += 1;
        let mut saved = record.clone();
        saved.set_id(Some(RecordId(state.next_id)));
        state.records.push(saved.clone());
        Ok(saved)
    }

    async fn delete_records(&self, ids: &[RecordId]) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.enter(StoreCall::Delete)?;
        state
            .records
            .retain(|r| !r.id.is_some_and(|id| ids.contains(&id)));
        Ok(())
    }

    async fn export_csv(&self, filters: &BTreeMap<String, String>) -> Result<Vec<u8>, StoreError> {
        let mut state = self.state.lock().await;
        state.enter(StoreCall::Export)?;
        let rows = state.matching(filters);

        let mut columns = state.columns.clone();
        if columns.is_empty() {
            columns.push(ID_FIELD.to_string());
            for record in &rows {
                for key in record.fields.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        let to_store_err = |e: csv::Error| StoreError::Transport(e.to_string());
        writer.write_record(&columns).map_err(to_store_err)?;
        for record in &rows {
            let line: Vec<String> = columns.iter().map(|c| record.display(c)).collect();
            writer.write_record(&line).map_err(to_store_err)?;
        }
        writer
            .into_inner()
            .map_err(|e| StoreError::Transport(e.to_string()))
    }
}

#[async_trait]
impl ColorMarkStore for InMemoryStore {
    async fn write_color_mark(&self, mark: &ColorMarkWrite) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.enter(StoreCall::WriteColor)?;
        let incoming: BTreeMap<String, Value> = serde_json::from_str(&mark.operation_result)?;

        // one row per record; later writes merge over earlier fields
        match state
            .color_rows
            .iter_mut()
            .find(|r| r.business_id == mark.business_id)
        {
            Some(row) => {
                let mut merged: BTreeMap<String, Value> = match &row.operation_result {
                    Value::String(raw) => serde_json::from_str(raw).unwrap_or_default(),
                    other => serde_json::from_value(other.clone()).unwrap_or_default(),
                };
                merged.extend(incoming);
                row.operation_result = Value::String(serde_json::to_string(&merged)?);
                row.column_key = Some(mark.column_key.clone());
            }
            None => state.color_rows.push(OperationRow {
                business_id: mark.business_id.clone(),
                column_key: Some(mark.column_key.clone()),
                operation_result: Value::String(mark.operation_result.clone()),
            }),
        }
        Ok(())
    }

    async fn read_color_marks(&self) -> Result<Vec<OperationRow>, StoreError> {
        let mut state = self.state.lock().await;
        state.enter(StoreCall::ReadColors)?;
        Ok(state.color_rows.clone())
    }
}

#[async_trait]
impl AliasStore for InMemoryStore {
    async fn save_alias_set(&self, aliases: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.enter(StoreCall::SaveAliases)?;
        let row = OperationRow {
            business_id: String::new(),
            column_key: None,
            operation_result: Value::String(serde_json::to_string(aliases)?),
        };
        state.alias_rows.insert(0, row);
        Ok(())
    }

    async fn read_alias_set(&self) -> Result<Vec<OperationRow>, StoreError> {
        let mut state = self.state.lock().await;
        state.enter(StoreCall::ReadAliases)?;
        Ok(state.alias_rows.clone())
    }
}
