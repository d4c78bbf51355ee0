//! Saving, deleting, copying and inserting records

use super::{DataGrid, GridEvent};
use crate::core::models::Record;
use crate::core::types::{NotifyKind, RecordId};
use crate::error::{GridError, Result};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::info;

impl DataGrid {
    /// Ask the host; a refusal becomes `Cancelled`
    async fn confirm(&self, prompt: &str) -> Result<()> {
        if self.host.confirm(prompt).await {
            Ok(())
        } else {
            let err = GridError::Cancelled;
            self.report(&err);
            Err(err)
        }
    }

    /// Save one record's current values and clear its modified flag
    pub async fn save_one(&mut self, id: RecordId) -> Result<()> {
        let Some(record) = self.cache.find(id).cloned() else {
            return Err(self.precondition("Record not found"));
        };
        self.confirm(&format!("Save changes to record {id}?")).await?;

        self.set_loading(true);
        let store = Arc::clone(&self.store);
        let result = store.save_record(&record).await;
        self.set_loading(false);

        match result {
            Ok(_) => {
                self.cache.clear_modified(id);
                self.emit(GridEvent::ModifiedChanged);
                self.notify("Record saved", NotifyKind::Success);
                Ok(())
            }
            Err(e) => {
                let err = GridError::from(e);
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Save every modified record concurrently.
    ///
    /// The modified set is cleared only when every save succeeds; after a
    /// partial failure it is left as it was.
    pub async fn save_batch(&mut self) -> Result<()> {
        let pending = self.cache.modified_records();
        if pending.is_empty() {
            return Err(self.precondition("Nothing to save"));
        }
        self.confirm(&format!("Save {} modified records?", pending.len()))
            .await?;

        self.set_loading(true);
        let store = Arc::clone(&self.store);
        let result = try_join_all(pending.iter().map(|r| store.save_record(r))).await;
        self.set_loading(false);

        match result {
            Ok(saved) => {
                info!("Batch saved {} records", saved.len());
                self.cache.clear_all_modified();
                self.emit(GridEvent::ModifiedChanged);
                self.notify(&format!("Saved {} records", saved.len()), NotifyKind::Success);
                Ok(())
            }
            Err(e) => {
                let err = GridError::from(e);
                self.report(&err);
                Err(err)
            }
        }
    }

    async fn delete_confirmed(&mut self, ids: Vec<RecordId>, prompt: &str) -> Result<()> {
        self.confirm(prompt).await?;

        self.set_loading(true);
        let store = Arc::clone(&self.store);
        let result = store.delete_records(&ids).await;
        self.set_loading(false);

        if let Err(e) = result {
            let err = GridError::from(e);
            self.report(&err);
            return Err(err);
        }
        let removed = self.cache.remove_ids(&ids);
        info!("Deleted {removed} rows from the page");
        self.emit(GridEvent::RowsRemoved(ids));
        self.emit(GridEvent::CheckedChanged);
        self.invalidate_positions();
        self.notify("Deleted", NotifyKind::Success);
        Ok(())
    }

    pub async fn delete_many(&mut self, ids: &[RecordId]) -> Result<()> {
        if ids.is_empty() {
            return Err(self.precondition("Select the rows to delete first"));
        }
        let prompt = format!("Delete {} rows? This cannot be undone", ids.len());
        self.delete_confirmed(ids.to_vec(), &prompt).await
    }

    pub async fn delete_one(&mut self, id: RecordId) -> Result<()> {
        self.delete_confirmed(vec![id], "Delete this record? This cannot be undone")
            .await
    }

    /// Delete every checked row
    pub async fn delete_checked(&mut self) -> Result<()> {
        let ids = self.cache.checked_ids();
        self.delete_many(&ids).await
    }

    /// Save `record` as new, then reload the page once the save has resolved
    async fn create_then_refetch(&mut self, record: Record, done: &str) -> Result<()> {
        self.set_loading(true);
        let store = Arc::clone(&self.store);
        let result = store.save_record(&record).await;
        if let Err(e) = result {
            self.set_loading(false);
            let err = GridError::from(e);
            self.report(&err);
            return Err(err);
        }
        self.fetch_page().await?;
        self.notify(done, NotifyKind::Success);
        Ok(())
    }

    /// Duplicate a record's fields as a new record
    pub async fn copy_record(&mut self, id: RecordId) -> Result<()> {
        let Some(copy) = self.cache.find(id).map(Record::duplicate) else {
            return Err(self.precondition("Record not found"));
        };
        self.create_then_refetch(copy, "Record copied").await
    }

    pub async fn insert_empty(&mut self) -> Result<()> {
        self.create_then_refetch(Record::new(None), "Row added").await
    }
}
