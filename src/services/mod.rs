//! Collaborators the grid talks to
//!
//! The grid never performs transport, rendering, or persistence itself: each of
//! those is reached through one of these traits. Async ones are object-safe via
//! `async_trait` so hosts can hand in `Arc<dyn ...>`.

pub mod memory_store;
pub mod preferences;

use crate::core::models::{ColorMarkWrite, OperationRow, Record, RecordPage, RecordQuery};
use crate::core::types::{NotifyKind, RecordId};
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

pub use memory_store::{InMemoryStore, StoreCall};
pub use preferences::{FilePreferences, MemoryPreferences};

/// The remote record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// One page of records matching the filter payload, plus the total count
    async fn query_records(&self, query: &RecordQuery) -> Result<RecordPage, StoreError>;

    /// Create (no id) or update (with id) a record; returns the stored form
    async fn save_record(&self, record: &Record) -> Result<Record, StoreError>;

    async fn delete_records(&self, ids: &[RecordId]) -> Result<(), StoreError>;

    /// CSV bytes for every record matching the filter payload
    async fn export_csv(&self, filters: &BTreeMap<String, String>) -> Result<Vec<u8>, StoreError>;
}

/// Optional persistence for color marks
#[async_trait]
pub trait ColorMarkStore: Send + Sync {
    async fn write_color_mark(&self, mark: &ColorMarkWrite) -> Result<(), StoreError>;

    async fn read_color_marks(&self) -> Result<Vec<OperationRow>, StoreError>;
}

/// Optional persistence for column aliases
#[async_trait]
pub trait AliasStore: Send + Sync {
    async fn save_alias_set(&self, aliases: &BTreeMap<String, String>) -> Result<(), StoreError>;

    /// Saved alias sets, newest first
    async fn read_alias_set(&self) -> Result<Vec<OperationRow>, StoreError>;
}

/// Key-value store for UI preferences that outlive a session
pub trait PreferenceStore: Send + Sync {
    fn read_preference(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn write_preference(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// The UI hosting the grid: confirmation dialogs and toasts
#[async_trait]
pub trait GridHost: Send + Sync {
    /// Ask the user to confirm a destructive or batch action
    async fn confirm(&self, message: &str) -> bool;

    /// Fire-and-forget feedback
    fn notify(&self, message: &str, kind: NotifyKind);
}

/// Host for headless use: confirms everything and logs notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHost;

#[async_trait]
impl GridHost for LoggingHost {
    async fn confirm(&self, message: &str) -> bool {
        tracing::info!("Auto-confirming: {message}");
        true
    }

    fn notify(&self, message: &str, kind: NotifyKind) {
        match kind {
            NotifyKind::Error => tracing::error!("{message}"),
            _ => tracing::info!("[{kind}] {message}"),
        }
    }
}
