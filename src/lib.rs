pub mod action;
pub mod config;
pub mod core;
pub mod error;
pub mod grid;
pub mod logging;
pub mod services;

// Re-export commonly used types
pub use action::{Action, KeyChord};
pub use config::{Config, GridConfig};
pub use core::{CellAddress, ClipboardPort, Modifiers, PixelRect, Point, Record, RecordId};
pub use error::{GridError, StoreError};
pub use grid::{CellLocator, CsvExport, DataGrid, GridEvent};
pub use services::{AliasStore, ColorMarkStore, GridHost, PreferenceStore, RecordStore};
