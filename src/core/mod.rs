pub mod clipboard;
pub mod color;
pub mod fill;
pub mod filter;
pub mod layout;
pub mod models;
pub mod record_cache;
pub mod selection;
pub mod sort;
pub mod stats;
pub mod types;

pub use clipboard::{ClipboardPort, MemoryClipboard, SystemClipboard};
pub use color::{ColorMarks, Palette};
pub use fill::{FillDrag, FillOutcome};
pub use filter::{ExactFilterEditor, FilterState};
pub use layout::{ColumnLayout, Field, column_letter, column_letters};
pub use models::*;
pub use record_cache::RecordCache;
pub use selection::{CellRange, DragSelect, SelectionSet};
pub use sort::SortState;
pub use stats::SelectionStats;
pub use types::*;
