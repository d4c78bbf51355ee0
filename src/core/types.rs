use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::Display as SDisplay;

/// Store-assigned identifier of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| format!("Invalid record id '{s}': {e}"))
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Address of one cell: display row position within the loaded page plus field id.
///
/// Row positions go stale on reorder, sort, delete and refetch; the grid clears
/// its selection on each of those.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    pub row: usize,
    pub field: String,
}

impl CellAddress {
    pub fn new(row: usize, field: impl Into<String>) -> Self {
        Self { row, field: field.into() }
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.field)
    }
}

/// Kind of a user-visible notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SDisplay, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum NotifyKind {
    Success,
    Info,
    Error,
}

/// Sort direction for the client-side page sort
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, SDisplay, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Keyboard modifiers held during a pointer press
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    /// Ctrl on most platforms, Cmd on macOS
    pub multi: bool,
}

impl Modifiers {
    pub const NONE: Self = Self { shift: false, multi: false };
    pub const SHIFT: Self = Self { shift: true, multi: false };
    pub const MULTI: Self = Self { shift: false, multi: true };
}

/// Pointer position in the rendering layer's coordinate space
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel bounds, as reported by the rendering layer
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl PixelRect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        PixelRect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}
