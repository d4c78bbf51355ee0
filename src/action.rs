use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter};

/// Commands a host UI can invoke on the grid, typically bound to keys or toolbar buttons.
///
/// Pointer gestures are routed separately; these are the discrete commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum Action {
    /// Copy the selected cells to the clipboard as tab/newline text
    Copy,
    /// Paste clipboard text at the selection anchor
    Paste,
    /// Save every modified record after confirmation
    SaveAll,
    /// Delete every checked row after confirmation
    DeleteChecked,
    /// Insert an empty record and reload the page
    InsertRow,
    ApplyFilters,
    ResetFilters,
    NextPage,
    PrevPage,
    ExportCsv,
    ClearSelection,
    /// Abort the active pointer gesture without applying it
    CancelGesture,
    ShowAllColumns,
}

impl Action {
    /// Human-readable label for menus and help text
    pub fn friendly_name(&self) -> &'static str {
        match self {
            Action::Copy => "Copy",
            Action::Paste => "Paste",
            Action::SaveAll => "Save All",
            Action::DeleteChecked => "Delete Checked",
            Action::InsertRow => "Insert Row",
            Action::ApplyFilters => "Apply Filters",
            Action::ResetFilters => "Reset Filters",
            Action::NextPage => "Next Page",
            Action::PrevPage => "Prev Page",
            Action::ExportCsv => "Export CSV",
            Action::ClearSelection => "Clear Selection",
            Action::CancelGesture => "Cancel",
            Action::ShowAllColumns => "Show All Columns",
        }
    }
}

/// A key with modifiers, e.g. `ctrl-c` or `ctrl-shift-s`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub key: String,
}

impl KeyChord {
    pub fn new(key: &str) -> Self {
        Self {
            ctrl: false,
            alt: false,
            shift: false,
            key: key.to_ascii_lowercase(),
        }
    }

    pub fn ctrl(key: &str) -> Self {
        Self { ctrl: true, ..Self::new(key) }
    }
}

impl FromStr for KeyChord {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw_lower = raw.to_ascii_lowercase();
        let mut chord = KeyChord::new("");
        let mut current = raw_lower.as_str();

        loop {
            match current {
                rest if rest.starts_with("ctrl-") => {
                    chord.ctrl = true;
                    current = &rest[5..];
                }
                rest if rest.starts_with("cmd-") => {
                    chord.ctrl = true;
                    current = &rest[4..];
                }
                rest if rest.starts_with("alt-") => {
                    chord.alt = true;
                    current = &rest[4..];
                }
                rest if rest.starts_with("shift-") => {
                    chord.shift = true;
                    current = &rest[6..];
                }
                _ => break,
            }
        }

        let key = match current {
            "esc" | "enter" | "left" | "right" | "up" | "down" | "home" | "end" | "pageup"
            | "pagedown" | "backspace" | "delete" | "insert" | "tab" | "space" => current,
            f if f.len() >= 2 && f.starts_with('f') && f[1..].parse::<u8>().is_ok() => f,
            c if c.chars().count() == 1 => c,
            _ => return Err(format!("Unable to parse {raw}")),
        };
        chord.key = key.to_string();
        Ok(chord)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "ctrl-")?;
        }
        if self.alt {
            write!(f, "alt-")?;
        }
        if self.shift {
            write!(f, "shift-")?;
        }
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Copy.to_string(), "Copy");
        assert_eq!(Action::SaveAll.friendly_name(), "Save All");
        for action in Action::iter() {
            assert!(!action.friendly_name().is_empty());
        }
    }

    #[test]
    fn test_action_deserializes_from_name() {
        let a: Action = serde_json::from_str("\"Paste\"").unwrap();
        assert_eq!(a, Action::Paste);
    }

    #[test]
    fn test_simple_chords() {
        assert_eq!(KeyChord::from_str("a").unwrap(), KeyChord::new("a"));
        assert_eq!(KeyChord::from_str("enter").unwrap(), KeyChord::new("enter"));
        assert_eq!(KeyChord::from_str("f5").unwrap(), KeyChord::new("f5"));
    }

    #[test]
    fn test_chords_with_modifiers() {
        assert_eq!(KeyChord::from_str("ctrl-c").unwrap(), KeyChord::ctrl("c"));
        assert_eq!(KeyChord::from_str("CMD-v").unwrap(), KeyChord::ctrl("v"));
        let chord = KeyChord::from_str("ctrl-shift-s").unwrap();
        assert!(chord.ctrl && chord.shift && !chord.alt);
        assert_eq!(chord.key, "s");
        assert_eq!(chord.to_string(), "ctrl-shift-s");
    }

    #[test]
    fn test_invalid_chords() {
        assert!(KeyChord::from_str("invalid-key").is_err());
        assert!(KeyChord::from_str("ctrl-").is_err());
    }
}
