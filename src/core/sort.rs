//! Client-side sort over the loaded page

use crate::core::models::{Record, display_value, parse_number};
use crate::core::types::SortDirection;
use serde_json::Value;
use std::cmp::Ordering;

/// Current sort column and direction; `field == None` means fetch order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    pub field: Option<String>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn is_active(&self) -> bool {
        self.field.is_some()
    }

    /// Header click: same field flips direction, a new field starts ascending
    pub fn toggle(&mut self, field: &str) {
        if self.field.as_deref() == Some(field) {
            self.direction = self.direction.flipped();
        } else {
            self.field = Some(field.to_string());
            self.direction = SortDirection::Asc;
        }
    }

    pub fn clear(&mut self) {
        self.field = None;
        self.direction = SortDirection::Asc;
    }

    /// Display order over `records`: indices into the slice
    pub fn order(&self, records: &[Record]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..records.len()).collect();
        if let Some(field) = &self.field {
            let direction = self.direction;
            order.sort_by(|&a, &b| {
                let ord = compare_values(records[a].get(field), records[b].get(field));
                match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        order
    }
}

/// Numeric comparison when both sides parse as numbers, string comparison otherwise.
/// Absent and null values compare as the empty string.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a_str = a.map(display_value).unwrap_or_default();
    let b_str = b.map(display_value).unwrap_or_default();
    match (parse_number(&a_str), parse_number(&b_str)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a_str.cmp(&b_str),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RecordId;
    use pretty_assertions::assert_eq;

    fn ids(records: &[Record], order: &[usize]) -> Vec<i64> {
        order
            .iter()
            .map(|&i| records[i].id.map(|id| id.get()).unwrap_or(-1))
            .collect()
    }

    #[test]
    fn test_numeric_strings_sort_numerically() {
        let records = vec![
            Record::new(Some(RecordId(1))).with("a", "10"),
            Record::new(Some(RecordId(2))).with("a", "2"),
        ];
        let mut sort = SortState::default();
        sort.toggle("a");
        assert_eq!(ids(&records, &sort.order(&records)), vec![2, 1]);
        sort.toggle("a");
        assert_eq!(sort.direction, SortDirection::Desc);
        assert_eq!(ids(&records, &sort.order(&records)), vec![1, 2]);
    }

    #[test]
    fn test_mixed_values_fall_back_to_strings() {
        let records = vec![
            Record::new(Some(RecordId(1))).with("a", "pear"),
            Record::new(Some(RecordId(2))).with("a", 3),
            Record::new(Some(RecordId(3))),
            Record::new(Some(RecordId(4))).with("a", "apple"),
        ];
        let mut sort = SortState::default();
        sort.toggle("a");
        // "" < "3" < "apple" < "pear"
        assert_eq!(ids(&records, &sort.order(&records)), vec![3, 2, 4, 1]);
    }

    #[test]
    fn test_descending_reverses_untied_and_keeps_ties_stable() {
        let records = vec![
            Record::new(Some(RecordId(1))).with("a", 5),
            Record::new(Some(RecordId(2))).with("a", 1),
            Record::new(Some(RecordId(3))).with("a", 5),
            Record::new(Some(RecordId(4))).with("a", 9),
        ];
        let mut sort = SortState::default();
        sort.toggle("a");
        assert_eq!(ids(&records, &sort.order(&records)), vec![2, 1, 3, 4]);
        sort.toggle("a");
        assert_eq!(ids(&records, &sort.order(&records)), vec![4, 1, 3, 2]);
    }

    #[test]
    fn test_new_field_resets_direction() {
        let mut sort = SortState::default();
        sort.toggle("a");
        sort.toggle("a");
        sort.toggle("b");
        assert_eq!(sort.field.as_deref(), Some("b"));
        assert_eq!(sort.direction, SortDirection::Asc);
        sort.clear();
        assert!(!sort.is_active());
    }

    #[test]
    fn test_no_sort_is_identity() {
        let records = vec![Record::default(), Record::default(), Record::default()];
        assert_eq!(SortState::default().order(&records), vec![0, 1, 2]);
    }
}
