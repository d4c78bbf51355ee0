//! Count, sum and average over the selected cells

use crate::core::models::{format_number, numeric_value};
use crate::core::record_cache::RecordCache;
use crate::core::types::CellAddress;
use serde_json::Value;
use std::fmt;

/// Status-bar statistics over the selected cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionStats {
    pub count: usize,
    /// Present only when every selected value is numeric
    pub sum: Option<f64>,
    pub average: Option<f64>,
}

impl SelectionStats {
    pub fn compute(cells: &[CellAddress], cache: &RecordCache) -> Self {
        if cells.is_empty() {
            return Self::default();
        }
        let mut sum = 0.0;
        let mut numeric = 0usize;
        let mut all_numeric = true;
        for cell in cells {
            let value = cache.value(cell.row, &cell.field).unwrap_or(&Value::Null);
            match numeric_value(value) {
                Some(n) => {
                    sum += n;
                    numeric += 1;
                }
                None => all_numeric = false,
            }
        }
        if all_numeric && numeric > 0 {
            Self {
                count: cells.len(),
                sum: Some(sum),
                average: Some(sum / numeric as f64),
            }
        } else {
            Self {
                count: cells.len(),
                sum: None,
                average: None,
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn count_label(&self) -> String {
        if self.count == 0 {
            String::new()
        } else {
            format!("Count: {}", self.count)
        }
    }

    pub fn sum_label(&self) -> String {
        self.sum
            .map(|s| format!("Sum: {}", format_number(s)))
            .unwrap_or_default()
    }

    pub fn average_label(&self) -> String {
        self.average
            .map(|a| format!("Average: {a:.3}"))
            .unwrap_or_default()
    }
}

impl fmt::Display for SelectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [self.count_label(), self.sum_label(), self.average_label()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        write!(f, "{}", parts.join("  "))
    }
}
