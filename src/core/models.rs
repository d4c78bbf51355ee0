//! Records and the payloads exchanged with the stores

use crate::core::types::RecordId;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field under which the record id is also readable as a cell value
pub const ID_FIELD: &str = "id";

/// One row of the grid as held by the record store
///
/// `id` is `None` until the store assigns one on first save. Field values are
/// kept as raw JSON so numbers, strings and nulls round-trip to the store unchanged.
/// The id is mirrored into `fields` under `"id"` so it can be shown as a column;
/// on the wire it appears once.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "WireRecord")]
pub struct Record {
    pub id: Option<RecordId>,
    pub fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct WireRecord {
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl From<WireRecord> for Record {
    fn from(wire: WireRecord) -> Self {
        let mut record = Record {
            id: None,
            fields: wire.fields,
        };
        record.set_id(wire.id);
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = self.fields.keys().filter(|k| k.as_str() != ID_FIELD).count();
        let mut map = serializer.serialize_map(Some(extra + 1))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (k, v) in self.fields.iter().filter(|(k, _)| k.as_str() != ID_FIELD) {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Record {
    pub fn new(id: Option<RecordId>) -> Self {
        let mut record = Self { id: None, fields: Map::new() };
        record.set_id(id);
        record
    }

    /// Set or clear the id, keeping the `"id"` field in step
    pub fn set_id(&mut self, id: Option<RecordId>) {
        self.id = id;
        match id {
            Some(id) => {
                self.fields.insert(ID_FIELD.to_string(), Value::from(id.get()));
            }
            None => {
                self.fields.remove(ID_FIELD);
            }
        }
    }

    /// Builder-style field setter, mostly for tests and fixtures
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }

    /// Display string of a field; absent and null read as empty
    pub fn display(&self, field: &str) -> String {
        self.get(field).map(display_value).unwrap_or_default()
    }

    /// Copy of this record with the identifier dropped, ready to be saved as new
    pub fn duplicate(&self) -> Record {
        let mut copy = self.clone();
        copy.set_id(None);
        copy
    }
}

/// Render a cell value the way it is shown and copied
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Numeric reading of a cell value, if it has one
///
/// Numbers are taken as-is; strings must parse as a finite-or-infinite float
/// after trimming. Empty strings, nulls and NaN are not numeric.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Format a float without a trailing `.0` for integral values
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Request payload for one page of records
///
/// Serializes flat: `{"page": 1, "limit": 500, "<field>": "...", "<field>__like": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQuery {
    pub page: usize,
    #[serde(rename = "limit")]
    pub page_size: usize,
    #[serde(flatten)]
    pub filters: BTreeMap<String, String>,
}

/// One page of records plus the authoritative total
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub total: usize,
}

/// One persisted annotation row as returned by the color-mark and alias queries
///
/// `operation_result` holds a JSON object, either inline or encoded as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRow {
    #[serde(default)]
    pub business_id: String,
    #[serde(default)]
    pub column_key: Option<String>,
    #[serde(default)]
    pub operation_result: Value,
}

impl OperationRow {
    /// Decode `operation_result` into a field → string map
    pub fn payload(&self) -> Result<BTreeMap<String, String>, serde_json::Error> {
        let object = match &self.operation_result {
            Value::String(raw) => serde_json::from_str::<Value>(raw)?,
            other => other.clone(),
        };
        let map: BTreeMap<String, Value> = serde_json::from_value(object)?;
        Ok(map
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect())
    }
}

/// Request payload for one color-mark write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorMarkWrite {
    pub business_id: String,
    pub column_key: String,
    pub operation_result: String,
}

impl ColorMarkWrite {
    pub fn new(id: RecordId, field: &str, color_name: &str) -> Self {
        let mut payload = Map::new();
        payload.insert(field.to_string(), Value::String(color_name.to_string()));
        Self {
            business_id: id.to_string(),
            column_key: field.to_string(),
            operation_result: Value::Object(payload).to_string(),
        }
    }
}
