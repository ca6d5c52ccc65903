use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A single cell value read out of a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Null,
}

impl DataValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// Text used by search and text filters.
    ///
    /// Nulls become the empty string and dates use the canonical
    /// `YYYY-MM-DDTHH:MM:SS.mmmZ` form.
    pub fn to_search_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::String(s) => write!(f, "{}", s),
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Boolean(b) => write!(f, "{}", b),
            DataValue::DateTime(dt) => {
                write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            DataValue::Null => write!(f, ""),
        }
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::String(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::String(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Integer(value)
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        DataValue::Float(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for DataValue {
    fn from(value: DateTime<Utc>) -> Self {
        DataValue::DateTime(value)
    }
}

impl<T: Into<DataValue>> From<Option<T>> for DataValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DataValue::Null)
    }
}

impl From<&JsonValue> for DataValue {
    fn from(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => DataValue::Null,
            JsonValue::Bool(b) => DataValue::Boolean(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DataValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    DataValue::Float(f)
                } else {
                    DataValue::String(n.to_string())
                }
            }
            JsonValue::String(s) => DataValue::String(s.clone()),
            // Nested values are searched as their JSON text
            JsonValue::Array(_) | JsonValue::Object(_) => DataValue::String(json.to_string()),
        }
    }
}

/// Read access to named fields of a row.
///
/// This is the capability a row type must offer for columns that read by
/// field name (an explicit field reference, or the column key itself).
/// Returning `None` means the field does not exist on this row, which the
/// view treats the same as a null value.
pub trait FieldAccess {
    fn field(&self, name: &str) -> Option<DataValue>;
}

impl FieldAccess for JsonValue {
    fn field(&self, name: &str) -> Option<DataValue> {
        self.as_object()?.get(name).map(DataValue::from)
    }
}

impl FieldAccess for serde_json::Map<String, JsonValue> {
    fn field(&self, name: &str) -> Option<DataValue> {
        self.get(name).map(DataValue::from)
    }
}

impl FieldAccess for HashMap<String, DataValue> {
    fn field(&self, name: &str) -> Option<DataValue> {
        self.get(name).cloned()
    }
}

impl FieldAccess for BTreeMap<String, DataValue> {
    fn field(&self, name: &str) -> Option<DataValue> {
        self.get(name).cloned()
    }
}

/// A row of named values in insertion order, as produced by the file loaders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, DataValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an existing value with the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<DataValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&DataValue> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldAccess for Record {
    fn field(&self, name: &str) -> Option<DataValue> {
        self.get(name).cloned()
    }
}
