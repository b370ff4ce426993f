//! Source records and typed cell values

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::MAX_CELL_TEXT_LEN;
use crate::errors::SheetSyncError;

/// One source item: an ordered field-name → value mapping.
///
/// Values are kept as raw JSON so nested line items (e.g. invoice products)
/// survive until expansion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Builder-style insert, handy for fixtures.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Field rendered as trimmed, non-empty text.
    ///
    /// Numbers drop a trailing `.0` so `42` and `42.0` produce the same key.
    /// Missing, null, empty, array and object values yield `None`.
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).and_then(scalar_text)
    }

    /// Array field as records; non-object entries are dropped.
    pub fn records(&self, field: &str) -> Vec<Record> {
        match self.get(field) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_object().cloned().map(Record))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Copies every field of `other` over this record.
    pub fn merge(&mut self, other: Record) {
        for (field, value) in other.0 {
            self.0.insert(field, value);
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = SheetSyncError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SheetSyncError::InvalidInput(format!(
                "expected a JSON object record, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Renders a JSON scalar as key text.
pub fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => number_text(n),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    match n.as_f64() {
        Some(f) => decimal_text(f),
        None => n.to_string(),
    }
}

fn decimal_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Value written into one target cell.
///
/// Quantities keep their source numeric type; everything else is text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Integer(i64),
    Decimal(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    /// The blank cell written for null or missing sources.
    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    /// Text cell truncated to the target's cell limit.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(truncate_chars(value.into(), MAX_CELL_TEXT_LEN))
    }

    /// Type-preserving conversion from a source value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::empty(),
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Integer(i),
                (None, Some(f)) => Self::Decimal(f),
                (None, None) => Self::text(n.to_string()),
            },
            Value::String(s) => Self::text(s.as_str()),
            other => Self::text(other.to_string()),
        }
    }

    /// Same as [`CellValue::from_json`] but always produces text.
    pub fn text_from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::empty(),
            Value::String(s) => Self::text(s.as_str()),
            Value::Number(n) => Self::text(number_text(n)),
            other => Self::text(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }

    /// Canonical text used when the cell holds a business key.
    pub fn key_text(&self) -> Option<String> {
        let text = match self {
            Self::Integer(i) => i.to_string(),
            Self::Decimal(f) => decimal_text(*f),
            Self::Bool(b) => b.to_string(),
            Self::Text(s) => s.trim().to_string(),
        };
        (!text.is_empty()).then_some(text)
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Integer(i) => Value::from(*i),
            Self::Decimal(f) => Value::from(*f),
            Self::Bool(b) => Value::Bool(*b),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

fn truncate_chars(mut value: String, max: usize) -> String {
    if let Some((idx, _)) = value.char_indices().nth(max) {
        value.truncate(idx);
    }
    value
}
