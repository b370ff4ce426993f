//! Column mappings from source records to target cells
//!
//! A [`FieldMapping`] is a static list of [`ColumnRule`]s. Each rule names a
//! target column and where its value comes from. Columns the target sheet
//! does not have are skipped and reported back to the caller; columns the
//! mapping does not mention are never written.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use sheetsync_domain::constants::SYNC_TIMESTAMP_FORMAT;
use sheetsync_domain::{BusinessKey, Cell, CellValue, Record};

use super::column_map::ColumnMap;

/// Run-wide values available to every rule.
#[derive(Debug, Clone)]
pub struct MappingContext {
    pub timezone: Tz,
    pub synced_at: DateTime<Utc>,
    pub warehouse_id: Option<String>,
}

impl MappingContext {
    pub fn new(timezone: Tz, synced_at: DateTime<Utc>) -> Self {
        Self { timezone, synced_at, warehouse_id: None }
    }

    /// Sync time as local `YYYY-MM-DD HH:MM`.
    pub fn timestamp_text(&self) -> String {
        self.synced_at.with_timezone(&self.timezone).format(SYNC_TIMESTAMP_FORMAT).to_string()
    }
}

/// Everything a rule may read while rendering one target row.
#[derive(Debug, Clone, Copy)]
pub struct RowSource<'a> {
    pub record: &'a Record,
    /// Line item when the record was expanded.
    pub item: Option<&'a Record>,
    pub key: &'a BusinessKey,
    pub context: &'a MappingContext,
}

impl RowSource<'_> {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.record.get(name).filter(|value| !value.is_null())
    }
}

pub type DeriveFn = fn(&RowSource<'_>) -> CellValue;

/// Where a column's value comes from.
#[derive(Clone, Copy)]
pub enum FieldSource {
    /// Source field, numeric and boolean types preserved.
    Field(&'static str),
    /// Source field forced to text.
    Text(&'static str),
    /// First field holding a non-empty value.
    FirstOf(&'static [&'static str]),
    /// Fixed-point currency text, e.g. `$1,234.56`.
    Money(&'static str),
    /// Field of the expanded line item.
    Item(&'static str),
    BusinessKey,
    SyncTimestamp,
    Constant(&'static str),
    Derived(DeriveFn),
}

impl std::fmt::Debug for FieldSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Text(name) => f.debug_tuple("Text").field(name).finish(),
            Self::FirstOf(names) => f.debug_tuple("FirstOf").field(names).finish(),
            Self::Money(name) => f.debug_tuple("Money").field(name).finish(),
            Self::Item(name) => f.debug_tuple("Item").field(name).finish(),
            Self::BusinessKey => f.write_str("BusinessKey"),
            Self::SyncTimestamp => f.write_str("SyncTimestamp"),
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

impl FieldSource {
    pub fn render(&self, source: &RowSource<'_>) -> CellValue {
        match self {
            Self::Field(name) => source.field(name).map_or_else(CellValue::empty, CellValue::from_json),
            Self::Text(name) => {
                source.field(name).map_or_else(CellValue::empty, CellValue::text_from_json)
            }
            Self::FirstOf(names) => names
                .iter()
                .filter_map(|name| source.field(name))
                .find(|value| !is_blank(value))
                .map_or_else(CellValue::empty, CellValue::from_json),
            Self::Money(name) => CellValue::text(format_money(
                source.field(name).and_then(number_value).unwrap_or(0.0),
            )),
            Self::Item(name) => source
                .item
                .and_then(|item| item.get(name))
                .map_or_else(CellValue::empty, CellValue::from_json),
            Self::BusinessKey => CellValue::text(source.key.as_str()),
            Self::SyncTimestamp => CellValue::text(source.context.timestamp_text()),
            Self::Constant(value) => CellValue::text(*value),
            Self::Derived(derive) => derive(source),
        }
    }
}

/// One target column and its value source.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub column: &'static str,
    pub source: FieldSource,
}

impl ColumnRule {
    pub const fn new(column: &'static str, source: FieldSource) -> Self {
        Self { column, source }
    }
}

/// Ordered set of column rules for one catalog.
#[derive(Debug, Clone, Default)]
pub struct FieldMapping {
    rules: Vec<ColumnRule>,
}

/// Cells rendered for one row, plus the mapped columns the sheet lacks.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    pub cells: Vec<Cell>,
    pub unknown_columns: Vec<&'static str>,
}

impl FieldMapping {
    pub fn new(rules: Vec<ColumnRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rule(mut self, column: &'static str, source: FieldSource) -> Self {
        self.rules.push(ColumnRule::new(column, source));
        self
    }

    pub fn rules(&self) -> &[ColumnRule] {
        &self.rules
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.column)
    }

    /// Renders every rule whose column exists on the target.
    pub fn apply(&self, source: &RowSource<'_>, columns: &ColumnMap) -> MappedRow {
        let mut cells = Vec::with_capacity(self.rules.len());
        let mut unknown_columns = Vec::new();

        for rule in &self.rules {
            match columns.resolve(rule.column) {
                Some(column_id) => cells.push(Cell::new(column_id, rule.source.render(source))),
                None => unknown_columns.push(rule.column),
            }
        }

        MappedRow { cells, unknown_columns }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Numeric reading of a JSON value; numeric strings are accepted.
pub fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// `1234.5` → `$1,234.50`; negatives keep the sign in front.
pub fn format_money(amount: f64) -> String {
    if !amount.is_finite() {
        return "$0.00".to_string();
    }
    #[allow(clippy::cast_possible_truncation)]
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}${grouped}.{:02}", cents % 100)
}
