//! Target sheet shapes

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::record::CellValue;
use crate::impl_label_conversions;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(
    /// Target sheet identifier.
    SheetId
);
id_newtype!(
    /// Opaque target column identifier.
    ColumnId
);
id_newtype!(
    /// Opaque target row identifier.
    RowId
);

/// Column as discovered on the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    #[serde(default)]
    pub primary: bool,
}

/// Existing row with the values it currently holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub values: HashMap<ColumnId, CellValue>,
}

impl Row {
    pub fn new(id: RowId) -> Self {
        Self { id, values: HashMap::new() }
    }

    #[must_use]
    pub fn with_value(mut self, column: ColumnId, value: impl Into<CellValue>) -> Self {
        self.values.insert(column, value.into());
        self
    }

    pub fn value(&self, column: ColumnId) -> Option<&CellValue> {
        self.values.get(&column)
    }
}

/// Complete contents of one sheet, read once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSnapshot {
    pub sheet_id: SheetId,
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl SheetSnapshot {
    pub fn column(&self, title: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.title == title)
    }
}

/// One `{column_id, value}` pair in a row write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub column_id: ColumnId,
    pub value: CellValue,
}

impl Cell {
    pub fn new(column_id: ColumnId, value: impl Into<CellValue>) -> Self {
        Self { column_id, value: value.into() }
    }
}

/// Update addressed at an existing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowUpdate {
    pub row_id: RowId,
    pub cells: Vec<Cell>,
}

/// Where inserted rows land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowPosition {
    Top,
    #[default]
    Bottom,
}

impl_label_conversions!(RowPosition {
    Top => "top",
    Bottom => "bottom",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_column_lookup_is_exact() {
        let snapshot = SheetSnapshot {
            sheet_id: SheetId(1),
            name: "Bind - Almacenes".into(),
            columns: vec![
                Column { id: ColumnId(10), title: "ID".into(), primary: true },
                Column { id: ColumnId(11), title: "Nombre".into(), primary: false },
            ],
            rows: Vec::new(),
        };

        assert_eq!(snapshot.column("Nombre").map(|c| c.id), Some(ColumnId(11)));
        assert!(snapshot.column("nombre").is_none());
    }

    #[test]
    fn test_row_value_lookup() {
        let row = Row::new(RowId(5)).with_value(ColumnId(10), "abc");
        assert_eq!(row.value(ColumnId(10)), Some(&CellValue::text("abc")));
        assert_eq!(row.value(ColumnId(11)), None);
    }

    #[test]
    fn test_ids_serialize_as_plain_numbers() {
        let cell = Cell::new(ColumnId(7), 3_i64);
        assert_eq!(
            serde_json::to_value(&cell).unwrap(),
            serde_json::json!({"column_id": 7, "value": 3})
        );
    }
}
