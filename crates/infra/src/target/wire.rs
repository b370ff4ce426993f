//! JSON shapes of the sheet REST API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetsync_core::NewColumn;
use sheetsync_domain::{
    Cell, CellValue, Column, ColumnId, Row, RowId, RowPosition, RowUpdate, SheetId,
    SheetSnapshot,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SheetDto {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnDto>,
    #[serde(default)]
    pub rows: Vec<RowDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ColumnDto {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RowDto {
    pub id: i64,
    #[serde(default)]
    pub cells: Vec<CellDto>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CellDto {
    pub column_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl From<SheetDto> for SheetSnapshot {
    fn from(dto: SheetDto) -> Self {
        Self {
            sheet_id: SheetId(dto.id),
            name: dto.name,
            columns: dto
                .columns
                .into_iter()
                .map(|c| Column { id: ColumnId(c.id), title: c.title, primary: c.primary })
                .collect(),
            rows: dto
                .rows
                .into_iter()
                .map(|row| Row {
                    id: RowId(row.id),
                    values: row
                        .cells
                        .into_iter()
                        .filter_map(|cell| {
                            let value = cell.value.filter(|v| !v.is_null())?;
                            Some((ColumnId(cell.column_id), CellValue::from_json(&value)))
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl From<&Cell> for CellDto {
    fn from(cell: &Cell) -> Self {
        Self { column_id: cell.column_id.0, value: Some(cell.value.to_json()) }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewRowDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_top: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_bottom: Option<bool>,
    pub cells: Vec<CellDto>,
}

impl NewRowDto {
    pub fn new(position: RowPosition, cells: &[Cell]) -> Self {
        let (to_top, to_bottom) = match position {
            RowPosition::Top => (Some(true), None),
            RowPosition::Bottom => (None, Some(true)),
        };
        Self { to_top, to_bottom, cells: cells.iter().map(CellDto::from).collect() }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateRowDto {
    pub id: i64,
    pub cells: Vec<CellDto>,
}

impl From<&RowUpdate> for UpdateRowDto {
    fn from(update: &RowUpdate) -> Self {
        Self { id: update.row_id.0, cells: update.cells.iter().map(CellDto::from).collect() }
    }
}

/// Envelope of every write call.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct WriteResult {
    pub result_code: i64,
    pub message: Option<String>,
    pub result: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkspaceDto {
    #[serde(default)]
    pub sheets: Vec<SheetRefDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SheetRefDto {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewSheetDto<'a> {
    pub name: &'a str,
    pub columns: Vec<NewColumnDto<'a>>,
}

/// Every created column is plain text; typed values still round-trip.
#[derive(Debug, Serialize)]
pub(crate) struct NewColumnDto<'a> {
    pub title: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub primary: bool,
}

impl<'a> NewSheetDto<'a> {
    pub fn new(name: &'a str, columns: &'a [NewColumn]) -> Self {
        Self {
            name,
            columns: columns
                .iter()
                .map(|column| NewColumnDto {
                    title: &column.title,
                    kind: "TEXT_NUMBER",
                    primary: column.primary,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn sheet_payload_maps_to_snapshot() {
        let dto: SheetDto = serde_json::from_value(json!({
            "id": 42,
            "name": "Bind - Clientes",
            "columns": [
                {"id": 1, "title": "ID", "primary": true, "type": "TEXT_NUMBER"},
                {"id": 2, "title": "Nombre"}
            ],
            "rows": [
                {"id": 10, "rowNumber": 1, "cells": [
                    {"columnId": 1, "value": "c-1", "displayValue": "c-1"},
                    {"columnId": 2}
                ]}
            ]
        }))
        .unwrap();

        let snapshot = SheetSnapshot::from(dto);
        assert_eq!(snapshot.sheet_id, SheetId(42));
        assert!(snapshot.columns[0].primary);
        assert_eq!(snapshot.rows[0].value(ColumnId(1)), Some(&CellValue::text("c-1")));
        assert_eq!(snapshot.rows[0].value(ColumnId(2)), None);
    }

    #[test]
    fn new_rows_carry_position_flag() {
        let cells = vec![Cell::new(ColumnId(1), 5_i64)];
        let top = serde_json::to_value(NewRowDto::new(RowPosition::Top, &cells)).unwrap();
        assert_eq!(top, json!({"toTop": true, "cells": [{"columnId": 1, "value": 5}]}));

        let bottom = serde_json::to_value(NewRowDto::new(RowPosition::Bottom, &cells)).unwrap();
        assert_eq!(bottom["toBottom"], true);
        assert!(bottom.get("toTop").is_none());
    }

    #[test]
    fn new_sheet_marks_only_the_primary_column() {
        let columns = vec![
            NewColumn { title: "ID".into(), primary: true },
            NewColumn { title: "Nombre".into(), primary: false },
        ];
        let body = serde_json::to_value(NewSheetDto::new("Bind - Almacenes", &columns)).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "Bind - Almacenes",
                "columns": [
                    {"title": "ID", "type": "TEXT_NUMBER", "primary": true},
                    {"title": "Nombre", "type": "TEXT_NUMBER"}
                ]
            })
        );
    }
}
