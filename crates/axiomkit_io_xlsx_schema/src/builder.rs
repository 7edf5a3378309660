//! Fluent schema builder with builder-time format checks.
//!
//! Every call that references a format key checks it against the formats
//! registered so far and fails without touching worksheet state when the key is
//! unknown. A schema produced through [`WorkbookBuilder::serialize`] therefore
//! never carries a dangling format reference.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::conf::N_NCOLS_EXCEL_MAX;
use crate::error::SchemaConstructionError;
use crate::spec::{
    EnumCellValue, SpecCell, SpecColumn, SpecFormatProps, SpecFormula, SpecFrozenPane,
    SpecHyperlink, SpecImage, SpecLineOptions, SpecMergedCell, SpecOptionsMap, SpecRange,
    SpecRow, SpecTable, SpecWorkbook, SpecWorksheet,
};

////////////////////////////////////////////////////////////////////////////////
// #region RowEntry

/// One entry passed to [`WorksheetWriter::write_row`].
#[derive(Debug, Clone, PartialEq)]
pub enum EnumRowEntry {
    /// Skip this column.
    Empty,
    /// Unformatted text cell.
    PlainValue(String),
    /// Cell with optional format. A missing value is rejected at write time.
    FormattedValue {
        value: Option<EnumCellValue>,
        format: Option<String>,
    },
}

impl EnumRowEntry {
    /// Formatted entry shorthand.
    pub fn formatted(value: impl Into<EnumCellValue>, format: impl Into<String>) -> Self {
        Self::FormattedValue {
            value: Some(value.into()),
            format: Some(format.into()),
        }
    }

    /// Convert a raw JSON entry.
    ///
    /// `null` is empty, a string is a plain value and an object reads
    /// `value`/`format` (short keys `v`/`f` are accepted too). Anything else
    /// returns the offending JSON type name.
    pub fn from_json(value: &Value) -> Result<Self, &'static str> {
        match value {
            Value::Null => Ok(Self::Empty),
            Value::String(s) => Ok(Self::PlainValue(s.clone())),
            Value::Object(obj) => {
                let value_raw = obj.get("value").or_else(|| obj.get("v"));
                let value = match value_raw {
                    None | Some(Value::Null) => None,
                    Some(Value::Bool(b)) => Some(EnumCellValue::Boolean(*b)),
                    Some(Value::Number(n)) => n.as_f64().map(EnumCellValue::Number),
                    Some(Value::String(s)) => Some(EnumCellValue::String(s.clone())),
                    Some(other) => return Err(derive_json_type_name(other)),
                };
                let format = match obj.get("format").or_else(|| obj.get("f")) {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => return Err(derive_json_type_name(other)),
                };
                Ok(Self::FormattedValue { value, format })
            }
            other => Err(derive_json_type_name(other)),
        }
    }
}

impl From<&str> for EnumRowEntry {
    fn from(value: &str) -> Self {
        Self::PlainValue(value.to_string())
    }
}

impl From<String> for EnumRowEntry {
    fn from(value: String) -> Self {
        Self::PlainValue(value)
    }
}

impl<T: Into<EnumRowEntry>> From<Option<T>> for EnumRowEntry {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

fn derive_json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorkbookBuilder

/// Index of a worksheet inside its [`WorkbookBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorksheetHandle(usize);

#[derive(Debug, Clone)]
struct WorksheetState {
    sheet: SpecWorksheet,
    n_row_cursor: u32,
}

/// Workbook schema under construction.
#[derive(Debug, Clone)]
pub struct WorkbookBuilder {
    filename: String,
    formats: BTreeMap<String, SpecFormatProps>,
    worksheets: Vec<WorksheetState>,
}

impl WorkbookBuilder {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            formats: BTreeMap::new(),
            worksheets: Vec::new(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Register a named format. Keys are unique even when the properties are identical.
    pub fn add_format(
        &mut self,
        key: impl Into<String>,
        spec: SpecFormatProps,
    ) -> Result<&mut Self, SchemaConstructionError> {
        let key = key.into();
        if self.formats.contains_key(&key) {
            return Err(SchemaConstructionError::DuplicateFormat { key });
        }
        self.formats.insert(key, spec);
        Ok(self)
    }

    pub fn has_format(&self, key: &str) -> bool {
        self.formats.contains_key(key)
    }

    /// Append a worksheet. Labels need not be unique.
    pub fn add_worksheet(&mut self, label: impl Into<String>) -> WorksheetWriter<'_> {
        let n_idx = self.worksheets.len();
        self.worksheets.push(WorksheetState {
            sheet: SpecWorksheet {
                label: label.into(),
                ..Default::default()
            },
            n_row_cursor: 0,
        });
        WorksheetWriter {
            handle: WorksheetHandle(n_idx),
            formats: &self.formats,
            state: &mut self.worksheets[n_idx],
        }
    }

    /// Reopen a worksheet returned earlier by [`Self::add_worksheet`].
    pub fn worksheet(&mut self, handle: WorksheetHandle) -> Option<WorksheetWriter<'_>> {
        let state = self.worksheets.get_mut(handle.0)?;
        Some(WorksheetWriter {
            handle,
            formats: &self.formats,
            state,
        })
    }

    pub fn worksheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Snapshot the schema document.
    ///
    /// Read-only: calling it repeatedly without mutation yields equal documents.
    /// `formats` is omitted when no format was registered.
    pub fn serialize(&self) -> Result<SpecWorkbook, SchemaConstructionError> {
        if self.worksheets.is_empty() {
            return Err(SchemaConstructionError::EmptyWorkbook);
        }

        Ok(SpecWorkbook {
            filename: self.filename.clone(),
            formats: if self.formats.is_empty() {
                None
            } else {
                Some(self.formats.clone())
            },
            worksheets: self
                .worksheets
                .iter()
                .map(|state| state.sheet.clone())
                .collect(),
        })
    }

    /// [`Self::serialize`] as a JSON value.
    pub fn to_json(&self) -> Result<Value, SchemaConstructionError> {
        let schema = self.serialize()?;
        serde_json::to_value(&schema)
            .map_err(|err| SchemaConstructionError::Encode(err.to_string()))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorksheetWriter

/// Mutable view of one worksheet, bound to its workbook's formats.
#[derive(Debug)]
pub struct WorksheetWriter<'a> {
    handle: WorksheetHandle,
    formats: &'a BTreeMap<String, SpecFormatProps>,
    state: &'a mut WorksheetState,
}

impl WorksheetWriter<'_> {
    pub fn handle(&self) -> WorksheetHandle {
        self.handle
    }

    pub fn label(&self) -> &str {
        &self.state.sheet.label
    }

    /// Row index the next [`Self::write_row`] call writes to.
    pub fn current_row(&self) -> u32 {
        self.state.n_row_cursor
    }

    /// Read-only view of the sections written so far.
    pub fn sheet(&self) -> &SpecWorksheet {
        &self.state.sheet
    }

    fn ensure_format(
        &self,
        key: &str,
        location: impl FnOnce() -> String,
    ) -> Result<(), SchemaConstructionError> {
        if self.formats.contains_key(key) {
            return Ok(());
        }
        Err(SchemaConstructionError::UnknownFormat {
            location: location(),
            key: key.to_string(),
        })
    }

    fn ensure_finite(
        value: &EnumCellValue,
        location: impl FnOnce() -> String,
    ) -> Result<(), SchemaConstructionError> {
        match value {
            EnumCellValue::Number(n) if !n.is_finite() => {
                Err(SchemaConstructionError::NonFiniteNumber {
                    location: location(),
                    value: n.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Skip `n_rows` rows.
    pub fn write_empty_rows(&mut self, n_rows: u32) -> &mut Self {
        self.state.n_row_cursor = self.state.n_row_cursor.saturating_add(n_rows);
        self
    }

    /// Write one row at the row cursor, columns starting at 0.
    ///
    /// Empty entries only advance the column. The call is all-or-nothing: on
    /// error no cell is appended and the row cursor stays put. On success the
    /// row cursor advances by exactly one.
    pub fn write_row<I>(&mut self, entries: I) -> Result<&mut Self, SchemaConstructionError>
    where
        I: IntoIterator,
        I::Item: Into<EnumRowEntry>,
    {
        let n_row = self.state.n_row_cursor;
        let mut l_cells = Vec::new();

        for (n_idx, entry) in entries.into_iter().enumerate() {
            let n_col = cast_row_entry_col(n_row, n_idx)?;
            match entry.into() {
                EnumRowEntry::Empty => {}
                EnumRowEntry::PlainValue(value) => l_cells.push(SpecCell {
                    row: n_row,
                    col: n_col,
                    value: EnumCellValue::String(value),
                    format: None,
                }),
                EnumRowEntry::FormattedValue { value, format } => {
                    if let Some(key) = &format {
                        self.ensure_format(key, || format!("Row {n_row}, Column {n_col}"))?;
                    }
                    let Some(value) = value else {
                        return Err(SchemaConstructionError::MissingValue {
                            row: n_row,
                            col: n_col,
                        });
                    };
                    Self::ensure_finite(&value, || format!("Row {n_row}, Column {n_col}"))?;
                    l_cells.push(SpecCell {
                        row: n_row,
                        col: n_col,
                        value,
                        format,
                    });
                }
            }
        }

        self.state.sheet.cells.extend(l_cells);
        self.state.n_row_cursor = n_row.saturating_add(1);
        Ok(self)
    }

    /// [`Self::write_row`] over raw JSON entries.
    pub fn write_row_json(
        &mut self,
        entries: &[Value],
    ) -> Result<&mut Self, SchemaConstructionError> {
        let n_row = self.state.n_row_cursor;
        let mut l_entries = Vec::with_capacity(entries.len());
        for (n_idx, value) in entries.iter().enumerate() {
            let entry = EnumRowEntry::from_json(value).map_err(|kind| {
                SchemaConstructionError::InvalidColumnType {
                    row: n_row,
                    col: u16::try_from(n_idx).unwrap_or(u16::MAX),
                    kind: kind.to_string(),
                }
            })?;
            l_entries.push(entry);
        }
        self.write_row(l_entries)
    }

    pub fn write_cell(
        &mut self,
        row: u32,
        col: u16,
        value: impl Into<EnumCellValue>,
        format: Option<&str>,
    ) -> Result<&mut Self, SchemaConstructionError> {
        let value = value.into();
        Self::ensure_finite(&value, || format!("Row {row}, Column {col}"))?;
        if let Some(key) = format {
            self.ensure_format(key, || format!("Row {row}, Column {col}"))?;
        }
        self.state.sheet.cells.push(SpecCell {
            row,
            col,
            value,
            format: format.map(str::to_string),
        });
        Ok(self)
    }

    pub fn set_column_width(
        &mut self,
        col: u16,
        width: f64,
        format: Option<&str>,
        options: Option<SpecLineOptions>,
    ) -> Result<&mut Self, SchemaConstructionError> {
        if let Some(key) = format {
            self.ensure_format(key, || format!("Column {col}"))?;
        }
        self.state.sheet.columns.push(SpecColumn {
            first_col: col,
            last_col: col,
            width: Some(width),
            format: format.map(str::to_string),
            options,
        });
        Ok(self)
    }

    pub fn set_row_height(
        &mut self,
        row: u32,
        height: f64,
        format: Option<&str>,
        options: Option<SpecLineOptions>,
    ) -> Result<&mut Self, SchemaConstructionError> {
        if let Some(key) = format {
            self.ensure_format(key, || format!("Row {row}"))?;
        }
        self.state.sheet.rows.push(SpecRow {
            row,
            height: Some(height),
            format: format.map(str::to_string),
            options,
        });
        Ok(self)
    }

    pub fn write_merged_cell(
        &mut self,
        range: SpecRange,
        data: Option<EnumCellValue>,
        format: Option<&str>,
    ) -> Result<&mut Self, SchemaConstructionError> {
        let location = || {
            format!(
                "Merged cell (from row {}, column {}, to row {}, column {})",
                range.first_row, range.first_col, range.last_row, range.last_col
            )
        };
        if let Some(value) = &data {
            Self::ensure_finite(value, location)?;
        }
        if let Some(key) = format {
            self.ensure_format(key, location)?;
        }
        self.state.sheet.merged_cells.push(SpecMergedCell {
            range,
            data,
            format: format.map(str::to_string),
        });
        Ok(self)
    }

    pub fn write_hyperlink(
        &mut self,
        row: u32,
        col: u16,
        url: &str,
        format: Option<&str>,
        label: Option<&str>,
        tip: Option<&str>,
    ) -> Result<&mut Self, SchemaConstructionError> {
        if let Some(key) = format {
            self.ensure_format(key, || format!("Row {row}, Column {col}"))?;
        }
        self.state.sheet.hyperlinks.push(SpecHyperlink {
            row,
            col,
            url: url.to_string(),
            format: format.map(str::to_string),
            label: label.map(str::to_string),
            tip: tip.map(str::to_string),
        });
        Ok(self)
    }

    /// Append a formula. `default_value` is omitted from the document when `None`.
    pub fn write_formula(
        &mut self,
        row: u32,
        col: u16,
        formula: &str,
        format: Option<&str>,
        default_value: Option<i64>,
    ) -> Result<&mut Self, SchemaConstructionError> {
        if let Some(key) = format {
            self.ensure_format(key, || format!("Row {row}, Column {col}"))?;
        }
        self.state.sheet.formulas.push(SpecFormula {
            row,
            col,
            formula: formula.to_string(),
            format: format.map(str::to_string),
            default_value,
        });
        Ok(self)
    }

    /// Append an image. Inline bytes go base64-encoded into `options.image_data`.
    pub fn write_image(
        &mut self,
        row: u32,
        col: u16,
        url: &str,
        options: Option<SpecOptionsMap>,
    ) -> &mut Self {
        self.state.sheet.images.push(SpecImage {
            row,
            col,
            url: url.to_string(),
            options: options.unwrap_or_default(),
        });
        self
    }

    /// Append a table. Per-column `format` keys in `options.columns` must be registered.
    pub fn write_table(
        &mut self,
        range: SpecRange,
        options: Option<SpecOptionsMap>,
    ) -> Result<&mut Self, SchemaConstructionError> {
        let options = options.unwrap_or_default();
        if let Some(l_columns) = options.get("columns").and_then(Value::as_array) {
            for (n_idx, column) in l_columns.iter().enumerate() {
                if let Some(key) = column.get("format").and_then(Value::as_str) {
                    self.ensure_format(key, || {
                        format!(
                            "Table (from row {}, column {}) column {n_idx}",
                            range.first_row, range.first_col
                        )
                    })?;
                }
            }
        }
        self.state.sheet.tables.push(SpecTable { range, options });
        Ok(self)
    }

    /// Append an autofilter region to the additional-regions list.
    pub fn add_autofilter(&mut self, range: SpecRange) -> &mut Self {
        self.state.sheet.autofilters.push(range);
        self
    }

    /// Set the primary autofilter region, replacing any previous one.
    pub fn set_autofilter(&mut self, range: SpecRange) -> &mut Self {
        self.state.sheet.autofilter = Some(range);
        self
    }

    pub fn add_frozen_pane(
        &mut self,
        row: u32,
        col: u16,
        top_row: Option<u32>,
        left_col: Option<u16>,
    ) -> &mut Self {
        self.state.sheet.frozen_panes.push(SpecFrozenPane {
            row,
            col,
            top_row,
            left_col,
        });
        self
    }
}

fn cast_row_entry_col(n_row: u32, n_idx: usize) -> Result<u16, SchemaConstructionError> {
    if n_idx >= N_NCOLS_EXCEL_MAX {
        return Err(SchemaConstructionError::TooManyColumns {
            row: n_row,
            n_cols: n_idx + 1,
        });
    }
    u16::try_from(n_idx).map_err(|_| SchemaConstructionError::TooManyColumns {
        row: n_row,
        n_cols: n_idx + 1,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn props(value: Value) -> SpecFormatProps {
        match value {
            Value::Object(map) => map,
            _ => SpecFormatProps::new(),
        }
    }

    #[test]
    fn test_add_format_rejects_duplicate_even_if_identical() {
        let mut wb = WorkbookBuilder::new("r.xlsx");
        wb.add_format("b", props(json!({"bold": true}))).expect("first add");

        let err = wb
            .add_format("b", props(json!({"bold": true})))
            .expect_err("duplicate add");
        assert_eq!(
            err,
            SchemaConstructionError::DuplicateFormat {
                key: "b".to_string()
            }
        );
        assert!(wb.has_format("b"));
        assert!(!wb.has_format("i"));
    }

    #[test]
    fn test_write_row_skips_empty_entries_and_advances_cursor() {
        let mut wb = WorkbookBuilder::new("r.xlsx");
        wb.add_format("fmt1", props(json!({"italic": true})))
            .expect("add format");
        let mut ws = wb.add_worksheet("S1");

        ws.write_row([
            EnumRowEntry::Empty,
            EnumRowEntry::from("A"),
            EnumRowEntry::Empty,
            EnumRowEntry::formatted("B", "fmt1"),
        ])
        .expect("write row");

        assert_eq!(
            ws.sheet().cells,
            vec![
                SpecCell {
                    row: 0,
                    col: 1,
                    value: EnumCellValue::from("A"),
                    format: None,
                },
                SpecCell {
                    row: 0,
                    col: 3,
                    value: EnumCellValue::from("B"),
                    format: Some("fmt1".to_string()),
                },
            ]
        );
        assert_eq!(ws.current_row(), 1);
    }

    #[test]
    fn test_write_row_json_matches_typed_entries() {
        let mut wb = WorkbookBuilder::new("r.xlsx");
        wb.add_format("fmt1", props(json!({"italic": true})))
            .expect("add format");
        let mut ws = wb.add_worksheet("S1");

        ws.write_row_json(&[json!(null), json!("A"), json!(null), json!({"v": "B", "f": "fmt1"})])
            .expect("write row");
        ws.write_row(Vec::<EnumRowEntry>::new()).expect("empty row");

        assert_eq!(ws.sheet().cells.len(), 2);
        assert_eq!(ws.sheet().cells[1].col, 3);
        assert_eq!(ws.current_row(), 2);
    }

    #[test]
    fn test_write_row_rejects_invalid_entry_without_mutation() {
        let mut wb = WorkbookBuilder::new("r.xlsx");
        let mut ws = wb.add_worksheet("S1");

        let err = ws
            .write_row_json(&[json!("A"), json!(3)])
            .expect_err("number entry");
        assert_eq!(
            err,
            SchemaConstructionError::InvalidColumnType {
                row: 0,
                col: 1,
                kind: "number".to_string()
            }
        );

        let err = ws
            .write_row([
                EnumRowEntry::from("A"),
                EnumRowEntry::FormattedValue {
                    value: None,
                    format: None,
                },
            ])
            .expect_err("missing value");
        assert_eq!(err, SchemaConstructionError::MissingValue { row: 0, col: 1 });

        let err = ws
            .write_row([EnumRowEntry::formatted("A", "nope")])
            .expect_err("unknown format");
        assert!(matches!(err, SchemaConstructionError::UnknownFormat { .. }));

        assert!(ws.sheet().cells.is_empty());
        assert_eq!(ws.current_row(), 0);
    }

    #[test]
    fn test_positional_writers_reject_unknown_format_before_append() {
        let mut wb = WorkbookBuilder::new("r.xlsx");
        let mut ws = wb.add_worksheet("S1");

        assert!(ws.write_cell(0, 0, "x", Some("nope")).is_err());
        assert!(ws.write_formula(0, 0, "=1+1", Some("nope"), None).is_err());
        assert!(
            ws.write_hyperlink(0, 0, "https://example.com", Some("nope"), None, None)
                .is_err()
        );
        assert!(
            ws.write_merged_cell(SpecRange::new(0, 0, 0, 2), None, Some("nope"))
                .is_err()
        );
        assert!(ws.set_column_width(0, 12.0, Some("nope"), None).is_err());
        assert!(ws.set_row_height(0, 20.0, Some("nope"), None).is_err());
        assert!(
            ws.write_table(
                SpecRange::new(0, 0, 3, 1),
                Some(props(json!({"columns": [{"header": "A", "format": "nope"}]})))
            )
            .is_err()
        );

        assert_eq!(ws.sheet(), &SpecWorksheet {
            label: "S1".to_string(),
            ..Default::default()
        });
    }

    #[test]
    fn test_serialize_omits_formats_and_preserves_sheet_order() {
        let mut wb = WorkbookBuilder::new("r.xlsx");
        wb.add_worksheet("B").write_cell(0, 0, 1.5, None).expect("cell");
        wb.add_worksheet("A");
        wb.add_worksheet("B");

        assert_eq!(wb.filename(), "r.xlsx");
        assert_eq!(wb.worksheet_count(), 3);

        let value = wb.to_json().expect("to json");
        assert!(value.get("formats").is_none());
        let l_labels: Vec<&str> = value["worksheets"]
            .as_array()
            .map(|l| l.iter().filter_map(|w| w["label"].as_str()).collect())
            .unwrap_or_default();
        assert_eq!(l_labels, vec!["B", "A", "B"]);
        assert_eq!(value["worksheets"][1], json!({"label": "A", "cells": []}));
    }

    #[test]
    fn test_serialize_is_idempotent_and_pure() {
        let mut wb = WorkbookBuilder::new("r.xlsx");
        wb.add_format("b", props(json!({"bold": true}))).expect("add format");
        let handle = {
            let mut ws = wb.add_worksheet("S1");
            ws.write_row(["A", "B"]).expect("row");
            ws.handle()
        };

        let first = wb.serialize().expect("first");
        let second = wb.serialize().expect("second");
        assert_eq!(first, second);

        let ws = wb.worksheet(handle).expect("reopen");
        assert_eq!(ws.current_row(), 1);
    }

    #[test]
    fn test_serialize_empty_workbook_fails() {
        let wb = WorkbookBuilder::new("r.xlsx");
        assert_eq!(wb.worksheet_count(), 0);
        assert_eq!(wb.serialize(), Err(SchemaConstructionError::EmptyWorkbook));
    }

    #[test]
    fn test_non_finite_numbers_are_rejected_without_mutation() {
        let mut wb = WorkbookBuilder::new("r.xlsx");
        wb.add_format("b", props(json!({"bold": true}))).expect("add format");
        let mut ws = wb.add_worksheet("S1");

        let err = ws.write_cell(0, 0, f64::NAN, None).map(|_| ()).unwrap_err();
        assert!(matches!(
            err,
            SchemaConstructionError::NonFiniteNumber { ref location, .. }
                if location == "Row 0, Column 0"
        ));

        let err = ws
            .write_row([
                EnumRowEntry::from("ok"),
                EnumRowEntry::formatted(f64::INFINITY, "b"),
            ])
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaConstructionError::NonFiniteNumber { ref location, .. }
                if location == "Row 0, Column 1"
        ));
        assert_eq!(ws.current_row(), 0);

        let range = SpecRange::new(1, 0, 1, 2);
        let result = ws.write_merged_cell(range, Some(f64::NEG_INFINITY.into()), None);
        assert!(matches!(result, Err(SchemaConstructionError::NonFiniteNumber { .. })));

        assert!(ws.sheet().cells.is_empty());
        assert!(ws.sheet().merged_cells.is_empty());

        ws.write_cell(0, 0, 2.5, None).expect("finite cell");
        let value = wb.to_json().expect("to json");
        assert_eq!(value["worksheets"][0]["cells"][0]["value"], json!(2.5));
    }

    #[test]
    fn test_reopened_worksheet_sees_formats_added_later() {
        let mut wb = WorkbookBuilder::new("r.xlsx");
        let handle = wb.add_worksheet("S1").handle();
        wb.add_format("late", props(json!({"bold": true})))
            .expect("add format");

        let mut ws = wb.worksheet(handle).expect("reopen");
        ws.write_cell(0, 0, "x", Some("late")).expect("cell");
        ws.write_empty_rows(3);
        ws.write_row([Some("y"), None]).expect("row");

        assert_eq!(ws.sheet().cells[1].row, 3);
        assert_eq!(ws.current_row(), 4);
    }

    #[test]
    fn test_feature_appenders_record_sections() {
        let mut wb = WorkbookBuilder::new("r.xlsx");
        let mut ws = wb.add_worksheet("S1");
        ws.write_image(2, 1, "https://example.com/logo.png", None)
            .add_autofilter(SpecRange::new(0, 0, 10, 3))
            .set_autofilter(SpecRange::new(0, 0, 5, 1))
            .add_frozen_pane(1, 0, None, None);
        ws.write_formula(4, 0, "=SUM(A1:A3)", None, Some(6))
            .expect("formula");

        let sheet = ws.sheet();
        assert!(sheet.images[0].options.is_empty());
        assert_eq!(sheet.autofilters, vec![SpecRange::new(0, 0, 10, 3)]);
        assert_eq!(sheet.autofilter, Some(SpecRange::new(0, 0, 5, 1)));
        assert_eq!(sheet.frozen_panes.len(), 1);
        assert_eq!(sheet.formulas[0].default_value, Some(6));
    }
}
