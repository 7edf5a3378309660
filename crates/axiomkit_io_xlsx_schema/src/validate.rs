//! Request-time validation for schemas that did not come through the builder.
//!
//! Parsing enforces shape and non-negative integer coordinates; the checks here
//! add length bounds, Excel grid bounds and format cross-references. The first
//! violation is returned with a JSON-path-like location.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::conf::{
    N_LEN_SCHEMA_LONG_TEXT_MAX, N_LEN_SCHEMA_TEXT_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    N_OUTLINE_LEVEL_MAX,
};
use crate::error::SchemaValidationError;
use crate::spec::{
    EnumCellValue, SpecFormatProps, SpecImageOptions, SpecLineOptions, SpecRange,
    SpecTableOptions, SpecWorkbook, SpecWorksheet,
};

type DictFormats = BTreeMap<String, SpecFormatProps>;

////////////////////////////////////////////////////////////////////////////////
// #region Parsing

/// Parse and validate a raw JSON schema document.
pub fn parse_workbook_json(raw: &str) -> Result<SpecWorkbook, SchemaValidationError> {
    let value: Value = serde_json::from_str(raw)?;
    parse_workbook_value(value)
}

/// Parse and validate an already decoded JSON schema document.
pub fn parse_workbook_value(value: Value) -> Result<SpecWorkbook, SchemaValidationError> {
    validate_cell_values_present(&value)?;
    let schema: SpecWorkbook = serde_json::from_value(value)?;
    validate_workbook(&schema)?;
    Ok(schema)
}

/// Report absent or `null` cell values by path instead of as a generic parse failure.
fn validate_cell_values_present(value: &Value) -> Result<(), SchemaValidationError> {
    let Some(l_sheets) = value.get("worksheets").and_then(Value::as_array) else {
        return Ok(());
    };
    for (n_idx_sheet, sheet) in l_sheets.iter().enumerate() {
        let Some(l_cells) = sheet.get("cells").and_then(Value::as_array) else {
            continue;
        };
        for (n_idx_cell, cell) in l_cells.iter().enumerate() {
            if !cell.is_object() {
                continue;
            }
            if cell.get("value").is_none_or(Value::is_null) {
                return Err(SchemaValidationError::invalid(
                    format!("worksheets[{n_idx_sheet}].cells[{n_idx_cell}].value"),
                    "This field is required and may not be null.",
                ));
            }
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorkbookValidation

/// Validate a parsed schema.
pub fn validate_workbook(schema: &SpecWorkbook) -> Result<(), SchemaValidationError> {
    validate_text(|| "filename".to_string(), &schema.filename, N_LEN_SCHEMA_TEXT_MAX, false)?;

    // Format keys are opaque; only their length is bounded.
    if let Some(dict_formats) = &schema.formats {
        for key in dict_formats.keys() {
            validate_text(|| format!("formats.{key}"), key, N_LEN_SCHEMA_TEXT_MAX, true)?;
        }
    }

    if schema.worksheets.is_empty() {
        return Err(SchemaValidationError::invalid(
            "worksheets",
            "At least one worksheet is required.",
        ));
    }

    for (n_idx_sheet, sheet) in schema.worksheets.iter().enumerate() {
        validate_worksheet(n_idx_sheet, sheet, schema.formats.as_ref())?;
    }
    Ok(())
}

fn validate_worksheet(
    n_idx_sheet: usize,
    sheet: &SpecWorksheet,
    formats: Option<&DictFormats>,
) -> Result<(), SchemaValidationError> {
    let c_sheet = format!("worksheets[{n_idx_sheet}]");
    validate_text(|| format!("{c_sheet}.label"), &sheet.label, N_LEN_SCHEMA_TEXT_MAX, false)?;

    for (n_idx, cell) in sheet.cells.iter().enumerate() {
        let path = || format!("{c_sheet}.cells[{n_idx}]");
        validate_cell_position(path, cell.row, cell.col)?;
        validate_cell_value(|| format!("{}.value", path()), &cell.value)?;
        validate_format_ref(|| format!("{}.format", path()), cell.format.as_deref(), formats)?;
    }

    for (n_idx, column) in sheet.columns.iter().enumerate() {
        let path = || format!("{c_sheet}.columns[{n_idx}]");
        validate_col(|| format!("{}.first_col", path()), column.first_col)?;
        validate_col(|| format!("{}.last_col", path()), column.last_col)?;
        if column.first_col > column.last_col {
            return Err(SchemaValidationError::invalid(
                path(),
                "first_col must be <= last_col.",
            ));
        }
        validate_size(|| format!("{}.width", path()), column.width)?;
        validate_line_options(|| format!("{}.options", path()), column.options.as_ref())?;
        validate_format_ref(|| format!("{}.format", path()), column.format.as_deref(), formats)?;
    }

    for (n_idx, row) in sheet.rows.iter().enumerate() {
        let path = || format!("{c_sheet}.rows[{n_idx}]");
        validate_row(|| format!("{}.row", path()), row.row)?;
        validate_size(|| format!("{}.height", path()), row.height)?;
        validate_line_options(|| format!("{}.options", path()), row.options.as_ref())?;
        validate_format_ref(|| format!("{}.format", path()), row.format.as_deref(), formats)?;
    }

    for (n_idx, formula) in sheet.formulas.iter().enumerate() {
        let path = || format!("{c_sheet}.formulas[{n_idx}]");
        validate_cell_position(path, formula.row, formula.col)?;
        validate_text(
            || format!("{}.formula", path()),
            &formula.formula,
            N_LEN_SCHEMA_LONG_TEXT_MAX,
            false,
        )?;
        validate_format_ref(|| format!("{}.format", path()), formula.format.as_deref(), formats)?;
    }

    for (n_idx, image) in sheet.images.iter().enumerate() {
        let path = || format!("{c_sheet}.images[{n_idx}]");
        validate_cell_position(path, image.row, image.col)?;
        validate_text(
            || format!("{}.url", path()),
            &image.url,
            N_LEN_SCHEMA_LONG_TEXT_MAX,
            true,
        )?;
        serde_json::from_value::<SpecImageOptions>(Value::Object(image.options.clone())).map_err(
            |err| SchemaValidationError::invalid(format!("{}.options", path()), err.to_string()),
        )?;
    }

    for (n_idx, hyperlink) in sheet.hyperlinks.iter().enumerate() {
        let path = || format!("{c_sheet}.hyperlinks[{n_idx}]");
        validate_cell_position(path, hyperlink.row, hyperlink.col)?;
        validate_text(|| format!("{}.url", path()), &hyperlink.url, N_LEN_SCHEMA_TEXT_MAX, false)?;
        if let Some(label) = &hyperlink.label {
            validate_text(|| format!("{}.label", path()), label, N_LEN_SCHEMA_TEXT_MAX, true)?;
        }
        if let Some(tip) = &hyperlink.tip {
            validate_text(|| format!("{}.tip", path()), tip, N_LEN_SCHEMA_TEXT_MAX, true)?;
        }
        validate_format_ref(
            || format!("{}.format", path()),
            hyperlink.format.as_deref(),
            formats,
        )?;
    }

    for (n_idx, table) in sheet.tables.iter().enumerate() {
        let path = || format!("{c_sheet}.tables[{n_idx}]");
        validate_range(path, &table.range)?;
        let table_options =
            serde_json::from_value::<SpecTableOptions>(Value::Object(table.options.clone()))
                .map_err(|err| {
                    SchemaValidationError::invalid(format!("{}.options", path()), err.to_string())
                })?;
        for (n_idx_col, column) in table_options.columns.iter().enumerate() {
            validate_format_ref(
                || format!("{}.options.columns[{n_idx_col}].format", path()),
                column.format.as_deref(),
                formats,
            )?;
        }
        for (n_idx_row, l_values) in table_options.data.iter().enumerate() {
            for (n_idx_col, value) in l_values.iter().enumerate() {
                if let Some(value) = value {
                    validate_cell_value(
                        || format!("{}.options.data[{n_idx_row}][{n_idx_col}]", path()),
                        value,
                    )?;
                }
            }
        }
    }

    for (n_idx, merged) in sheet.merged_cells.iter().enumerate() {
        let path = || format!("{c_sheet}.merged_cells[{n_idx}]");
        validate_range(path, &merged.range)?;
        if let Some(value) = &merged.data {
            validate_cell_value(|| format!("{}.data", path()), value)?;
        }
        validate_format_ref(|| format!("{}.format", path()), merged.format.as_deref(), formats)?;
    }

    if let Some(range) = &sheet.autofilter {
        validate_range(|| format!("{c_sheet}.autofilter"), range)?;
    }
    for (n_idx, range) in sheet.autofilters.iter().enumerate() {
        validate_range(|| format!("{c_sheet}.autofilters[{n_idx}]"), range)?;
    }

    for (n_idx, pane) in sheet.frozen_panes.iter().enumerate() {
        let path = || format!("{c_sheet}.frozen_panes[{n_idx}]");
        validate_cell_position(path, pane.row, pane.col)?;
        if let Some(top_row) = pane.top_row {
            validate_row(|| format!("{}.top_row", path()), top_row)?;
        }
        if let Some(left_col) = pane.left_col {
            validate_col(|| format!("{}.left_col", path()), left_col)?;
        }
    }

    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldValidation

fn validate_text(
    path: impl FnOnce() -> String,
    value: &str,
    n_len_max: usize,
    if_allow_blank: bool,
) -> Result<(), SchemaValidationError> {
    if !if_allow_blank && value.trim().is_empty() {
        return Err(SchemaValidationError::invalid(path(), "This field may not be blank."));
    }
    let n_len = value.chars().count();
    if n_len > n_len_max {
        return Err(SchemaValidationError::invalid(
            path(),
            format!("Ensure this field has no more than {n_len_max} characters (got {n_len})."),
        ));
    }
    Ok(())
}

fn validate_row(path: impl FnOnce() -> String, row: u32) -> Result<(), SchemaValidationError> {
    if row as usize >= N_NROWS_EXCEL_MAX {
        return Err(SchemaValidationError::invalid(
            path(),
            format!("Row index {row} exceeds the worksheet limit of {N_NROWS_EXCEL_MAX} rows."),
        ));
    }
    Ok(())
}

fn validate_col(path: impl FnOnce() -> String, col: u16) -> Result<(), SchemaValidationError> {
    if col as usize >= N_NCOLS_EXCEL_MAX {
        return Err(SchemaValidationError::invalid(
            path(),
            format!(
                "Column index {col} exceeds the worksheet limit of {N_NCOLS_EXCEL_MAX} columns."
            ),
        ));
    }
    Ok(())
}

fn validate_cell_position(
    path: impl Fn() -> String,
    row: u32,
    col: u16,
) -> Result<(), SchemaValidationError> {
    validate_row(|| format!("{}.row", path()), row)?;
    validate_col(|| format!("{}.col", path()), col)
}

fn validate_range(
    path: impl Fn() -> String,
    range: &SpecRange,
) -> Result<(), SchemaValidationError> {
    validate_row(|| format!("{}.first_row", path()), range.first_row)?;
    validate_col(|| format!("{}.first_col", path()), range.first_col)?;
    validate_row(|| format!("{}.last_row", path()), range.last_row)?;
    validate_col(|| format!("{}.last_col", path()), range.last_col)?;
    if range.first_row > range.last_row || range.first_col > range.last_col {
        return Err(SchemaValidationError::invalid(
            path(),
            "Range start must not be after range end.",
        ));
    }
    Ok(())
}

fn validate_size(
    path: impl FnOnce() -> String,
    size: Option<f64>,
) -> Result<(), SchemaValidationError> {
    match size {
        Some(n_size) if !n_size.is_finite() || n_size < 0.0 => Err(SchemaValidationError::invalid(
            path(),
            "Ensure this value is a finite number >= 0.",
        )),
        _ => Ok(()),
    }
}

fn validate_line_options(
    path: impl Fn() -> String,
    options: Option<&SpecLineOptions>,
) -> Result<(), SchemaValidationError> {
    match options {
        Some(options) if options.level > N_OUTLINE_LEVEL_MAX => {
            Err(SchemaValidationError::invalid(
                format!("{}.level", path()),
                format!("Outline level must be <= {N_OUTLINE_LEVEL_MAX}."),
            ))
        }
        _ => Ok(()),
    }
}

fn validate_cell_value(
    path: impl FnOnce() -> String,
    value: &EnumCellValue,
) -> Result<(), SchemaValidationError> {
    match value {
        EnumCellValue::Number(n) if !n.is_finite() => Err(SchemaValidationError::invalid(
            path(),
            "Numeric values must be finite.",
        )),
        _ => Ok(()),
    }
}

/// Check a format reference against the declared formats.
///
/// A reference while the workbook declares no formats map at all is reported as
/// [`SchemaValidationError::MissingFormats`], distinct from an unknown key.
fn validate_format_ref(
    path: impl Fn() -> String,
    key: Option<&str>,
    formats: Option<&DictFormats>,
) -> Result<(), SchemaValidationError> {
    let Some(key) = key else {
        return Ok(());
    };
    validate_text(&path, key, N_LEN_SCHEMA_TEXT_MAX, true)?;
    match formats {
        None => Err(SchemaValidationError::MissingFormats {
            path: path(),
            key: key.to_string(),
        }),
        Some(dict_formats) if !dict_formats.contains_key(key) => {
            Err(SchemaValidationError::UnknownFormat {
                path: path(),
                key: key.to_string(),
            })
        }
        Some(_) => Ok(()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn derive_error(value: Value) -> SchemaValidationError {
        match parse_workbook_value(value) {
            Ok(_) => panic!("expected validation failure"),
            Err(err) => err,
        }
    }

    #[test]
    fn test_parse_minimal_schema() {
        let schema = parse_workbook_json(
            r#"{"filename": "r.xlsx", "formats": {"b": {"bold": true}},
                "worksheets": [{"label": "S1",
                                "cells": [{"row": 0, "col": 0, "value": "Hi", "format": "b"}]}]}"#,
        )
        .expect("valid schema");

        assert_eq!(schema.worksheets.len(), 1);
        assert_eq!(schema.worksheets[0].cells[0].format.as_deref(), Some("b"));
    }

    #[test]
    fn test_format_reference_without_formats_map_is_missing_formats() {
        for formats in [None, Some(Value::Null)] {
            let mut doc = json!({
                "filename": "r.xlsx",
                "worksheets": [{
                    "label": "S1",
                    "cells": [{"row": 0, "col": 0, "value": "Hi", "format": "b"}],
                }],
            });
            if let Some(formats) = formats {
                doc["formats"] = formats;
            }

            match derive_error(doc) {
                SchemaValidationError::MissingFormats { path, key } => {
                    assert_eq!(path, "worksheets[0].cells[0].format");
                    assert_eq!(key, "b");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_format_reference_with_empty_formats_map_is_unknown_format() {
        let err = derive_error(json!({
            "filename": "r.xlsx",
            "formats": {},
            "worksheets": [{
                "label": "S1",
                "cells": [],
                "rows": [{"row": 2, "height": 20, "format": "b"}],
            }],
        }));
        assert!(matches!(
            err,
            SchemaValidationError::UnknownFormat { ref path, .. }
                if path == "worksheets[0].rows[0].format"
        ));
    }

    #[test]
    fn test_every_section_format_reference_is_checked() {
        let l_sections = [
            ("columns", json!([{"first_col": 0, "last_col": 1, "width": 10, "format": "x"}])),
            ("formulas", json!([{"row": 0, "col": 0, "formula": "=1", "format": "x"}])),
            ("hyperlinks", json!([{"row": 0, "col": 0, "url": "https://a.b", "format": "x"}])),
            (
                "merged_cells",
                json!([{
                    "first_row": 0, "first_col": 0, "last_row": 0, "last_col": 2,
                    "data": "m", "format": "x",
                }]),
            ),
            (
                "tables",
                json!([{
                    "first_row": 0, "first_col": 0, "last_row": 3, "last_col": 1,
                    "options": {"columns": [{"header": "A"}, {"header": "B", "format": "x"}]},
                }]),
            ),
        ];

        for (c_section, section) in l_sections {
            let mut sheet = json!({"label": "S1", "cells": []});
            sheet[c_section] = section;
            let err = derive_error(json!({
                "filename": "r.xlsx",
                "formats": {"b": {"bold": true}},
                "worksheets": [sheet],
            }));
            match err {
                SchemaValidationError::UnknownFormat { path, key } => {
                    assert!(path.contains(c_section), "{path}");
                    assert_eq!(key, "x");
                }
                other => panic!("unexpected error for {c_section}: {other}"),
            }
        }
    }

    #[test]
    fn test_negative_coordinates_are_malformed() {
        let err = derive_error(json!({
            "filename": "r.xlsx",
            "worksheets": [{"label": "S1", "cells": [{"row": -1, "col": 0, "value": "x"}]}],
        }));
        assert!(matches!(err, SchemaValidationError::Malformed(_)));
    }

    #[test]
    fn test_missing_or_null_cell_value_is_reported_by_path() {
        for cell in [json!({"row": 0, "col": 0}), json!({"row": 0, "col": 0, "value": null})] {
            let err = derive_error(json!({
                "filename": "r.xlsx",
                "worksheets": [{"label": "S1", "cells": [{"row": 0, "col": 1, "value": 1}, cell]}],
            }));
            assert!(matches!(
                err,
                SchemaValidationError::Invalid { ref path, .. }
                    if path == "worksheets[0].cells[1].value"
            ));
        }
    }

    #[test]
    fn test_missing_cells_section_is_malformed() {
        let err = derive_error(json!({"filename": "r.xlsx", "worksheets": [{"label": "S1"}]}));
        assert!(matches!(err, SchemaValidationError::Malformed(_)));
    }

    #[test]
    fn test_length_bounds_and_blank_strings() {
        let err = derive_error(json!({
            "filename": "r.xlsx",
            "worksheets": [{"label": "L".repeat(256), "cells": []}],
        }));
        assert!(matches!(
            err,
            SchemaValidationError::Invalid { ref path, .. } if path == "worksheets[0].label"
        ));

        let err = derive_error(json!({
            "filename": " ",
            "worksheets": [{"label": "S1", "cells": []}],
        }));
        assert!(matches!(
            err,
            SchemaValidationError::Invalid { ref path, .. } if path == "filename"
        ));

        let err = derive_error(json!({
            "filename": "r.xlsx",
            "worksheets": [{
                "label": "S1",
                "cells": [],
                "formulas": [{"row": 0, "col": 0, "formula": "x".repeat(1025)}],
            }],
        }));
        assert!(matches!(
            err,
            SchemaValidationError::Invalid { ref path, .. }
                if path == "worksheets[0].formulas[0].formula"
        ));
    }

    #[test]
    fn test_grid_bounds_and_range_order() {
        let err = derive_error(json!({
            "filename": "r.xlsx",
            "worksheets": [{"label": "S1", "cells": [{"row": 1_048_576, "col": 0, "value": 1}]}],
        }));
        assert!(matches!(
            err,
            SchemaValidationError::Invalid { ref path, .. } if path == "worksheets[0].cells[0].row"
        ));

        let err = derive_error(json!({
            "filename": "r.xlsx",
            "worksheets": [{
                "label": "S1",
                "cells": [],
                "autofilter": {"first_row": 5, "first_col": 0, "last_row": 1, "last_col": 0},
            }],
        }));
        assert!(matches!(
            err,
            SchemaValidationError::Invalid { ref path, .. } if path == "worksheets[0].autofilter"
        ));
    }

    #[test]
    fn test_empty_worksheet_list_is_rejected() {
        let err = derive_error(json!({"filename": "r.xlsx", "worksheets": []}));
        assert!(matches!(
            err,
            SchemaValidationError::Invalid { ref path, .. } if path == "worksheets"
        ));
    }

    #[test]
    fn test_bad_feature_options_are_rejected() {
        let err = derive_error(json!({
            "filename": "r.xlsx",
            "worksheets": [{
                "label": "S1",
                "cells": [],
                "tables": [{
                    "first_row": 0, "first_col": 0, "last_row": 2, "last_col": 0,
                    "options": {"columns": "A"},
                }],
            }],
        }));
        assert!(matches!(
            err,
            SchemaValidationError::Invalid { ref path, .. }
                if path == "worksheets[0].tables[0].options"
        ));

        let err = derive_error(json!({
            "filename": "r.xlsx",
            "worksheets": [{
                "label": "S1",
                "cells": [],
                "images": [{"row": 0, "col": 0, "url": "", "options": {"x_scale": "big"}}],
            }],
        }));
        assert!(matches!(
            err,
            SchemaValidationError::Invalid { ref path, .. }
                if path == "worksheets[0].images[0].options"
        ));
    }

    #[test]
    fn test_outline_level_above_limit_is_rejected() {
        let err = derive_error(json!({
            "filename": "r.xlsx",
            "worksheets": [{
                "label": "S1",
                "cells": [],
                "rows": [{"row": 0, "height": 15, "options": {"level": 9}}],
            }],
        }));
        assert!(matches!(
            err,
            SchemaValidationError::Invalid { ref path, .. }
                if path == "worksheets[0].rows[0].options.level"
        ));

        let err = derive_error(json!({
            "filename": "r.xlsx",
            "worksheets": [{
                "label": "S1",
                "cells": [],
                "columns": [{"first_col": 0, "last_col": 0, "width": 8, "options": {"level": 8}}],
            }],
        }));
        assert!(matches!(
            err,
            SchemaValidationError::Invalid { ref path, .. }
                if path == "worksheets[0].columns[0].options.level"
        ));

        let schema = parse_workbook_value(json!({
            "filename": "r.xlsx",
            "worksheets": [{
                "label": "S1",
                "cells": [],
                "rows": [{"row": 0, "height": 15, "options": {"level": 7, "hidden": true}}],
            }],
        }))
        .expect("level 7 is the deepest outline");
        assert_eq!(schema.worksheets[0].rows[0].options.map(|o| o.level), Some(7));
    }

    #[test]
    fn test_blank_format_key_is_accepted() {
        let schema = parse_workbook_value(json!({
            "filename": "r.xlsx",
            "formats": {"": {"bold": true}, " ": {"italic": true}},
            "worksheets": [{
                "label": "S1",
                "cells": [{"row": 0, "col": 0, "value": "x", "format": ""}],
            }],
        }))
        .expect("blank format keys are valid");
        assert_eq!(schema.worksheets[0].cells[0].format.as_deref(), Some(""));

        let err = derive_error(json!({
            "filename": "r.xlsx",
            "formats": {"k".repeat(256): {"bold": true}},
            "worksheets": [{"label": "S1", "cells": []}],
        }));
        assert!(matches!(
            err,
            SchemaValidationError::Invalid { ref path, .. } if path.starts_with("formats.")
        ));
    }
}
