//! Shared workbook schema models.
//!
//! These types are the wire contract: they serialize to (and parse from) the
//! JSON document accepted by the validator and produced by the builder.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Opaque named style specification (`{"bold": true, ...}`).
pub type SpecFormatProps = Map<String, Value>;

/// Free-form options payload for images and tables.
pub type SpecOptionsMap = Map<String, Value>;

fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Style flags arrive either as JSON booleans or as 0/1 integers.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum EnumFlag {
        Bool(bool),
        Int(i64),
    }

    match Option::<EnumFlag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(EnumFlag::Bool(flag)) => Ok(Some(flag)),
        Some(EnumFlag::Int(0)) => Ok(Some(false)),
        Some(EnumFlag::Int(1)) => Ok(Some(true)),
        Some(EnumFlag::Int(n)) => Err(serde::de::Error::custom(format!(
            "expected a boolean or 0/1, got {n}"
        ))),
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// Scalar value stored in a cell, merged range or table body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumCellValue {
    /// Boolean value.
    Boolean(bool),
    /// Numeric value.
    Number(f64),
    /// Text value. Text starting with `=` is written as a formula.
    String(String),
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for EnumCellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorkbookSchema

/// Root schema document for one workbook render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecWorkbook {
    /// Download filename.
    pub filename: String,
    /// Named formats; `None` when the document declares no formats map at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<BTreeMap<String, SpecFormatProps>>,
    /// Worksheets in document order.
    pub worksheets: Vec<SpecWorksheet>,
}

/// One worksheet and its feature sections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpecWorksheet {
    /// Worksheet tab label.
    pub label: String,
    /// Plain cell writes. Always present in the document, possibly empty.
    pub cells: Vec<SpecCell>,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub columns: Vec<SpecColumn>,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub rows: Vec<SpecRow>,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub formulas: Vec<SpecFormula>,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub images: Vec<SpecImage>,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub hyperlinks: Vec<SpecHyperlink>,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tables: Vec<SpecTable>,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub merged_cells: Vec<SpecMergedCell>,
    /// Additional autofilter regions, applied after [`Self::autofilter`].
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub autofilters: Vec<SpecRange>,
    /// Primary autofilter region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autofilter: Option<SpecRange>,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub frozen_panes: Vec<SpecFrozenPane>,
}

/// Inclusive rectangular cell range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRange {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
}

impl SpecRange {
    pub fn new(first_row: u32, first_col: u16, last_row: u32, last_col: u16) -> Self {
        Self {
            first_row,
            first_col,
            last_row,
            last_col,
        }
    }
}

/// One positioned cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecCell {
    pub row: u32,
    pub col: u16,
    pub value: EnumCellValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Visibility/outline options shared by column and row entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecLineOptions {
    /// Hide the column/row.
    pub hidden: bool,
    /// Outline level (0 = none).
    pub level: u8,
    /// Outline collapsed marker.
    pub collapsed: bool,
}

/// Column range width/format entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecColumn {
    pub first_col: u16,
    pub last_col: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<SpecLineOptions>,
}

/// Row height/format entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecRow {
    pub row: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<SpecLineOptions>,
}

/// Formula write with optional cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecFormula {
    pub row: u32,
    pub col: u16,
    pub formula: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Cached result shown before recalculation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<i64>,
}

/// Image anchored at a cell.
///
/// Inline bytes travel base64-encoded in `options.image_data`; otherwise `url`
/// is fetched at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecImage {
    pub row: u32,
    pub col: u16,
    pub url: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub options: SpecOptionsMap,
}

/// Hyperlink written into a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecHyperlink {
    pub row: u32,
    pub col: u16,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Display text; the URL is shown when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Hover tooltip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

/// Worksheet table over a cell range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecTable {
    #[serde(flatten)]
    pub range: SpecRange,
    /// Free-form table options, see [`SpecTableOptions`].
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub options: SpecOptionsMap,
}

/// Merged range with optional content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecMergedCell {
    #[serde(flatten)]
    pub range: SpecRange,
    #[serde(default)]
    pub data: Option<EnumCellValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Frozen pane split with optional first visible cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecFrozenPane {
    pub row: u32,
    pub col: u16,
    #[serde(default)]
    pub top_row: Option<u32>,
    #[serde(default)]
    pub left_col: Option<u16>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FeatureOptions

/// Typed view of [`SpecImage::options`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpecImageOptions {
    /// Base64 encoded image bytes.
    pub image_data: Option<String>,
    pub x_offset: u32,
    pub y_offset: u32,
    pub x_scale: f64,
    pub y_scale: f64,
    /// Alt text.
    pub description: Option<String>,
}

impl Default for SpecImageOptions {
    fn default() -> Self {
        Self {
            image_data: None,
            x_offset: 0,
            y_offset: 0,
            x_scale: 1.0,
            y_scale: 1.0,
            description: None,
        }
    }
}

/// Typed view of [`SpecTable::options`].
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SpecTableOptions {
    pub name: Option<String>,
    /// Style name such as `"Table Style Medium 9"`.
    pub style: Option<String>,
    pub header_row: Option<bool>,
    pub total_row: bool,
    pub autofilter: Option<bool>,
    pub banded_rows: Option<bool>,
    pub banded_columns: bool,
    pub first_column: bool,
    pub last_column: bool,
    pub columns: Vec<SpecTableColumn>,
    /// Body rows written below the header row.
    pub data: Vec<Vec<Option<EnumCellValue>>>,
}

/// Per-column table settings.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SpecTableColumn {
    pub header: Option<String>,
    /// Format key resolved to an engine format at render time.
    pub format: Option<String>,
    /// Totals-row function name (`sum`, `average`, ...).
    pub total_function: Option<String>,
    /// Totals-row label.
    pub total_string: Option<String>,
    /// Calculated column formula.
    pub formula: Option<String>,
}

/// Number format given either as a format code or a built-in index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EnumNumFormat {
    /// Built-in format index.
    Index(u8),
    /// Custom format code.
    Code(String),
}

/// Typed view of an opaque format spec.
///
/// Keys follow xlsxwriter property names; keys not listed here are kept in
/// `extra` and ignored by the engine.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<f64>,
    /// Bold style.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub bold: Option<bool>,
    /// Italic style.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub italic: Option<bool>,
    /// Underline style (1 single, 2 double, 33 single accounting, 34 double accounting).
    pub underline: Option<u8>,
    /// Strikethrough.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub font_strikeout: Option<bool>,
    /// Font color.
    pub font_color: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Text wrap.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub text_wrap: Option<bool>,
    /// Shrink text to fit.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub shrink: Option<bool>,
    /// Text rotation in degrees.
    pub rotation: Option<i16>,
    /// Indent level.
    pub indent: Option<u8>,

    /// Border style for all sides.
    pub border: Option<i64>,
    /// Top border override.
    pub top: Option<i64>,
    /// Bottom border override.
    pub bottom: Option<i64>,
    /// Left border override.
    pub left: Option<i64>,
    /// Right border override.
    pub right: Option<i64>,

    /// Number format.
    pub num_format: Option<EnumNumFormat>,

    /// Unrecognized properties.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SpecCellFormat {
    /// Interpret an opaque format spec.
    pub fn from_props(props: &SpecFormatProps) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(props.clone()))
    }

    /// Property names that were present but are not understood.
    pub fn unknown_keys(&self) -> Vec<&str> {
        self.extra.keys().map(String::as_str).collect()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RenderOptions

/// Renderer-wide options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRenderOptions {
    /// Replace illegal characters in worksheet labels and de-duplicate them.
    pub if_sanitize_sheet_names: bool,
}

impl Default for SpecRenderOptions {
    fn default() -> Self {
        Self {
            if_sanitize_sheet_names: true,
        }
    }
}

/// Options for the blocking HTTP image fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecHttpFetchOptions {
    /// Whole-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Reject bodies larger than this many bytes.
    pub n_bytes_max: Option<usize>,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for SpecHttpFetchOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            n_bytes_max: None,
            user_agent: concat!("axiomkit_io_xlsx_schema/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-render report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecRenderReport {
    /// Final worksheet names, in document order.
    pub sheets: Vec<String>,
    /// Number of images fetched over the network.
    pub cnt_images_fetched: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecRenderReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

/// Finished workbook ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRenderedWorkbook {
    /// Download filename taken from the schema.
    pub filename: String,
    /// Complete XLSX package.
    pub bytes: Vec<u8>,
    pub report: SpecRenderReport,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_format_accepts_integer_flags() {
        let props = serde_json::json!({
            "bold": 1,
            "italic": 0,
            "font_strikeout": null,
            "text_wrap": true,
            "shrink": 1,
            "border": 1,
        });
        let format = SpecCellFormat::from_props(props.as_object().expect("object"))
            .expect("parse format");

        assert_eq!(format.bold, Some(true));
        assert_eq!(format.italic, Some(false));
        assert_eq!(format.font_strikeout, None);
        assert_eq!(format.text_wrap, Some(true));
        assert_eq!(format.shrink, Some(true));
        assert_eq!(format.border, Some(1));
        assert!(format.unknown_keys().is_empty());

        let props = serde_json::json!({"bold": 2});
        assert!(SpecCellFormat::from_props(props.as_object().expect("object")).is_err());
    }

    #[test]
    fn test_worksheet_null_sections_parse_as_empty() {
        let sheet: SpecWorksheet = serde_json::from_value(serde_json::json!({
            "label": "S1",
            "cells": [],
            "columns": null,
            "images": null,
        }))
        .expect("parse worksheet");

        assert!(sheet.columns.is_empty());
        assert!(sheet.images.is_empty());
        assert_eq!(sheet.autofilter, None);
    }

    #[test]
    fn test_worksheet_serialization_omits_empty_sections_but_keeps_cells() {
        let sheet = SpecWorksheet {
            label: "S1".to_string(),
            ..Default::default()
        };

        let value = serde_json::to_value(&sheet).expect("serialize worksheet");
        assert_eq!(value, serde_json::json!({"label": "S1", "cells": []}));
    }

    #[test]
    fn test_cell_value_variants() {
        let l_values: Vec<EnumCellValue> =
            serde_json::from_str(r#"[true, 3, 2.5, "x"]"#).expect("parse values");
        assert_eq!(
            l_values,
            vec![
                EnumCellValue::Boolean(true),
                EnumCellValue::Number(3.0),
                EnumCellValue::Number(2.5),
                EnumCellValue::String("x".to_string()),
            ]
        );
        assert!(serde_json::from_str::<EnumCellValue>("null").is_err());
    }

    #[test]
    fn test_table_and_merged_ranges_are_flattened() {
        let table: SpecTable = serde_json::from_value(serde_json::json!({
            "first_row": 1, "first_col": 0, "last_row": 4, "last_col": 2,
        }))
        .expect("parse table");
        assert_eq!(table.range, SpecRange::new(1, 0, 4, 2));
        assert!(table.options.is_empty());

        let merged = SpecMergedCell {
            range: SpecRange::new(0, 0, 0, 3),
            data: None,
            format: None,
        };
        let value = serde_json::to_value(&merged).expect("serialize merged");
        assert_eq!(
            value,
            serde_json::json!({
                "first_row": 0, "first_col": 0, "last_row": 0, "last_col": 3, "data": null,
            })
        );
    }

    #[test]
    fn test_cell_format_keeps_unknown_keys_aside() {
        let mut props = SpecFormatProps::new();
        props.insert("bold".to_string(), Value::Bool(true));
        props.insert("num_format".to_string(), Value::from(14));
        props.insert("pattern".to_string(), Value::from(1));

        let fmt = SpecCellFormat::from_props(&props).expect("parse format");
        assert_eq!(fmt.bold, Some(true));
        assert_eq!(fmt.num_format, Some(EnumNumFormat::Index(14)));
        assert_eq!(fmt.unknown_keys(), vec!["pattern"]);
    }

    #[test]
    fn test_cell_format_rejects_wrong_types() {
        let mut props = SpecFormatProps::new();
        props.insert("bold".to_string(), Value::from("yes"));
        assert!(SpecCellFormat::from_props(&props).is_err());
    }

    #[test]
    fn test_table_options_defaults() {
        let options: SpecTableOptions = serde_json::from_value(serde_json::json!({
            "columns": [{"header": "A", "format": "money"}],
        }))
        .expect("parse table options");
        assert_eq!(options.header_row, None);
        assert_eq!(options.columns.len(), 1);
        assert_eq!(options.columns[0].format.as_deref(), Some("money"));
        assert!(options.data.is_empty());
    }
}
