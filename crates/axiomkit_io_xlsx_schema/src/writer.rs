//! Engine seam and its `rust_xlsxwriter` implementation.

use std::collections::BTreeSet;

use rust_xlsxwriter::{
    Format, FormatAlign, FormatBorder, FormatUnderline, Formula, Image, Table, TableColumn,
    TableFunction, TableStyle, Url, Workbook, Worksheet, XlsxError,
};
use tracing::warn;

use crate::error::RenderError;
use crate::spec::{
    EnumCellValue, EnumNumFormat, SpecCellFormat, SpecColumn, SpecFormatProps, SpecFrozenPane,
    SpecHyperlink, SpecImageOptions, SpecLineOptions, SpecRange, SpecRenderOptions,
    SpecRenderReport, SpecRow, SpecTableOptions,
};
use crate::util::{derive_unique_sheet_name, sanitize_sheet_name};

////////////////////////////////////////////////////////////////////////////////
// #region EngineSeam

/// Capability set the translator drives.
///
/// Worksheets are addressed by the index returned from [`Self::add_worksheet`].
/// Formats are engine objects produced by [`Self::add_format`].
pub trait SheetEngine {
    type Format: Clone;

    fn add_format(&mut self, key: &str, props: &SpecFormatProps)
    -> Result<Self::Format, RenderError>;

    fn add_worksheet(&mut self, label: &str) -> Result<usize, RenderError>;

    fn set_column(
        &mut self,
        sheet: usize,
        column: &SpecColumn,
        format: Option<&Self::Format>,
    ) -> Result<(), RenderError>;

    fn set_row(
        &mut self,
        sheet: usize,
        row: &SpecRow,
        format: Option<&Self::Format>,
    ) -> Result<(), RenderError>;

    fn write(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        value: &EnumCellValue,
        format: Option<&Self::Format>,
    ) -> Result<(), RenderError>;

    fn write_formula(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        formula: &str,
        format: Option<&Self::Format>,
        default_value: i64,
    ) -> Result<(), RenderError>;

    fn insert_image(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        data: &[u8],
        options: &SpecImageOptions,
    ) -> Result<(), RenderError>;

    fn write_url(
        &mut self,
        sheet: usize,
        hyperlink: &SpecHyperlink,
        format: Option<&Self::Format>,
    ) -> Result<(), RenderError>;

    /// `column_formats[i]` is the resolved format of `options.columns[i]`.
    fn add_table(
        &mut self,
        sheet: usize,
        range: &SpecRange,
        options: &SpecTableOptions,
        column_formats: &[Option<Self::Format>],
    ) -> Result<(), RenderError>;

    fn merge_range(
        &mut self,
        sheet: usize,
        range: &SpecRange,
        data: Option<&EnumCellValue>,
        format: Option<&Self::Format>,
    ) -> Result<(), RenderError>;

    fn autofilter(&mut self, sheet: usize, range: &SpecRange) -> Result<(), RenderError>;

    fn freeze_panes(&mut self, sheet: usize, pane: &SpecFrozenPane) -> Result<(), RenderError>;

    /// Produce the finished package. Called once, after every worksheet is complete.
    fn finalize(&mut self) -> Result<Vec<u8>, RenderError>;
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region XlsxWriter

/// In-memory workbook writer over `rust_xlsxwriter`.
pub struct XlsxWriter {
    workbook: Workbook,
    options: SpecRenderOptions,
    set_sheet_names_existing: BTreeSet<String>,
    report: SpecRenderReport,
}

impl Default for XlsxWriter {
    fn default() -> Self {
        Self::new(SpecRenderOptions::default())
    }
}

impl XlsxWriter {
    pub fn new(options: SpecRenderOptions) -> Self {
        Self {
            workbook: Workbook::new(),
            options,
            set_sheet_names_existing: BTreeSet::new(),
            report: SpecRenderReport::default(),
        }
    }

    /// Final sheet names and warnings collected so far.
    pub fn report(&self) -> SpecRenderReport {
        self.report.clone()
    }

    fn worksheet(&mut self, sheet: usize) -> Result<&mut Worksheet, RenderError> {
        self.workbook
            .worksheet_from_index(sheet)
            .map_err(derive_render_error)
    }
}

impl SheetEngine for XlsxWriter {
    type Format = Format;

    fn add_format(&mut self, key: &str, props: &SpecFormatProps) -> Result<Format, RenderError> {
        let spec = SpecCellFormat::from_props(props).map_err(|err| RenderError::InvalidFormat {
            key: key.to_string(),
            message: err.to_string(),
        })?;
        let l_keys_unknown = spec.unknown_keys();
        if !l_keys_unknown.is_empty() {
            warn!(
                format_key = key,
                ignored = ?l_keys_unknown,
                "ignoring unsupported format properties"
            );
            self.report.warn(format!(
                "Format {key:?}: ignored unsupported properties {l_keys_unknown:?}."
            ));
        }
        Ok(derive_rust_xlsx_format(&spec))
    }

    fn add_worksheet(&mut self, label: &str) -> Result<usize, RenderError> {
        let c_sheet_name = if self.options.if_sanitize_sheet_names {
            let c_sanitized = sanitize_sheet_name(label, "_");
            let c_unique =
                derive_unique_sheet_name(&c_sanitized, &mut self.set_sheet_names_existing);
            if c_unique != label {
                warn!(label, sheet_name = %c_unique, "renamed worksheet");
                self.report
                    .warn(format!("Worksheet {label:?} renamed to {c_unique:?}."));
            }
            c_unique
        } else {
            label.to_string()
        };

        let n_idx_sheet = self.report.sheets.len();
        self.workbook
            .add_worksheet()
            .set_name(&c_sheet_name)
            .map_err(derive_render_error)?;
        self.report.sheets.push(c_sheet_name);
        Ok(n_idx_sheet)
    }

    fn set_column(
        &mut self,
        sheet: usize,
        column: &SpecColumn,
        format: Option<&Format>,
    ) -> Result<(), RenderError> {
        let worksheet = self.worksheet(sheet)?;
        for n_col in column.first_col..=column.last_col {
            if let Some(n_width) = column.width {
                worksheet
                    .set_column_width(n_col, n_width)
                    .map_err(derive_render_error)?;
            }
            if let Some(fmt) = format {
                worksheet
                    .set_column_format(n_col, fmt)
                    .map_err(derive_render_error)?;
            }
            if column.options.is_some_and(|options| options.hidden) {
                worksheet
                    .set_column_hidden(n_col)
                    .map_err(derive_render_error)?;
            }
        }
        if let Some(options) = &column.options {
            apply_outline(options, |if_collapsed| {
                let result = if if_collapsed {
                    worksheet.group_columns_collapsed(column.first_col, column.last_col)
                } else {
                    worksheet.group_columns(column.first_col, column.last_col)
                };
                result.map(|_| ())
            })?;
        }
        Ok(())
    }

    fn set_row(
        &mut self,
        sheet: usize,
        row: &SpecRow,
        format: Option<&Format>,
    ) -> Result<(), RenderError> {
        let worksheet = self.worksheet(sheet)?;
        if let Some(n_height) = row.height {
            worksheet
                .set_row_height(row.row, n_height)
                .map_err(derive_render_error)?;
        }
        if let Some(fmt) = format {
            worksheet
                .set_row_format(row.row, fmt)
                .map_err(derive_render_error)?;
        }
        if let Some(options) = &row.options {
            if options.hidden {
                worksheet
                    .set_row_hidden(row.row)
                    .map_err(derive_render_error)?;
            }
            apply_outline(options, |if_collapsed| {
                let result = if if_collapsed {
                    worksheet.group_rows_collapsed(row.row, row.row)
                } else {
                    worksheet.group_rows(row.row, row.row)
                };
                result.map(|_| ())
            })?;
        }
        Ok(())
    }

    fn write(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        value: &EnumCellValue,
        format: Option<&Format>,
    ) -> Result<(), RenderError> {
        let worksheet = self.worksheet(sheet)?;
        write_cell_with_format(worksheet, row, col, value, format)
    }

    fn write_formula(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        formula: &str,
        format: Option<&Format>,
        default_value: i64,
    ) -> Result<(), RenderError> {
        let worksheet = self.worksheet(sheet)?;
        let formula = Formula::new(formula).set_result(default_value.to_string());
        let result = match format {
            Some(fmt) => worksheet.write_formula_with_format(row, col, formula, fmt),
            None => worksheet.write_formula(row, col, formula),
        };
        result.map_err(derive_render_error)?;
        Ok(())
    }

    fn insert_image(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        data: &[u8],
        options: &SpecImageOptions,
    ) -> Result<(), RenderError> {
        let mut image = Image::new_from_buffer(data)
            .map_err(derive_render_error)?
            .set_scale_width(options.x_scale)
            .set_scale_height(options.y_scale);
        if let Some(c_description) = &options.description {
            image = image.set_alt_text(c_description);
        }

        let worksheet = self.worksheet(sheet)?;
        let result = if options.x_offset == 0 && options.y_offset == 0 {
            worksheet.insert_image(row, col, &image)
        } else {
            worksheet.insert_image_with_offset(row, col, &image, options.x_offset, options.y_offset)
        };
        result.map_err(derive_render_error)?;
        Ok(())
    }

    fn write_url(
        &mut self,
        sheet: usize,
        hyperlink: &SpecHyperlink,
        format: Option<&Format>,
    ) -> Result<(), RenderError> {
        let mut url = Url::new(hyperlink.url.as_str());
        if let Some(c_label) = &hyperlink.label {
            url = url.set_text(c_label);
        }
        if let Some(c_tip) = &hyperlink.tip {
            url = url.set_tip(c_tip);
        }

        let worksheet = self.worksheet(sheet)?;
        let result = match format {
            Some(fmt) => worksheet.write_url_with_format(hyperlink.row, hyperlink.col, url, fmt),
            None => worksheet.write_url(hyperlink.row, hyperlink.col, url),
        };
        result.map_err(derive_render_error)?;
        Ok(())
    }

    fn add_table(
        &mut self,
        sheet: usize,
        range: &SpecRange,
        options: &SpecTableOptions,
        column_formats: &[Option<Format>],
    ) -> Result<(), RenderError> {
        let c_sheet_name = self.report.sheets.get(sheet).cloned().unwrap_or_default();
        let derive_options_error = |message: String| RenderError::InvalidOptions {
            sheet: c_sheet_name.clone(),
            feature: "table",
            message,
        };

        let if_header_row = options.header_row.unwrap_or(true);
        let mut table = Table::new()
            .set_header_row(if_header_row)
            .set_total_row(options.total_row)
            .set_autofilter(options.autofilter.unwrap_or(true))
            .set_banded_rows(options.banded_rows.unwrap_or(true))
            .set_banded_columns(options.banded_columns)
            .set_first_column(options.first_column)
            .set_last_column(options.last_column);
        if let Some(c_name) = &options.name {
            table = table.set_name(c_name);
        }
        if let Some(c_style) = &options.style {
            let style = derive_table_style(c_style)
                .ok_or_else(|| derive_options_error(format!("unknown table style {c_style:?}")))?;
            table = table.set_style(style);
        }

        let mut l_columns = Vec::with_capacity(options.columns.len());
        for (n_idx, spec_column) in options.columns.iter().enumerate() {
            let mut column = TableColumn::new();
            if let Some(c_header) = &spec_column.header {
                column = column.set_header(c_header);
            }
            if let Some(Some(fmt)) = column_formats.get(n_idx) {
                column = column.set_format(fmt.clone());
            }
            if let Some(c_function) = &spec_column.total_function {
                let function = derive_table_function(c_function).ok_or_else(|| {
                    derive_options_error(format!("unknown total function {c_function:?}"))
                })?;
                column = column.set_total_function(function);
            }
            if let Some(c_label) = &spec_column.total_string {
                column = column.set_total_label(c_label);
            }
            if let Some(c_formula) = &spec_column.formula {
                column = column.set_formula(Formula::new(c_formula));
            }
            l_columns.push(column);
        }
        if !l_columns.is_empty() {
            table = table.set_columns(&l_columns);
        }

        let worksheet = self.worksheet(sheet)?;
        let n_row_body_first = range.first_row as usize + usize::from(if_header_row);
        for (n_idx_row, l_values) in options.data.iter().enumerate() {
            let n_row = cast_row_num(n_row_body_first + n_idx_row)?;
            for (n_idx_col, value) in l_values.iter().enumerate() {
                let Some(value) = value else {
                    continue;
                };
                let n_col = cast_col_num(range.first_col as usize + n_idx_col)?;
                let format = column_formats.get(n_idx_col).and_then(Option::as_ref);
                write_cell_with_format(worksheet, n_row, n_col, value, format)?;
            }
        }

        worksheet
            .add_table(
                range.first_row,
                range.first_col,
                range.last_row,
                range.last_col,
                &table,
            )
            .map_err(derive_render_error)?;
        Ok(())
    }

    fn merge_range(
        &mut self,
        sheet: usize,
        range: &SpecRange,
        data: Option<&EnumCellValue>,
        format: Option<&Format>,
    ) -> Result<(), RenderError> {
        let c_sheet_name = self.report.sheets.get(sheet).cloned().unwrap_or_default();
        let if_single_cell =
            range.first_row == range.last_row && range.first_col == range.last_col;
        if if_single_cell {
            warn!(
                worksheet = %c_sheet_name,
                row = range.first_row,
                col = range.first_col,
                "single-cell merge written as a plain cell"
            );
            self.report.warn(format!(
                "Worksheet {c_sheet_name:?}: merged range at row {}, column {} covers one cell; \
                 wrote the cell without merging.",
                range.first_row, range.first_col
            ));
        }

        let worksheet = self.worksheet(sheet)?;
        let fmt_default = Format::new();
        let fmt = format.unwrap_or(&fmt_default);
        if if_single_cell {
            return match data {
                Some(value) => write_cell_with_format(
                    worksheet,
                    range.first_row,
                    range.first_col,
                    value,
                    Some(fmt),
                ),
                None => {
                    worksheet
                        .write_blank(range.first_row, range.first_col, fmt)
                        .map_err(derive_render_error)?;
                    Ok(())
                }
            };
        }

        let c_text = match data {
            Some(EnumCellValue::String(val)) => val.as_str(),
            _ => "",
        };
        worksheet
            .merge_range(
                range.first_row,
                range.first_col,
                range.last_row,
                range.last_col,
                c_text,
                fmt,
            )
            .map_err(derive_render_error)?;

        // Non-text content overwrites the anchor cell written by `merge_range`.
        if let Some(value) = data
            && matches!(value, EnumCellValue::Number(_) | EnumCellValue::Boolean(_))
        {
            write_cell_with_format(
                worksheet,
                range.first_row,
                range.first_col,
                value,
                Some(fmt),
            )?;
        }
        Ok(())
    }

    fn autofilter(&mut self, sheet: usize, range: &SpecRange) -> Result<(), RenderError> {
        self.worksheet(sheet)?
            .autofilter(
                range.first_row,
                range.first_col,
                range.last_row,
                range.last_col,
            )
            .map_err(derive_render_error)?;
        Ok(())
    }

    fn freeze_panes(&mut self, sheet: usize, pane: &SpecFrozenPane) -> Result<(), RenderError> {
        let worksheet = self.worksheet(sheet)?;
        worksheet
            .set_freeze_panes(pane.row, pane.col)
            .map_err(derive_render_error)?;
        if pane.top_row.is_some() || pane.left_col.is_some() {
            worksheet
                .set_freeze_panes_top_cell(
                    pane.top_row.unwrap_or(pane.row),
                    pane.left_col.unwrap_or(pane.col),
                )
                .map_err(derive_render_error)?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>, RenderError> {
        self.workbook.save_to_buffer().map_err(derive_render_error)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellWrites

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &EnumCellValue,
    format: Option<&Format>,
) -> Result<(), RenderError> {
    let fmt_default = Format::new();
    let fmt = format.unwrap_or(&fmt_default);
    let result = match value {
        EnumCellValue::String(val) if val.starts_with('=') => {
            worksheet.write_formula_with_format(row, col, Formula::new(val), fmt)
        }
        EnumCellValue::String(val) => worksheet.write_string_with_format(row, col, val, fmt),
        EnumCellValue::Number(val) => worksheet.write_number_with_format(row, col, *val, fmt),
        EnumCellValue::Boolean(val) => worksheet.write_boolean_with_format(row, col, *val, fmt),
    };
    result.map_err(derive_render_error)?;
    Ok(())
}

/// Nest an outline group `options.level` times; the outermost call carries the collapsed flag.
fn apply_outline(
    options: &SpecLineOptions,
    mut group: impl FnMut(bool) -> Result<(), XlsxError>,
) -> Result<(), RenderError> {
    for n_level in 1..=options.level {
        group(options.collapsed && n_level == 1).map_err(derive_render_error)?;
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FormatMapping

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }
    if let Some(val) = spec.underline {
        format = format.set_underline(derive_format_underline(val));
    }
    if spec.font_strikeout.unwrap_or(false) {
        format = format.set_font_strikethrough();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_valign(val)
    {
        format = format.set_align(align);
    }

    match &spec.num_format {
        Some(EnumNumFormat::Code(val)) => format = format.set_num_format(val.clone()),
        Some(EnumNumFormat::Index(val)) => format = format.set_num_format_index(*val),
        None => {}
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if let Some(val) = spec.top {
        format = format.set_border_top(derive_format_border(val));
    }
    if let Some(val) = spec.bottom {
        format = format.set_border_bottom(derive_format_border(val));
    }
    if let Some(val) = spec.left {
        format = format.set_border_left(derive_format_border(val));
    }
    if let Some(val) = spec.right {
        format = format.set_border_right(derive_format_border(val));
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }
    if spec.shrink.unwrap_or(false) {
        format = format.set_shrink();
    }
    if let Some(val) = spec.rotation {
        format = format.set_rotation(val);
    }
    if let Some(val) = spec.indent {
        format = format.set_indent(val);
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        0 => FormatBorder::None,
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        8 => FormatBorder::MediumDashed,
        9 => FormatBorder::DashDot,
        10 => FormatBorder::MediumDashDot,
        11 => FormatBorder::DashDotDot,
        12 => FormatBorder::MediumDashDotDot,
        13 => FormatBorder::SlantDashDot,
        _ => FormatBorder::None,
    }
}

fn derive_format_underline(underline: u8) -> FormatUnderline {
    match underline {
        1 => FormatUnderline::Single,
        2 => FormatUnderline::Double,
        33 => FormatUnderline::SingleAccounting,
        34 => FormatUnderline::DoubleAccounting,
        _ => FormatUnderline::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "center_across" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        "vjustify" | "vertical_justify" => Some(FormatAlign::VerticalJustify),
        "vdistributed" | "vertical_distributed" => Some(FormatAlign::VerticalDistributed),
        _ => None,
    }
}

/// Vertical alignment accepts the bare names as well (`center` means vertical center).
fn derive_format_valign(valign: &str) -> Option<FormatAlign> {
    match valign.trim().to_ascii_lowercase().as_str() {
        "center" => Some(FormatAlign::VerticalCenter),
        "justify" => Some(FormatAlign::VerticalJustify),
        "distributed" => Some(FormatAlign::VerticalDistributed),
        value => derive_format_align(value),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableMapping

/// Parse `"Table Style Medium 9"`, `"TableStyleMedium9"` or `"none"`.
fn derive_table_style(name: &str) -> Option<TableStyle> {
    let c_compact: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    let c_compact = c_compact.strip_prefix("tablestyle").unwrap_or(&c_compact);

    if c_compact == "none" {
        return Some(TableStyle::None);
    }
    let n_split = c_compact.find(|c: char| c.is_ascii_digit())?;
    let (c_family, c_number) = c_compact.split_at(n_split);
    let n_number: u8 = c_number.parse().ok()?;

    let style = match (c_family, n_number) {
        ("light", 1) => TableStyle::Light1,
        ("light", 2) => TableStyle::Light2,
        ("light", 3) => TableStyle::Light3,
        ("light", 4) => TableStyle::Light4,
        ("light", 5) => TableStyle::Light5,
        ("light", 6) => TableStyle::Light6,
        ("light", 7) => TableStyle::Light7,
        ("light", 8) => TableStyle::Light8,
        ("light", 9) => TableStyle::Light9,
        ("light", 10) => TableStyle::Light10,
        ("light", 11) => TableStyle::Light11,
        ("light", 12) => TableStyle::Light12,
        ("light", 13) => TableStyle::Light13,
        ("light", 14) => TableStyle::Light14,
        ("light", 15) => TableStyle::Light15,
        ("light", 16) => TableStyle::Light16,
        ("light", 17) => TableStyle::Light17,
        ("light", 18) => TableStyle::Light18,
        ("light", 19) => TableStyle::Light19,
        ("light", 20) => TableStyle::Light20,
        ("light", 21) => TableStyle::Light21,
        ("medium", 1) => TableStyle::Medium1,
        ("medium", 2) => TableStyle::Medium2,
        ("medium", 3) => TableStyle::Medium3,
        ("medium", 4) => TableStyle::Medium4,
        ("medium", 5) => TableStyle::Medium5,
        ("medium", 6) => TableStyle::Medium6,
        ("medium", 7) => TableStyle::Medium7,
        ("medium", 8) => TableStyle::Medium8,
        ("medium", 9) => TableStyle::Medium9,
        ("medium", 10) => TableStyle::Medium10,
        ("medium", 11) => TableStyle::Medium11,
        ("medium", 12) => TableStyle::Medium12,
        ("medium", 13) => TableStyle::Medium13,
        ("medium", 14) => TableStyle::Medium14,
        ("medium", 15) => TableStyle::Medium15,
        ("medium", 16) => TableStyle::Medium16,
        ("medium", 17) => TableStyle::Medium17,
        ("medium", 18) => TableStyle::Medium18,
        ("medium", 19) => TableStyle::Medium19,
        ("medium", 20) => TableStyle::Medium20,
        ("medium", 21) => TableStyle::Medium21,
        ("medium", 22) => TableStyle::Medium22,
        ("medium", 23) => TableStyle::Medium23,
        ("medium", 24) => TableStyle::Medium24,
        ("medium", 25) => TableStyle::Medium25,
        ("medium", 26) => TableStyle::Medium26,
        ("medium", 27) => TableStyle::Medium27,
        ("medium", 28) => TableStyle::Medium28,
        ("dark", 1) => TableStyle::Dark1,
        ("dark", 2) => TableStyle::Dark2,
        ("dark", 3) => TableStyle::Dark3,
        ("dark", 4) => TableStyle::Dark4,
        ("dark", 5) => TableStyle::Dark5,
        ("dark", 6) => TableStyle::Dark6,
        ("dark", 7) => TableStyle::Dark7,
        ("dark", 8) => TableStyle::Dark8,
        ("dark", 9) => TableStyle::Dark9,
        ("dark", 10) => TableStyle::Dark10,
        ("dark", 11) => TableStyle::Dark11,
        _ => return None,
    };
    Some(style)
}

fn derive_table_function(name: &str) -> Option<TableFunction> {
    match name.trim().to_ascii_lowercase().as_str() {
        "average" => Some(TableFunction::Average),
        "count" => Some(TableFunction::Count),
        "count_nums" => Some(TableFunction::CountNumbers),
        "max" => Some(TableFunction::Max),
        "min" => Some(TableFunction::Min),
        "std_dev" => Some(TableFunction::StdDev),
        "sum" => Some(TableFunction::Sum),
        "var" => Some(TableFunction::Var),
        _ => None,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Casting

fn cast_row_num(value: usize) -> Result<u32, RenderError> {
    u32::try_from(value).map_err(|_| RenderError::Engine(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16, RenderError> {
    u16::try_from(value).map_err(|_| RenderError::Engine(format!("column index overflow: {value}")))
}

fn derive_render_error(err: XlsxError) -> RenderError {
    RenderError::Engine(err.to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_props(value: serde_json::Value) -> SpecFormatProps {
        match value {
            serde_json::Value::Object(props) => props,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_derive_table_style() {
        assert!(matches!(
            derive_table_style("Table Style Medium 9"),
            Some(TableStyle::Medium9)
        ));
        assert!(matches!(
            derive_table_style("TableStyleLight15"),
            Some(TableStyle::Light15)
        ));
        assert!(matches!(derive_table_style("None"), Some(TableStyle::None)));
        assert!(derive_table_style("Table Style Medium 29").is_none());
        assert!(derive_table_style("fancy").is_none());
    }

    #[test]
    fn test_add_worksheet_sanitizes_and_deduplicates() {
        let mut writer = XlsxWriter::default();
        assert_eq!(writer.add_worksheet("Data").expect("sheet"), 0);
        assert_eq!(writer.add_worksheet("Data").expect("sheet"), 1);
        assert_eq!(writer.add_worksheet("a/b").expect("sheet"), 2);

        let report = writer.report();
        assert_eq!(report.sheets, vec!["Data", "Data__2", "a_b"]);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_add_worksheet_without_sanitizing_rejects_illegal_names() {
        let mut writer = XlsxWriter::new(SpecRenderOptions {
            if_sanitize_sheet_names: false,
        });
        assert!(matches!(
            writer.add_worksheet("a/b"),
            Err(RenderError::Engine(_))
        ));
    }

    #[test]
    fn test_add_format_warns_on_unknown_keys_and_fails_on_wrong_types() {
        let mut writer = XlsxWriter::default();
        writer
            .add_format("b", &derive_props(serde_json::json!({"bold": true, "pattern": 1})))
            .expect("format");
        assert_eq!(writer.report().warnings.len(), 1);

        let err = writer
            .add_format("bad", &derive_props(serde_json::json!({"font_size": "big"})))
            .expect_err("wrong type");
        assert!(matches!(err, RenderError::InvalidFormat { ref key, .. } if key == "bad"));
    }

    #[test]
    fn test_add_format_accepts_integer_flags() {
        let mut writer = XlsxWriter::default();
        writer
            .add_format("b", &derive_props(serde_json::json!({"bold": 1, "border": 1})))
            .expect("integer flag");
        assert!(writer.report().warnings.is_empty());
    }

    #[test]
    fn test_unknown_table_style_is_invalid_options() {
        let mut writer = XlsxWriter::default();
        let n_sheet = writer.add_worksheet("S1").expect("sheet");
        let options = SpecTableOptions {
            style: Some("Table Style Shiny 1".to_string()),
            ..Default::default()
        };

        let err = writer
            .add_table(n_sheet, &SpecRange::new(0, 0, 3, 1), &options, &[])
            .expect_err("unknown style");
        assert!(matches!(
            err,
            RenderError::InvalidOptions { feature: "table", ref sheet, .. } if sheet == "S1"
        ));
    }

    #[test]
    fn test_single_cell_merge_writes_plain_cell() {
        let mut writer = XlsxWriter::default();
        let n_sheet = writer.add_worksheet("S1").expect("sheet");
        writer
            .merge_range(
                n_sheet,
                &SpecRange::new(2, 1, 2, 1),
                Some(&EnumCellValue::Number(4.0)),
                None,
            )
            .expect("single-cell merge");
        writer
            .merge_range(n_sheet, &SpecRange::new(3, 1, 3, 1), None, None)
            .expect("empty single-cell merge");

        assert_eq!(writer.report().warnings.len(), 2);
        assert!(writer.finalize().is_ok());
    }

    #[test]
    fn test_table_data_past_row_limit_is_an_error() {
        let mut writer = XlsxWriter::default();
        let n_sheet = writer.add_worksheet("S1").expect("sheet");
        let options = SpecTableOptions {
            data: vec![vec![Some(EnumCellValue::from("x"))]],
            ..Default::default()
        };

        let err = writer
            .add_table(n_sheet, &SpecRange::new(u32::MAX, 0, u32::MAX, 0), &options, &[])
            .expect_err("row overflow");
        assert!(matches!(err, RenderError::Engine(_)));
    }

    #[test]
    fn test_finalize_produces_zip_package() {
        let mut writer = XlsxWriter::default();
        let n_sheet = writer.add_worksheet("S1").expect("sheet");
        writer
            .write(n_sheet, 0, 0, &EnumCellValue::from("Hi"), None)
            .expect("write");
        writer
            .write(n_sheet, 1, 0, &EnumCellValue::from("=1+1"), None)
            .expect("write formula-like string");

        let v_bytes = writer.finalize().expect("finalize");
        assert_eq!(&v_bytes[..2], b"PK");
    }
}
