//! Schema translator: drives a [`SheetEngine`] from a validated [`SpecWorkbook`].

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::conf::N_FORMULA_DEFAULT_VALUE;
use crate::error::{ExportError, RenderError};
use crate::fetch::ImageFetcher;
use crate::spec::{
    SpecImage, SpecImageOptions, SpecOptionsMap, SpecRenderOptions, SpecRenderReport,
    SpecRenderedWorkbook, SpecTableOptions, SpecWorkbook, SpecWorksheet,
};
use crate::util::decode_image_data;
use crate::validate::parse_workbook_json;
use crate::writer::{SheetEngine, XlsxWriter};

////////////////////////////////////////////////////////////////////////////////
// #region SectionOrder

/// Worksheet feature sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSheetSection {
    Columns,
    Rows,
    Cells,
    Formulas,
    Images,
    Hyperlinks,
    Tables,
    MergedCells,
    /// Primary autofilter, then the additional regions.
    Autofilters,
    FrozenPanes,
}

/// Order in which sections of one worksheet reach the engine.
///
/// Column and row formats come first so later cell writes can override them;
/// frozen panes come last.
pub const SEQ_SHEET_SECTION_ORDER: [EnumSheetSection; 10] = [
    EnumSheetSection::Columns,
    EnumSheetSection::Rows,
    EnumSheetSection::Cells,
    EnumSheetSection::Formulas,
    EnumSheetSection::Images,
    EnumSheetSection::Hyperlinks,
    EnumSheetSection::Tables,
    EnumSheetSection::MergedCells,
    EnumSheetSection::Autofilters,
    EnumSheetSection::FrozenPanes,
];

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SchemaRenderer

/// Translator bound to an image fetcher.
pub struct SchemaRenderer<'a, F: ImageFetcher + ?Sized> {
    fetcher: &'a F,
    options: SpecRenderOptions,
}

impl<'a, F: ImageFetcher + ?Sized> SchemaRenderer<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self {
            fetcher,
            options: SpecRenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SpecRenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Render `schema` through `engine` and return the finished package.
    ///
    /// Any failure aborts before [`SheetEngine::finalize`], so no bytes exist
    /// for a failed render.
    pub fn render<E: SheetEngine>(
        &self,
        schema: &SpecWorkbook,
        engine: &mut E,
    ) -> Result<Vec<u8>, RenderError> {
        self.render_into(schema, engine, &mut SpecRenderReport::default())
    }

    /// Render through a fresh [`XlsxWriter`] and collect the report.
    pub fn render_workbook(
        &self,
        schema: &SpecWorkbook,
    ) -> Result<SpecRenderedWorkbook, RenderError> {
        let mut writer = XlsxWriter::new(self.options.clone());
        let mut report = SpecRenderReport::default();
        let bytes = self.render_into(schema, &mut writer, &mut report)?;

        let report_writer = writer.report();
        report.sheets = report_writer.sheets;
        report.warnings.extend(report_writer.warnings);

        Ok(SpecRenderedWorkbook {
            filename: schema.filename.clone(),
            bytes,
            report,
        })
    }

    fn render_into<E: SheetEngine>(
        &self,
        schema: &SpecWorkbook,
        engine: &mut E,
        report: &mut SpecRenderReport,
    ) -> Result<Vec<u8>, RenderError> {
        info!(
            filename = %schema.filename,
            n_worksheets = schema.worksheets.len(),
            "rendering workbook"
        );

        let mut dict_formats: BTreeMap<&str, E::Format> = BTreeMap::new();
        if let Some(formats) = &schema.formats {
            for (key, props) in formats {
                dict_formats.insert(key.as_str(), engine.add_format(key, props)?);
            }
        }

        for sheet in &schema.worksheets {
            self.render_worksheet(sheet, &dict_formats, engine, report)?;
        }

        let bytes = engine.finalize()?;
        info!(
            filename = %schema.filename,
            n_bytes = bytes.len(),
            cnt_images_fetched = report.cnt_images_fetched,
            "rendered workbook"
        );
        Ok(bytes)
    }

    fn render_worksheet<E: SheetEngine>(
        &self,
        sheet: &SpecWorksheet,
        dict_formats: &BTreeMap<&str, E::Format>,
        engine: &mut E,
        report: &mut SpecRenderReport,
    ) -> Result<(), RenderError> {
        let n_sheet = engine.add_worksheet(&sheet.label)?;
        let resolve = |key: Option<&str>| resolve_format(dict_formats, key, &sheet.label);

        for section in SEQ_SHEET_SECTION_ORDER {
            debug!(worksheet = %sheet.label, ?section, "applying section");
            match section {
                EnumSheetSection::Columns => {
                    for column in &sheet.columns {
                        engine.set_column(n_sheet, column, resolve(column.format.as_deref())?)?;
                    }
                }
                EnumSheetSection::Rows => {
                    for row in &sheet.rows {
                        engine.set_row(n_sheet, row, resolve(row.format.as_deref())?)?;
                    }
                }
                EnumSheetSection::Cells => {
                    for cell in &sheet.cells {
                        engine.write(
                            n_sheet,
                            cell.row,
                            cell.col,
                            &cell.value,
                            resolve(cell.format.as_deref())?,
                        )?;
                    }
                }
                EnumSheetSection::Formulas => {
                    for formula in &sheet.formulas {
                        engine.write_formula(
                            n_sheet,
                            formula.row,
                            formula.col,
                            &formula.formula,
                            resolve(formula.format.as_deref())?,
                            formula.default_value.unwrap_or(N_FORMULA_DEFAULT_VALUE),
                        )?;
                    }
                }
                EnumSheetSection::Images => {
                    for image in &sheet.images {
                        let options: SpecImageOptions =
                            parse_feature_options(&image.options, &sheet.label, "image")?;
                        let v_data =
                            self.derive_image_bytes(image, &options, &sheet.label, report)?;
                        engine.insert_image(n_sheet, image.row, image.col, &v_data, &options)?;
                    }
                }
                EnumSheetSection::Hyperlinks => {
                    for hyperlink in &sheet.hyperlinks {
                        let format = resolve(hyperlink.format.as_deref())?;
                        engine.write_url(n_sheet, hyperlink, format)?;
                    }
                }
                EnumSheetSection::Tables => {
                    for table in &sheet.tables {
                        let options: SpecTableOptions =
                            parse_feature_options(&table.options, &sheet.label, "table")?;
                        let l_column_formats = options
                            .columns
                            .iter()
                            .map(|column| resolve(column.format.as_deref()).map(|fmt| fmt.cloned()))
                            .collect::<Result<Vec<_>, _>>()?;
                        engine.add_table(n_sheet, &table.range, &options, &l_column_formats)?;
                    }
                }
                EnumSheetSection::MergedCells => {
                    for merged in &sheet.merged_cells {
                        engine.merge_range(
                            n_sheet,
                            &merged.range,
                            merged.data.as_ref(),
                            resolve(merged.format.as_deref())?,
                        )?;
                    }
                }
                EnumSheetSection::Autofilters => {
                    for range in sheet.autofilter.iter().chain(&sheet.autofilters) {
                        engine.autofilter(n_sheet, range)?;
                    }
                }
                EnumSheetSection::FrozenPanes => {
                    for pane in &sheet.frozen_panes {
                        engine.freeze_panes(n_sheet, pane)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Inline data wins over the URL; the URL is fetched only when no data is given.
    fn derive_image_bytes(
        &self,
        image: &SpecImage,
        options: &SpecImageOptions,
        sheet_label: &str,
        report: &mut SpecRenderReport,
    ) -> Result<Vec<u8>, RenderError> {
        if let Some(c_data) = options.image_data.as_deref()
            && !c_data.trim().is_empty()
        {
            return decode_image_data(c_data).map_err(|err| RenderError::InvalidImageData {
                sheet: sheet_label.to_string(),
                row: image.row,
                col: image.col,
                message: err.to_string(),
            });
        }

        if image.url.trim().is_empty() {
            return Err(RenderError::MissingImageSource {
                sheet: sheet_label.to_string(),
                row: image.row,
                col: image.col,
            });
        }

        debug!(url = %image.url, "fetching image");
        let v_data = self.fetcher.fetch(&image.url)?;
        report.cnt_images_fetched += 1;
        Ok(v_data)
    }
}

fn resolve_format<'f, T>(
    dict_formats: &'f BTreeMap<&str, T>,
    key: Option<&str>,
    sheet_label: &str,
) -> Result<Option<&'f T>, RenderError> {
    let Some(key) = key else {
        return Ok(None);
    };
    dict_formats
        .get(key)
        .map(Some)
        .ok_or_else(|| RenderError::UnknownFormat {
            sheet: sheet_label.to_string(),
            key: key.to_string(),
        })
}

fn parse_feature_options<T: DeserializeOwned>(
    options: &SpecOptionsMap,
    sheet_label: &str,
    feature: &'static str,
) -> Result<T, RenderError> {
    serde_json::from_value(Value::Object(options.clone())).map_err(|err| {
        RenderError::InvalidOptions {
            sheet: sheet_label.to_string(),
            feature,
            message: err.to_string(),
        }
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region EntryPoints

/// Render a validated schema to XLSX bytes with default options.
pub fn render_workbook<F: ImageFetcher + ?Sized>(
    schema: &SpecWorkbook,
    fetcher: &F,
) -> Result<SpecRenderedWorkbook, RenderError> {
    SchemaRenderer::new(fetcher).render_workbook(schema)
}

/// Parse, validate and render a raw JSON schema document.
pub fn export_workbook_json<F: ImageFetcher + ?Sized>(
    raw: &str,
    fetcher: &F,
) -> Result<SpecRenderedWorkbook, ExportError> {
    let schema = parse_workbook_json(raw)?;
    Ok(render_workbook(&schema, fetcher)?)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
