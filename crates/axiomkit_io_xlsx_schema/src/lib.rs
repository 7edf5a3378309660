//! `axiomkit_io_xlsx_schema` v1:
//! Declarative XLSX workbook schema, builder and renderer.
//!
//! Modules:
//! - `conf`     : constants and default presets
//! - `spec`     : schema models and options
//! - `error`    : error taxonomy
//! - `builder`  : incremental schema construction with builder-time checks
//! - `validate` : request-time validation of external schema documents
//! - `fetch`    : remote image fetchers
//! - `render`   : schema translator and entry points
//! - `writer`   : engine seam and the `rust_xlsxwriter` engine
//! - `util`     : pure helper functions
pub mod builder;
pub mod conf;
pub mod error;
pub mod fetch;
pub mod render;
pub mod spec;
pub mod util;
pub mod validate;
pub mod writer;

pub use builder::{EnumRowEntry, WorkbookBuilder, WorksheetHandle, WorksheetWriter};
pub use conf::{
    C_XLSX_CONTENT_TYPE, N_FORMULA_DEFAULT_VALUE, N_LEN_SCHEMA_LONG_TEXT_MAX,
    N_LEN_SCHEMA_TEXT_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_OUTLINE_LEVEL_MAX,
};
pub use error::{
    ExportError, FetchError, RenderError, SchemaConstructionError, SchemaValidationError,
};
#[cfg(feature = "http")]
pub use fetch::HttpImageFetcher;
pub use fetch::{ImageFetcher, OfflineImageFetcher};
pub use render::{
    EnumSheetSection, SEQ_SHEET_SECTION_ORDER, SchemaRenderer, export_workbook_json,
    render_workbook,
};
pub use spec::{
    EnumCellValue, SpecCell, SpecColumn, SpecFormula, SpecFrozenPane, SpecHttpFetchOptions,
    SpecHyperlink, SpecImage, SpecLineOptions, SpecMergedCell, SpecRange, SpecRenderOptions,
    SpecRenderReport, SpecRenderedWorkbook, SpecRow, SpecTable, SpecWorkbook, SpecWorksheet,
};
pub use util::derive_content_disposition;
pub use validate::{parse_workbook_json, parse_workbook_value, validate_workbook};
pub use writer::{SheetEngine, XlsxWriter};
