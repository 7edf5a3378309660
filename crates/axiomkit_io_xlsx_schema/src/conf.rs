//! Schema constants and default preset factories.

use crate::spec::{SpecHttpFetchOptions, SpecRenderOptions};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Upper bound for short schema strings (filename, labels, format keys, hyperlink text).
pub const N_LEN_SCHEMA_TEXT_MAX: usize = 255;
/// Upper bound for formula text and image URLs.
pub const N_LEN_SCHEMA_LONG_TEXT_MAX: usize = 1024;

/// Cached formula result written when a formula carries no `default_value`.
pub const N_FORMULA_DEFAULT_VALUE: i64 = 0;

/// Deepest row/column outline level Excel supports.
pub const N_OUTLINE_LEVEL_MAX: u8 = 7;

/// Content type announced for rendered workbooks.
pub const C_XLSX_CONTENT_TYPE: &str = "application/vnd.ms-excel";

/// Sheet name used when sanitizing leaves nothing behind.
pub const C_SHEET_NAME_FALLBACK: &str = "Sheet";

/// Build default render options.
pub fn derive_default_render_options() -> SpecRenderOptions {
    SpecRenderOptions::default()
}

/// Build default HTTP fetch options.
pub fn derive_default_http_fetch_options() -> SpecHttpFetchOptions {
    SpecHttpFetchOptions::default()
}
