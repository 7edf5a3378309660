//! Error taxonomy for schema construction, validation and rendering.

/// Raised synchronously by a builder call; the builder state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaConstructionError {
    /// `add_format` called with a key that is already registered.
    #[error("A format with the key {key:?} already exists.")]
    DuplicateFormat { key: String },

    /// `write_row` entry that is neither empty, a string nor a `{value, format}` object.
    #[error("Row {row}, Column {col}: invalid column of type {kind} provided.")]
    InvalidColumnType { row: u32, col: u16, kind: String },

    /// Structured `write_row` entry without a value.
    #[error("Row {row}, Column {col} has no value. Pass an empty entry instead of an object.")]
    MissingValue { row: u32, col: u16 },

    /// Reference to a format key that was never registered.
    #[error("{location} refers to non-existent format {key:?}.")]
    UnknownFormat { location: String, key: String },

    /// Numeric cell value that is NaN or infinite and has no JSON encoding.
    #[error("{location}: number {value} is not finite.")]
    NonFiniteNumber { location: String, value: String },

    /// `write_row` called with more entries than a worksheet has columns.
    #[error("Row {row}: {n_cols} columns exceed the worksheet column limit.")]
    TooManyColumns { row: u32, n_cols: usize },

    /// `serialize` called before any worksheet was added.
    #[error("Trying to serialize an empty workbook.")]
    EmptyWorkbook,

    /// Schema could not be encoded as JSON.
    #[error("Failed to encode schema: {0}")]
    Encode(String),
}

/// Raised while checking an externally supplied schema, before any engine call.
#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    /// Document does not parse into the schema shape.
    #[error("Malformed schema: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Field-level constraint violation.
    #[error("{path}: {message}")]
    Invalid { path: String, message: String },

    /// A format is referenced but the workbook declares no formats map.
    #[error("{path}: format {key:?} referenced but the workbook declares no formats.")]
    MissingFormats { path: String, key: String },

    /// A format is referenced that the formats map does not declare.
    #[error("{path}: format key {key:?} not in formats.")]
    UnknownFormat { path: String, key: String },
}

impl SchemaValidationError {
    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Remote image fetch failure.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, TLS, timeout, body read).
    #[error("Failed to fetch {url}: {message}")]
    Request { url: String, message: String },

    /// Non-success HTTP status.
    #[error("Failed to fetch {url}: HTTP status {status}")]
    Status { url: String, status: u16 },

    /// Body exceeded the configured size limit.
    #[error("Failed to fetch {url}: body exceeds {n_bytes_max} bytes")]
    TooLarge { url: String, n_bytes_max: usize },
}

/// Render failure. No output bytes are produced once one is raised.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The engine rejected an operation.
    #[error("xlsx write error: {0}")]
    Engine(String),

    /// Remote image could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Image carries neither inline data nor a URL.
    #[error("Worksheet {sheet:?}: image at ({row}, {col}) has neither image_data nor url.")]
    MissingImageSource { sheet: String, row: u32, col: u16 },

    /// Inline image data is not valid base64.
    #[error("Worksheet {sheet:?}: image at ({row}, {col}) has invalid image_data: {message}")]
    InvalidImageData {
        sheet: String,
        row: u32,
        col: u16,
        message: String,
    },

    /// A format spec could not be interpreted.
    #[error("Format {key:?} is invalid: {message}")]
    InvalidFormat { key: String, message: String },

    /// Format key not registered with the engine.
    #[error("Worksheet {sheet:?}: format key {key:?} was never registered.")]
    UnknownFormat { sheet: String, key: String },

    /// Free-form feature options could not be interpreted.
    #[error("Worksheet {sheet:?}: invalid {feature} options: {message}")]
    InvalidOptions {
        sheet: String,
        feature: &'static str,
        message: String,
    },
}

/// Failure of the one-shot parse, validate and render entry point.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
