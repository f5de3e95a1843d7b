use thiserror::Error;

pub type DashboardResult<T> = Result<T, DashboardError>;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Errors raised while validating the dashboard configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown IANA time zone: '{0}'")]
    InvalidTimeZone(String),

    #[error("Invalid bucket width '{value}': {msg}")]
    InvalidBucketWidth { value: String, msg: String },

    #[error("Invalid week span {start}..{end}: {msg}")]
    InvalidWeekSpan {
        start: String,
        end: String,
        msg: String,
    },

    #[error("Week index {index} out of range (catalogue holds {len} weeks)")]
    WeekOutOfRange { index: usize, len: usize },

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Invalid chart size: {0}")]
    InvalidChartSize(String),
}

/// Errors related to data loading, parsing and frame manipulation.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Input contains no data rows")]
    EmptyInput,

    #[error("Unparseable timestamp at row {row}: '{value}'")]
    TimestampParse { row: usize, value: String },

    #[error("Missing timestamp at row {0}")]
    MissingTimestamp(usize),

    #[error("Unexpected column type for '{column}': {dtype}")]
    UnexpectedType { column: String, dtype: String },

    #[error("Data frame error: {0}")]
    DataFrame(String),
}

/// Errors related to file I/O and input formats.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed")]
    Json(#[from] serde_json::Error),

    #[error("Input file not found: {0}")]
    NotFound(String),

    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("Failed to read data: {0}")]
    ReadFailed(String),

    #[error("Failed to write output: {0}")]
    WriteFailed(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Errors raised while drawing charts.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to draw chart '{chart}': {msg}")]
    Draw { chart: String, msg: String },
}

pub(crate) fn polars_err(context: &str, e: polars::error::PolarsError) -> DashboardError {
    DashboardError::Data(DataError::DataFrame(format!("{context}: {e}")))
}
