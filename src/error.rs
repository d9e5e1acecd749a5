use thiserror::Error;

/// Recoverable conditions raised by the aggregation pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("No data available for the selected filters.")]
    EmptySelectionResult,

    #[error("year-over-year needs two distinct years, found {distinct_years}")]
    InsufficientYearRange { distinct_years: usize },

    #[error("year-over-year is undefined: {year} sales total is zero")]
    ZeroBaseline { year: i32 },

    #[error("aggregation requested without any measure")]
    NoMeasures,
}

/// Load-time rejections. Surfaced through `anyhow` and recoverable by downcast.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("workbook has no sheet named '{0}'")]
    SheetNotFound(String),

    #[error("workbook contains no sheets")]
    EmptyWorkbook,
}

impl LoadError {
    pub(crate) fn malformed(row: usize, reason: impl Into<String>) -> Self {
        LoadError::MalformedRecord {
            row,
            reason: reason.into(),
        }
    }
}
