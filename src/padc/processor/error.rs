use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ProcessorError>;

/// Error type covering the failures that stop a run of the processor.
///
/// Conditions that only affect individual programs (a section that could not
/// be located, two ranges that overlap) are not errors: they travel as
/// [`Diagnostic`](crate::boundary::Diagnostic) values next to the results.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when a processor profile is not valid TOML.
    #[error("profile parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Errors bubbled up from the CSV report writer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Raised when a workbook does not have the expected shape.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when a boundary configuration is requested by a name the store
    /// does not know.
    #[error("unknown boundary configuration '{0}'")]
    UnknownConfiguration(String),

    /// Raised when a name maps to a file already holding another configuration.
    #[error("boundary configuration '{name}' would replace '{existing}'")]
    ConfigurationNameClash { name: String, existing: String },

    /// Raised when a configuration without a name is saved.
    #[error("boundary configuration has no name")]
    UnnamedConfiguration,

    /// Raised when an operation names a program that is not in the catalog.
    #[error("unknown program '{0}'")]
    UnknownProgram(String),

    /// Raised when an edit would leave a range with its start after its stop.
    #[error("invalid boundary for {program}: start row {start} is after stop row {stop}")]
    InvalidBoundary {
        program: String,
        start: usize,
        stop: usize,
    },

    /// Raised when the consolidation rule table cannot be applied safely.
    #[error("invalid consolidation rule {source_program} -> {target}: {reason}")]
    InvalidRule {
        source_program: String,
        target: String,
        reason: String,
    },

    /// Raised when a processor profile is structurally invalid.
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    /// Raised when extraction is requested but no program range is resolved.
    #[error("no program boundaries are resolved; detect or load boundaries first")]
    NoBoundaries,

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
