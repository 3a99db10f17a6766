//! Error types for the data-loader crate.
//!
//! Every failure here is fatal to loading: a run either gets a complete,
//! validated `RatingMatrix` or nothing at all.

use thiserror::Error;

/// Errors that can occur while loading, parsing or building the rating matrix
///
/// Rust concept: the `#[derive(Error)]` macro from thiserror implements
/// `std::error::Error` and `Display` from the `#[error(...)]` attributes
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A row could not be parsed into the required shape
    /// (non-numeric rating, missing ID, wrong number of fields)
    #[error("Malformed record at line {line} in {file}: {reason}")]
    MalformedRecord {
        file: String,
        line: usize,
        reason: String,
    },

    /// A field parsed but holds a value outside its domain
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Referenced entity doesn't exist (e.g., rating for non-existent movie)
    #[error("Missing reference: {entity} with id {id}")]
    MissingReference { entity: String, id: u32 },
}

impl DataLoadError {
    /// Convert a csv error into a loader error, keeping the line it came from
    pub(crate) fn from_csv(file: &str, err: csv::Error) -> Self {
        let line = err.position().map_or(0, |pos| pos.line() as usize);
        let reason = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(io) => DataLoadError::IoError(io),
            _ => DataLoadError::MalformedRecord {
                file: file.to_string(),
                line,
                reason,
            },
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
