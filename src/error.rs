//! Error types for the statement-harmonizer library.

use std::io;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading, parsing and harmonizing
/// bank statements.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred during read or write operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error reading CSV data.
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error reading a spreadsheet workbook.
    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(String),

    /// File extension is not one of the supported tabular kinds.
    #[error("Unsupported file type: {0}. Supported: .xlsx, .xls, .csv")]
    UnsupportedFormat(String),

    /// The resolved table contains no data rows.
    #[error("No data found in source: {0}")]
    EmptySource(String),

    /// None of the supported text encodings could decode the file.
    #[error("Could not decode source with any supported encoding: {0}")]
    UndecodableSource(String),

    /// Invalid date value (row-level, recoverable).
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid amount value (row-level, recoverable).
    #[error("Invalid amount format: {0}")]
    InvalidAmount(String),

    /// No parser is registered for the requested bank identifier.
    #[error("No parser registered for bank: {0}")]
    NoParserForBank(String),

    /// A column the bank parser relies on is missing from the table.
    #[error("Structural mismatch for bank {bank}: missing column '{column}'")]
    StructuralMismatch { bank: String, column: String },

    /// The storage collaborator failed to commit a batch.
    #[error("Insert failure: {0}")]
    InsertFailure(String),
}

impl From<calamine::Error> for Error {
    fn from(err: calamine::Error) -> Self {
        Error::SpreadsheetError(err.to_string())
    }
}
