//! Query error types
//!
//! Defines all error conditions that can occur while answering a results
//! request, from reading the source to exporting the view.

use crate::eso::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Frequency name outside the six known values
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    /// Filter list the request cannot be answered with
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Path whose format is not recognised
    #[error("Unsupported source: {}", .0.display())]
    UnsupportedSource(PathBuf),

    /// ESO source could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// SQL source could not be read
    #[error("Database error: {0}")]
    Database(String),

    /// Reading or writing an export file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Export file is not valid delimited text
    #[error("CSV error: {0}")]
    Csv(String),
}

impl From<rusqlite::Error> for QueryError {
    fn from(err: rusqlite::Error) -> Self {
        QueryError::Database(err.to_string())
    }
}

impl From<csv::Error> for QueryError {
    fn from(err: csv::Error) -> Self {
        QueryError::Csv(err.to_string())
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::UnsupportedSource(PathBuf::from("out/eplusout.csv"));
        assert_eq!(err.to_string(), "Unsupported source: out/eplusout.csv");

        let err = QueryError::InvalidFrequency("weekly".to_string());
        assert_eq!(err.to_string(), "Invalid frequency: weekly");
    }

    #[test]
    fn test_sqlite_error_conversion() {
        let err: QueryError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, QueryError::Database(_)));
    }
}
