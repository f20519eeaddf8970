//! ESO parse error types
//!
//! Every variant here is fatal: a failed parse yields no store.

use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort parsing of an ESO file
#[derive(Error, Debug)]
pub enum ParseError {
    /// File could not be opened or read
    #[error("Failed to read {}: {source}", display_path(.path))]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// Unparseable or duplicate declaration in the dictionary
    #[error("Malformed dictionary at line {line}: {reason} ('{content}')")]
    MalformedDictionary {
        line: usize,
        content: String,
        reason: String,
    },

    /// Dictionary declaration with a frequency token nobody knows
    #[error("Unknown frequency token '{token}' at line {line} ('{content}')")]
    UnknownFrequencyToken {
        line: usize,
        content: String,
        token: String,
    },

    /// Environment or interval header that cannot be turned into a step
    #[error("Malformed interval header at line {line}: {reason} ('{content}')")]
    MalformedIntervalHeader {
        line: usize,
        content: String,
        reason: String,
    },

    /// Store refused an operation
    #[error("Store error: {0}")]
    Store(#[from] StorageError),
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "input".to_string())
}

impl ParseError {
    /// 1-based line the error was found on, when it concerns a line
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::MalformedDictionary { line, .. }
            | ParseError::UnknownFrequencyToken { line, .. }
            | ParseError::MalformedIntervalHeader { line, .. } => Some(*line),
            ParseError::Io { .. } | ParseError::Store(_) => None,
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(source: std::io::Error) -> Self {
        ParseError::Io { path: None, source }
    }
}

/// Result type alias for parse operations
pub type ParseResult<T> = Result<T, ParseError>;
