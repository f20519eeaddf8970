//! Time-series store error types
//!
//! Defines all errors that can occur while building the store.

use crate::storage::types::{Frequency, Timestamp};
use thiserror::Error;

/// Errors that can occur in the time-series store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// A record with this id is already registered
    #[error("Duplicate record id: {0}")]
    DuplicateRecord(u32),

    /// Requested record does not exist
    #[error("Record not found: {0}")]
    UnknownRecord(u32),

    /// A value arrived before its bucket received any timestamp
    #[error("No timestamp recorded for {frequency} bucket (record {id})")]
    NoTimestamp { id: u32, frequency: Frequency },

    /// Moving the environment to another year hit a missing 29 February
    #[error("Cannot move {timestamp} by {years} years")]
    InvalidYearShift { timestamp: Timestamp, years: i32 },

    /// The store was finalized and cannot change anymore
    #[error("Store is already finalized")]
    AlreadyFinalized,
}

/// Result type alias for store operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::UnknownRecord(42);
        assert_eq!(err.to_string(), "Record not found: 42");

        let err = StorageError::NoTimestamp {
            id: 7,
            frequency: Frequency::Hourly,
        };
        assert_eq!(
            err.to_string(),
            "No timestamp recorded for hourly bucket (record 7)"
        );

        assert_eq!(
            StorageError::AlreadyFinalized.to_string(),
            "Store is already finalized"
        );
    }
}
