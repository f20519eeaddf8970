//! eplusout Time-Series Store
//!
//! This module provides the in-memory representation of a parsed output file:
//!
//! - **types**: Core data structures (Variable, Frequency, ReportRecord, DateRange)
//! - **store**: Per-frequency buckets of timestamps and value arrays
//! - **calendar**: Turning month/day/hour steps into timestamps
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Build Path (parser):
//!   register → begin_environment → advance_timestamp → record_value → finalize
//!
//! Read Path (queries):
//!   Frequency → Bucket → matched ids → sliced arrays
//! ```
//!
//! # Example
//!
//! ```rust
//! use eplusout::storage::{Frequency, ReportRecord, TimeSeriesStore, Variable};
//! use eplusout::storage::calendar::interval_end;
//!
//! let mut store = TimeSeriesStore::new();
//! store.register(ReportRecord::new(
//!     7,
//!     Variable::new("Zone1", "Temperature", "C"),
//!     Frequency::Hourly,
//! ))?;
//!
//! store.begin_environment("RUN PERIOD 1")?;
//! store.advance_timestamp(Frequency::Hourly, interval_end(2002, 1, 1, 1, 60.0).unwrap())?;
//! store.record_value(7, 21.5)?;
//! store.finalize()?;
//!
//! assert_eq!(store.values(7), Some(&[21.5][..]));
//! # Ok::<(), eplusout::storage::StorageError>(())
//! ```

pub mod calendar;
pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use store::{Bucket, ParseWarning, TimeSeriesStore, WarningKind};
pub use types::{
    is_missing, DateRange, Frequency, ReportRecord, StepInfo, Timestamp, Variable, MISSING,
};
