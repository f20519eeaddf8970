//! # eplusout
//!
//! EnergyPlus output reader - parse ESO and SQL simulation results into
//! per-frequency time series, select variables, slice them by date and
//! export them as delimited text.
//!
//! ## Features
//!
//! - **ESO parsing**: Dictionary and data sections, every reporting frequency
//! - **Calendar handling**: Pinned or inferred calendar year, year rollover
//! - **Lenient data**: Unreadable values and dangling ids become warnings
//! - **Queries**: Wildcard or substring variable filters, inclusive date ranges
//! - **SQL output**: The same queries against `eplusout.sql`
//! - **Export**: CSV with flat or exploded headers, append mode
//!
//! ## Modules
//!
//! - [`storage`]: In-memory time-series store
//! - [`eso`]: ESO text-format reader
//! - [`query`]: Results requests, views and export
//! - [`sql`]: SQLite output adapter
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eplusout::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = parse_eso_file("eplusout.eso", &ParseOptions::default())?;
//!
//!     for warning in store.warnings() {
//!         eprintln!("{}", warning);
//!     }
//!
//!     let request = ResultsRequest::new(
//!         [Variable::any().with_type("Zone Mean Air Temperature")],
//!         Frequency::Hourly,
//!     );
//!     let view = store.get_results(&request)?;
//!     println!("{} variables, {} steps", view.len(), view.time_series().len());
//!
//!     view.to_csv("temperatures.csv", &ExportOptions::default())?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod eso;
pub mod query;
pub mod sql;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    is_missing, DateRange, Frequency, ParseWarning, ReportRecord, StorageError, StorageResult,
    TimeSeriesStore, Timestamp, Variable, WarningKind, MISSING,
};

pub use eso::{parse_eso_environments, parse_eso_file, parse_eso_str, ParseError, ParseOptions};

pub use query::{
    get_results, open_source, query, read_csv, ExportOptions, OutputSource, QueryError,
    QueryResult, ResultsRequest, ResultsView,
};

pub use sql::SqlFile;

pub use config::{Config, ConfigError, LoggingConfig};
