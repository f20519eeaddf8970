//! eplusout Query Engine
//!
//! Turns a results request into a `ResultsView`:
//!
//! - **request**: What to select (variable filters, frequency, date range)
//! - **matcher**: Wildcard / substring matching of variables
//! - **executor**: Running a request against a parsed store
//! - **results**: The read-only answer
//! - **export**: Delimited-text export and read-back
//!
//! # Sources
//!
//! ```text
//! *.eso ──parse──▶ TimeSeriesStore ─┐
//!                                   ├─ OutputSource::get_results ─▶ ResultsView
//! *.sql ──open───▶ SqlFile ─────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use eplusout::query::{get_results, ResultsRequest};
//! use eplusout::{Frequency, ParseOptions, Variable};
//!
//! let request = ResultsRequest::new(
//!     [Variable::any().with_type("Zone Mean Air Temperature")],
//!     Frequency::Hourly,
//! );
//! let view = get_results("eplusout.eso", &request, &ParseOptions::default())?;
//! view.to_csv("temperatures.csv", &Default::default())?;
//! ```

mod error;
mod executor;
pub mod export;
mod matcher;
mod request;
mod results;

pub use error::{QueryError, QueryResult};
pub use executor::query;
pub use export::{read_csv, ExportOptions, ExportedTable, TIMESTAMP_FORMAT};
pub use matcher::{matches, select_matching};
pub use request::ResultsRequest;
pub use results::ResultsView;

use crate::eso::{parse_eso_file, ParseOptions};
use crate::sql::SqlFile;
use crate::storage::TimeSeriesStore;
use std::path::Path;

/// Anything a results request can be answered from
pub trait OutputSource {
    fn get_results(&self, request: &ResultsRequest) -> QueryResult<ResultsView>;
}

impl OutputSource for TimeSeriesStore {
    fn get_results(&self, request: &ResultsRequest) -> QueryResult<ResultsView> {
        query(self, request)
    }
}

/// Kind of output file, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Eso,
    Sql,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "eso" => Some(SourceKind::Eso),
            "sql" => Some(SourceKind::Sql),
            _ => None,
        }
    }
}

/// Open an output file as a queryable source
///
/// ESO files are parsed completely; keep the source around to answer several
/// requests from one parse.
pub fn open_source(
    path: impl AsRef<Path>,
    options: &ParseOptions,
) -> QueryResult<Box<dyn OutputSource>> {
    let path = path.as_ref();
    match SourceKind::from_path(path) {
        Some(SourceKind::Eso) => Ok(Box::new(parse_eso_file(path, options)?)),
        Some(SourceKind::Sql) => Ok(Box::new(SqlFile::open(path)?.with_year(options.year))),
        None => Err(QueryError::UnsupportedSource(path.to_path_buf())),
    }
}

/// Answer a single request straight from a file path
pub fn get_results(
    path: impl AsRef<Path>,
    request: &ResultsRequest,
    options: &ParseOptions,
) -> QueryResult<ResultsView> {
    request.validate()?;
    open_source(path, options)?.get_results(request)
}
