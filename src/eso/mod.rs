//! ESO text-format reader
//!
//! An ESO file has two sections:
//!
//! ```text
//! Program Version,EnergyPlus, ...
//! <dictionary: one declaration per line>
//! End of Data Dictionary
//! <data: environment headers, interval headers and values>
//! End of Data
//! ```
//!
//! - **lines**: Grammar of single dictionary and data lines (nom-based)
//! - **parser**: State machine filling a `TimeSeriesStore`
//! - **error**: Fatal parse errors
//!
//! Recoverable problems (dangling ids, unreadable values) are attached to the
//! store as warnings instead of failing the parse.

pub mod error;
pub mod lines;
mod parser;

pub use error::{ParseError, ParseResult};
pub use parser::{EsoParser, ParseOptions};

use crate::storage::TimeSeriesStore;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

fn open(path: &Path) -> ParseResult<BufReader<File>> {
    let file = File::open(path).map_err(|source| ParseError::Io {
        path: Some(path.to_path_buf()),
        source,
    })?;
    Ok(BufReader::new(file))
}

fn with_path(path: &Path, err: ParseError) -> ParseError {
    match err {
        ParseError::Io { path: None, source } => ParseError::Io {
            path: Some(path.to_path_buf()),
            source,
        },
        other => other,
    }
}

/// Parse an ESO file into a finalized store holding its last environment
pub fn parse_eso_file(path: impl AsRef<Path>, options: &ParseOptions) -> ParseResult<TimeSeriesStore> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), year = ?options.year, "Reading ESO file");
    parse_eso_reader(open(path)?, options).map_err(|e| with_path(path, e))
}

/// Parse ESO text from any buffered reader
pub fn parse_eso_reader<R: BufRead>(reader: R, options: &ParseOptions) -> ParseResult<TimeSeriesStore> {
    let mut parser = EsoParser::new(options);
    parser.feed_reader(reader)?;
    parser.finish()
}

/// Parse ESO text held in memory
pub fn parse_eso_str(text: &str, options: &ParseOptions) -> ParseResult<TimeSeriesStore> {
    parse_eso_reader(text.as_bytes(), options)
}

/// Parse an ESO file into one finalized store per environment, in file order
pub fn parse_eso_environments(
    path: impl AsRef<Path>,
    options: &ParseOptions,
) -> ParseResult<Vec<TimeSeriesStore>> {
    let path = path.as_ref();
    parse_eso_environments_reader(open(path)?, options).map_err(|e| with_path(path, e))
}

pub fn parse_eso_environments_reader<R: BufRead>(
    reader: R,
    options: &ParseOptions,
) -> ParseResult<Vec<TimeSeriesStore>> {
    let mut parser = EsoParser::collecting(options);
    parser.feed_reader(reader)?;
    parser.finish_all()
}

pub fn parse_eso_environments_str(
    text: &str,
    options: &ParseOptions,
) -> ParseResult<Vec<TimeSeriesStore>> {
    parse_eso_environments_reader(text.as_bytes(), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Frequency;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SMALL: &str = "\
Program Version,EnergyPlus, Version 9.4.0
1,5,Environment Title[],Latitude[deg],Longitude[deg],Time Zone[],Elevation[m]
2,8,Day of Simulation[],Month[],Day of Month[],DST Indicator[1=yes 0=no],Hour[],StartMinute[],EndMinute[],DayType
7,1,Environment,Site Outdoor Air Drybulb Temperature [C] !Hourly
End of Data Dictionary
1,DESIGN DAY,  48.15,  17.10,   1.00, 138.00
2,1, 7,21, 0, 1,0.00,60.00,SummerDesignDay
7,25.0
1,RUN PERIOD 1,  48.15,  17.10,   1.00, 138.00
2,1, 1, 1, 0, 1,0.00,60.00,Tuesday
7,-1.5
2,1, 1, 1, 0, 2,0.00,60.00,Tuesday
7,-2.0
End of Data
";

    #[test]
    fn test_parse_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SMALL.as_bytes()).unwrap();

        let store = parse_eso_file(file.path(), &ParseOptions::default()).unwrap();
        assert_eq!(store.environment_name(), Some("RUN PERIOD 1"));
        assert_eq!(store.values(7).unwrap(), &[-1.5, -2.0]);
        assert_eq!(store.timestamps(Frequency::Hourly).len(), 2);

        let stores = parse_eso_environments(file.path(), &ParseOptions::default()).unwrap();
        assert_eq!(stores.len(), 2);
        assert_eq!(stores[0].values(7).unwrap(), &[25.0]);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.eso");

        let err = parse_eso_file(&path, &ParseOptions::default()).unwrap_err();
        match &err {
            ParseError::Io { path: Some(p), .. } => assert_eq!(p, &path),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().contains("absent.eso"));
    }

    #[test]
    fn test_str_and_environment_variants_agree() {
        let store = parse_eso_str(SMALL, &ParseOptions::default()).unwrap();
        let stores = parse_eso_environments_str(SMALL, &ParseOptions::default()).unwrap();
        assert_eq!(
            stores.last().unwrap().values(7),
            store.values(7)
        );
    }
}
