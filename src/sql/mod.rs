//! SQL output reader
//!
//! Reads results from the SQLite output of a simulation through the tables
//!
//! ```text
//! ReportDataDictionary(ReportDataDictionaryIndex, KeyValue, Name, Units, ReportingFrequency, ...)
//! ReportData(TimeIndex, ReportDataDictionaryIndex, Value)
//! Time(TimeIndex, Year, Month, Day, Hour, Minute, SimulationDays, DayType,
//!      EnvironmentPeriodIndex, WarmupFlag)
//! EnvironmentPeriods(EnvironmentPeriodIndex, EnvironmentName)
//! ```
//!
//! Only the last non-warmup environment is read, mirroring what an ESO parse
//! keeps. Answers use the same `ResultsView` contract as the ESO path.

use crate::query::{select_matching, OutputSource, QueryResult, ResultsRequest, ResultsView};
use crate::storage::calendar::{self, YearTracker};
use crate::storage::{Frequency, Timestamp, Variable, MISSING};
use chrono::{Duration, NaiveDate};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Map a `ReportingFrequency` value to a frequency bucket
pub fn frequency_from_sql(text: &str) -> Option<Frequency> {
    match text.trim() {
        "Zone Timestep" | "HVAC System Timestep" | "Detailed" => Some(Frequency::Timestep),
        other => Frequency::from_token(other),
    }
}

/// One declared output of the SQL file
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRecord {
    pub index: i64,
    pub variable: Variable,
    pub frequency: Frequency,
}

/// One row of the `Time` table
#[derive(Debug, Clone)]
struct TimeRow {
    index: i64,
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    day_type: Option<String>,
}

/// Read-only handle on an SQLite output file
pub struct SqlFile {
    conn: Connection,
    path: PathBuf,
    year: Option<i32>,
}

impl SqlFile {
    /// Open an existing file read-only
    pub fn open(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::debug!(path = %path.display(), "Opened SQL output");
        Ok(Self {
            conn,
            path,
            year: None,
        })
    }

    /// Year used for rows without one (inferred from day types when unset)
    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All declared outputs with a known frequency, ordered by index
    pub fn records(&self) -> QueryResult<Vec<SqlRecord>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT ReportDataDictionaryIndex, KeyValue, Name, Units, ReportingFrequency
             FROM ReportDataDictionary
             ORDER BY ReportDataDictionaryIndex",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (index, key, name, units, frequency) = row?;
            let frequency = match frequency_from_sql(&frequency) {
                Some(frequency) => frequency,
                None => {
                    tracing::debug!(index, frequency = %frequency, "Skipping unknown reporting frequency");
                    continue;
                }
            };
            let key = key.filter(|k| !k.is_empty()).unwrap_or_else(|| "Meter".to_string());
            records.push(SqlRecord {
                index,
                variable: Variable::new(key, name, units.unwrap_or_default()),
                frequency,
            });
        }
        Ok(records)
    }

    /// Index of the last environment with non-warmup rows
    fn last_environment(&self) -> QueryResult<Option<i64>> {
        let index = self.conn.query_row(
            "SELECT MAX(EnvironmentPeriodIndex) FROM Time WHERE IFNULL(WarmupFlag, 0) = 0",
            [],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(index)
    }

    /// Name of the environment the results are read from
    pub fn environment_name(&self) -> QueryResult<Option<String>> {
        let environment = match self.last_environment()? {
            Some(environment) => environment,
            None => return Ok(None),
        };
        let name = self
            .conn
            .query_row(
                "SELECT EnvironmentName FROM EnvironmentPeriods WHERE EnvironmentPeriodIndex = ?",
                params![environment],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(name)
    }

    /// Time rows of `environment` that carry data of any record in `indices`
    fn time_rows(&self, environment: i64, indices: &[i64]) -> QueryResult<Vec<TimeRow>> {
        if indices.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; indices.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT t.TimeIndex, t.Year, t.Month, t.Day, t.Hour, t.Minute, t.DayType
             FROM Time t
             WHERE t.EnvironmentPeriodIndex = ? AND IFNULL(t.WarmupFlag, 0) = 0
               AND EXISTS (
                   SELECT 1 FROM ReportData d
                   WHERE d.TimeIndex = t.TimeIndex
                     AND d.ReportDataDictionaryIndex IN ({})
               )
             ORDER BY t.TimeIndex",
            placeholders
        ))?;

        let bound = std::iter::once(environment).chain(indices.iter().copied());
        let rows = stmt.query_map(params_from_iter(bound), |row| {
            Ok(TimeRow {
                index: row.get(0)?,
                year: row.get(1)?,
                month: row.get(2)?,
                day: row.get(3)?,
                hour: row.get(4)?,
                minute: row.get(5)?,
                day_type: row.get(6)?,
            })
        })?;

        let mut times = Vec::new();
        for row in rows {
            times.push(row?);
        }
        Ok(times)
    }

    /// Values of one record in `environment`, keyed by time index
    fn values(&self, record: i64, environment: i64) -> QueryResult<HashMap<i64, f64>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT d.TimeIndex, d.Value
             FROM ReportData d
             JOIN Time t ON t.TimeIndex = d.TimeIndex
             WHERE d.ReportDataDictionaryIndex = ?
               AND t.EnvironmentPeriodIndex = ? AND IFNULL(t.WarmupFlag, 0) = 0",
        )?;
        let rows = stmt.query_map(params![record, environment], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<f64>>(1)?))
        })?;

        let mut values = HashMap::new();
        for row in rows {
            let (time, value) = row?;
            values.insert(time, value.unwrap_or(MISSING));
        }
        Ok(values)
    }

    /// First non-warmup time row of `environment`
    fn first_row(&self, environment: i64) -> QueryResult<Option<TimeRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT TimeIndex, Year, Month, Day, Hour, Minute, DayType
                 FROM Time
                 WHERE EnvironmentPeriodIndex = ? AND IFNULL(WarmupFlag, 0) = 0
                 ORDER BY TimeIndex
                 LIMIT 1",
                params![environment],
                |row| {
                    Ok(TimeRow {
                        index: row.get(0)?,
                        year: row.get(1)?,
                        month: row.get(2)?,
                        day: row.get(3)?,
                        hour: row.get(4)?,
                        minute: row.get(5)?,
                        day_type: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Pair time rows with their timestamps, following ESO conventions per
    /// frequency; rows without a valid date are dropped
    ///
    /// `first` is the first row of the environment; it fixes the starting
    /// year and the run-period date. Without a pinned year, a first pass
    /// settles the starting year so a later 29 February can move it.
    fn stamp(
        &self,
        frequency: Frequency,
        first: Option<&TimeRow>,
        rows: Vec<TimeRow>,
    ) -> Vec<(TimeRow, Timestamp)> {
        let start_year = match self.year {
            Some(year) => Some(year),
            None => {
                let mut years = YearTracker::new(None);
                for row in first.into_iter().chain(rows.iter()) {
                    resolve_date(&mut years, row);
                }
                years.first_year()
            }
        };
        let mut years = YearTracker::new(start_year);
        let environment_start = first.and_then(|row| {
            let (year, month, day) = resolve_date(&mut years, row);
            NaiveDate::from_ymd_opt(year, month, day)
        });
        let mut stamped = Vec::with_capacity(rows.len());

        for row in rows {
            let (year, month, day) = resolve_date(&mut years, &row);

            let timestamp = match frequency {
                Frequency::Timestep | Frequency::Hourly => {
                    let minutes = i64::from(row.hour.unwrap_or(0)) * 60
                        + i64::from(row.minute.unwrap_or(0));
                    calendar::day_start(year, month, day)
                        .map(|start| start + Duration::minutes(minutes))
                }
                Frequency::Daily => calendar::day_start(year, month, day),
                Frequency::Monthly => calendar::month_start(year, month),
                Frequency::RunPeriod => environment_start
                    .or_else(|| NaiveDate::from_ymd_opt(year, month, day))
                    .and_then(|d| d.and_hms_opt(0, 0, 0)),
                Frequency::Annual => calendar::year_start(year),
            };

            match timestamp {
                Some(timestamp) => stamped.push((row, timestamp)),
                None => tracing::warn!(time_index = row.index, "Skipping time row with invalid date"),
            }
        }
        stamped
    }
}

/// Year, month and day of a time row; a zero or absent year is resolved by
/// `years`
fn resolve_date(years: &mut YearTracker, row: &TimeRow) -> (i32, u32, u32) {
    let month = row.month.filter(|m| *m > 0).unwrap_or(1);
    let day = row.day.filter(|d| *d > 0).unwrap_or(1);
    let day_type = row.day_type.as_deref();
    let mut resolved = years.resolve(month, Some(day), day_type);
    if let Some(shift) = years.fit_leap_day(month, day, day_type) {
        resolved += shift;
    }
    (row.year.filter(|y| *y > 0).unwrap_or(resolved), month, day)
}

impl OutputSource for SqlFile {
    fn get_results(&self, request: &ResultsRequest) -> QueryResult<ResultsView> {
        request.validate()?;

        let records: Vec<SqlRecord> = self
            .records()?
            .into_iter()
            .filter(|r| r.frequency == request.frequency)
            .collect();
        let environment = match self.last_environment()? {
            Some(environment) if !records.is_empty() => environment,
            _ => return Ok(ResultsView::empty(request.frequency)),
        };

        let indices: Vec<i64> = records.iter().map(|r| r.index).collect();
        let first = self.first_row(environment)?;
        let rows = self.time_rows(environment, &indices)?;
        let (rows, timestamps): (Vec<TimeRow>, Vec<Timestamp>) = self
            .stamp(request.frequency, first.as_ref(), rows)
            .into_iter()
            .unzip();

        let range = request.date_range().slice_indices(&timestamps);
        let selected = &rows[range.clone()];

        let matched = select_matching(
            &request.variables,
            records.iter().map(|r| (r.index, &r.variable)),
            request.alike,
        );

        let mut columns = Vec::with_capacity(matched.len());
        for (index, variable) in matched {
            let values = self.values(index, environment)?;
            let array = selected
                .iter()
                .map(|row| values.get(&row.index).copied().unwrap_or(MISSING))
                .collect::<Vec<f64>>();
            columns.push((variable.clone(), array));
        }

        tracing::debug!(
            path = %self.path.display(),
            frequency = %request.frequency,
            matched = columns.len(),
            steps = selected.len(),
            "SQL query executed"
        );

        Ok(ResultsView::new(
            request.frequency,
            timestamps[range].to_vec(),
            columns,
        ))
    }
}
