//! ESO Parser
//!
//! Two-phase state machine turning an ESO text stream into a
//! `TimeSeriesStore`.
//!
//! # Phases
//!
//! ```text
//! Dictionary ──"End of Data Dictionary"──▶ Data ──"End of Data"──▶ Done
//! ```
//!
//! The dictionary must be complete before any data line can be resolved,
//! since record ids are the only link between the two phases. In the data
//! phase, header lines move the current stamp of their family and data lines
//! append values to the bucket of their record.

use crate::eso::error::{ParseError, ParseResult};
use crate::eso::lines::{self, Declaration, DeclarationError, StampKind};
use crate::storage::calendar::{self, YearTracker};
use crate::storage::{
    ParseWarning, ReportRecord, StepInfo, StorageError, TimeSeriesStore, Timestamp,
    WarningKind, MISSING,
};
use chrono::{Datelike, NaiveDate, NaiveTime};
use std::collections::HashMap;
use std::io::BufRead;

const DICTIONARY_END: &str = "End of Data Dictionary";
const DATA_END: &str = "End of Data";
const PROGRAM_VERSION: &str = "Program Version";

/// Options controlling how a file is read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Calendar year of the first step; inferred from day names when unset
    pub year: Option<i32>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: pin the calendar year
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Dictionary,
    Data,
    Done,
}

/// Counters for the parse summary
#[derive(Debug, Default)]
struct ParseStats {
    lines: usize,
    values: usize,
    environments: usize,
    /// Warnings of every environment, discarded ones included
    warnings: usize,
}

/// Line-by-line ESO state machine
pub struct EsoParser {
    phase: Phase,
    line_no: usize,
    stamp_ids: HashMap<u32, StampKind>,
    store: TimeSeriesStore,
    years: YearTracker,
    /// First date of the current environment
    environment_start: Option<NaiveDate>,
    /// Latest cumulative day count of the current environment
    cumulative_day: Option<u32>,
    current: HashMap<StampKind, (Timestamp, StepInfo)>,
    /// Finalized earlier environments, kept only when collecting
    completed: Option<Vec<TimeSeriesStore>>,
    stats: ParseStats,
}

impl EsoParser {
    /// Parser keeping only the last environment
    pub fn new(options: &ParseOptions) -> Self {
        Self {
            phase: Phase::Dictionary,
            line_no: 0,
            stamp_ids: HashMap::new(),
            store: TimeSeriesStore::new(),
            years: YearTracker::new(options.year),
            environment_start: None,
            cumulative_day: None,
            current: HashMap::new(),
            completed: None,
            stats: ParseStats::default(),
        }
    }

    /// Parser keeping a finalized store for every environment
    pub fn collecting(options: &ParseOptions) -> Self {
        Self {
            completed: Some(Vec::new()),
            ..Self::new(options)
        }
    }

    /// Feed every line of `reader`
    pub fn feed_reader<R: BufRead>(&mut self, reader: R) -> ParseResult<()> {
        for line in reader.lines() {
            self.feed_line(&line?)?;
        }
        Ok(())
    }

    /// Feed a single line (without its terminator)
    pub fn feed_line(&mut self, raw: &str) -> ParseResult<()> {
        self.line_no += 1;
        self.stats.lines += 1;
        let line = raw.trim();
        if line.is_empty() {
            return Ok(());
        }

        match self.phase {
            Phase::Dictionary => {
                if line == DICTIONARY_END {
                    tracing::debug!(
                        line = self.line_no,
                        records = self.store.records().len(),
                        "Dictionary complete"
                    );
                    self.phase = Phase::Data;
                    Ok(())
                } else if line.starts_with(PROGRAM_VERSION) {
                    Ok(())
                } else {
                    self.declare(line)
                }
            }
            Phase::Data => {
                if line == DATA_END {
                    self.phase = Phase::Done;
                    Ok(())
                } else {
                    self.data_line(line)
                }
            }
            Phase::Done => Ok(()),
        }
    }

    fn declare(&mut self, line: &str) -> ParseResult<()> {
        let declaration = lines::parse_declaration(line).map_err(|e| match e {
            DeclarationError::Malformed(reason) => ParseError::MalformedDictionary {
                line: self.line_no,
                content: line.to_string(),
                reason,
            },
            DeclarationError::UnknownFrequency(token) => ParseError::UnknownFrequencyToken {
                line: self.line_no,
                content: line.to_string(),
                token,
            },
        })?;

        let duplicate = |line_no: usize, id: u32| ParseError::MalformedDictionary {
            line: line_no,
            content: line.to_string(),
            reason: format!("duplicate record id {}", id),
        };

        match declaration {
            Declaration::Stamp { id, kind } => {
                if self.stamp_ids.contains_key(&id) || self.store.record(id).is_some() {
                    return Err(duplicate(self.line_no, id));
                }
                self.stamp_ids.insert(id, kind);
            }
            Declaration::Output {
                id,
                variable,
                frequency,
                ..
            } => {
                if self.stamp_ids.contains_key(&id) {
                    return Err(duplicate(self.line_no, id));
                }
                self.store
                    .register(ReportRecord::new(id, variable, frequency))
                    .map_err(|e| match e {
                        StorageError::DuplicateRecord(id) => duplicate(self.line_no, id),
                        other => ParseError::Store(other),
                    })?;
            }
        }
        Ok(())
    }

    fn warn(&mut self, kind: WarningKind) -> ParseResult<()> {
        let warning = ParseWarning {
            line: self.line_no,
            kind,
        };
        tracing::debug!(%warning, "Skipping data line problem");
        self.store.push_warning(warning)?;
        self.stats.warnings += 1;
        Ok(())
    }

    fn header_error(&self, line: &str, reason: impl Into<String>) -> ParseError {
        ParseError::MalformedIntervalHeader {
            line: self.line_no,
            content: line.to_string(),
            reason: reason.into(),
        }
    }

    fn data_line(&mut self, line: &str) -> ParseResult<()> {
        let (id, rest) = match lines::split_id(line) {
            Some(parsed) => parsed,
            None => {
                return self.warn(WarningKind::MalformedLine {
                    raw: line.to_string(),
                })
            }
        };

        if let Some(kind) = self.stamp_ids.get(&id).copied() {
            return self.header_line(kind, line, rest);
        }

        let frequency = match self.store.record(id).map(|r| r.frequency) {
            Some(frequency) => frequency,
            None => return self.warn(WarningKind::DanglingRecord { id }),
        };

        let stamp = self
            .current
            .get(&StampKind::for_frequency(frequency))
            .cloned();
        let (timestamp, info) = match stamp {
            Some(stamp) => stamp,
            None => return self.warn(WarningKind::OrphanValue { id }),
        };

        let raw = lines::data_value(rest);
        let value = match raw.parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                self.warn(WarningKind::MissingValue {
                    id,
                    raw: raw.to_string(),
                })?;
                MISSING
            }
        };

        self.store.advance_step(frequency, timestamp, info)?;
        if self.store.record_value(id, value)? {
            self.warn(WarningKind::DuplicateValue { id })?;
        }
        self.stats.values += 1;
        Ok(())
    }

    fn header_line(&mut self, kind: StampKind, line: &str, rest: &str) -> ParseResult<()> {
        let (timestamp, info) = match kind {
            StampKind::Environment => {
                let header = lines::parse_environment(rest).map_err(|e| self.header_error(line, e))?;
                return self.begin_environment(header.name);
            }
            StampKind::Interval => {
                let header = lines::parse_interval(rest).map_err(|e| self.header_error(line, e))?;
                let year = self.dated_year(header.month, header.day, &header.day_type)?;
                let timestamp = calendar::interval_end(
                    year,
                    header.month,
                    header.day,
                    header.hour,
                    header.end_minute,
                )
                .ok_or_else(|| self.header_error(line, format!("no such step in {}", year)))?;
                self.mark_day(year, header.month, header.day, header.day_of_simulation);
                (timestamp, StepInfo::day_type(header.day_type))
            }
            StampKind::Daily => {
                let header = lines::parse_daily(rest).map_err(|e| self.header_error(line, e))?;
                let year = self.dated_year(header.month, header.day, &header.day_type)?;
                let timestamp = calendar::day_start(year, header.month, header.day)
                    .ok_or_else(|| self.header_error(line, format!("no such day in {}", year)))?;
                self.mark_day(year, header.month, header.day, header.cumulative_day);
                (
                    timestamp,
                    StepInfo {
                        day_type: Some(header.day_type),
                        cumulative_days: Some(header.cumulative_day),
                    },
                )
            }
            StampKind::Monthly => {
                let header = lines::parse_monthly(rest).map_err(|e| self.header_error(line, e))?;
                let year = self.years.resolve(header.month, None, None);
                let timestamp = calendar::month_start(year, header.month)
                    .ok_or_else(|| self.header_error(line, "invalid month"))?;
                self.cumulative_day = Some(header.cumulative_days);
                (timestamp, StepInfo::cumulative_days(header.cumulative_days))
            }
            StampKind::RunPeriod => {
                let days = lines::parse_run_period(rest).map_err(|e| self.header_error(line, e))?;
                let start = match self.environment_start {
                    Some(date) => date.and_hms_opt(0, 0, 0),
                    None => calendar::year_start(self.years.current()),
                };
                let timestamp = start.ok_or_else(|| self.header_error(line, "invalid start date"))?;
                self.cumulative_day = Some(days);
                (timestamp, StepInfo::cumulative_days(days))
            }
            StampKind::Annual => {
                let stated = lines::parse_annual(rest).map_err(|e| self.header_error(line, e))?;
                if let Some(shift) = self.years.observe_year(stated) {
                    self.shift_years(shift)?;
                }
                let timestamp = calendar::year_start(self.years.annual_year(stated))
                    .ok_or_else(|| self.header_error(line, "invalid year"))?;
                let info = StepInfo {
                    day_type: None,
                    cumulative_days: self.cumulative_day,
                };
                (timestamp, info)
            }
        };

        self.current.insert(kind, (timestamp, info));
        Ok(())
    }

    /// Year of a dated header; a 29 February missing from an unpinned year
    /// moves the environment to a leap year
    fn dated_year(&mut self, month: u32, day: u32, day_type: &str) -> ParseResult<i32> {
        let year = self.years.resolve(month, Some(day), Some(day_type));
        match self.years.fit_leap_day(month, day, Some(day_type)) {
            Some(shift) => {
                self.shift_years(shift)?;
                Ok(year + shift)
            }
            None => Ok(year),
        }
    }

    /// Move every step of the current environment by `years`
    fn shift_years(&mut self, years: i32) -> ParseResult<()> {
        tracing::debug!(line = self.line_no, years, "Moving environment to another year");
        self.store.shift_years(years)?;
        for (timestamp, _) in self.current.values_mut() {
            *timestamp = calendar::shift_years(*timestamp, years).ok_or(
                StorageError::InvalidYearShift {
                    timestamp: *timestamp,
                    years,
                },
            )?;
        }
        self.environment_start = match self.environment_start {
            Some(date) => Some(date.with_year(date.year() + years).ok_or(
                StorageError::InvalidYearShift {
                    timestamp: date.and_time(NaiveTime::MIN),
                    years,
                },
            )?),
            None => None,
        };
        Ok(())
    }

    fn mark_day(&mut self, year: i32, month: u32, day: u32, cumulative_day: u32) {
        if self.environment_start.is_none() {
            self.environment_start = NaiveDate::from_ymd_opt(year, month, day);
        }
        self.cumulative_day = Some(cumulative_day);
    }

    fn begin_environment(&mut self, name: String) -> ParseResult<()> {
        if let Some(completed) = self.completed.as_mut() {
            if self.stats.environments > 0 {
                completed.push(self.store.snapshot());
            }
        }

        tracing::debug!(line = self.line_no, environment = %name, "New environment");
        self.store.begin_environment(name)?;
        self.years.reset();
        self.environment_start = None;
        self.cumulative_day = None;
        self.current.clear();
        self.stats.environments += 1;
        Ok(())
    }

    fn check_complete(&self) -> ParseResult<()> {
        if self.phase == Phase::Dictionary {
            return Err(ParseError::MalformedDictionary {
                line: self.line_no,
                content: String::new(),
                reason: format!("input ended before '{}'", DICTIONARY_END),
            });
        }
        Ok(())
    }

    fn log_summary(&self) {
        let warnings = self.store.warnings();
        let dangling = warnings
            .iter()
            .filter(|w| matches!(w.kind, WarningKind::DanglingRecord { .. }))
            .count();
        let missing = warnings
            .iter()
            .filter(|w| matches!(w.kind, WarningKind::MissingValue { .. }))
            .count();

        if !warnings.is_empty() {
            tracing::warn!(
                warnings = warnings.len(),
                dangling,
                missing,
                "ESO file parsed with recoverable problems"
            );
        }
        if self.stats.warnings > warnings.len() {
            tracing::debug!(
                discarded = self.stats.warnings - warnings.len(),
                "Recoverable problems in earlier environments"
            );
        }
        tracing::info!(
            lines = self.stats.lines,
            values = self.stats.values,
            environments = self.stats.environments,
            environment = self.store.environment_name().unwrap_or("-"),
            "Parsed ESO file"
        );
    }

    /// Finish parsing; the store holds the last environment
    pub fn finish(mut self) -> ParseResult<TimeSeriesStore> {
        self.check_complete()?;
        self.store.finalize()?;
        self.log_summary();
        Ok(self.store)
    }

    /// Finish parsing; one store per environment, in file order
    pub fn finish_all(mut self) -> ParseResult<Vec<TimeSeriesStore>> {
        self.check_complete()?;
        self.log_summary();
        let mut completed = self.completed.take().unwrap_or_default();
        if self.stats.environments > 0 {
            self.store.finalize()?;
            completed.push(self.store);
        }
        Ok(completed)
    }
}
