//! Time-Series Store
//!
//! Holds the queryable state of one parsed simulation output:
//! - Dictionary: id → ReportRecord
//! - Buckets: one per Frequency, each with ordered timestamps and one
//!   value array per record, kept in lock-step with the timestamps
//!
//! The store is built incrementally (register → begin_environment →
//! advance_timestamp / record_value) and frozen by `finalize()`. A finalized
//! store has no interior mutability and can be shared between threads.

use crate::storage::calendar;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{
    Frequency, ReportRecord, StepInfo, Timestamp, Variable, MISSING,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Kind of a recoverable problem met while reading a file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// Data line references an id absent from the dictionary
    DanglingRecord { id: u32 },
    /// Value field could not be read as a number; stored as missing
    MissingValue { id: u32, raw: String },
    /// Data line arrived before any interval header of its frequency
    OrphanValue { id: u32 },
    /// Second value for the same id within one step; the last one wins
    DuplicateValue { id: u32 },
    /// Data line without a readable record id
    MalformedLine { raw: String },
}

/// A recoverable problem, with the 1-based line it was found on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseWarning {
    pub line: usize,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            WarningKind::DanglingRecord { id } => {
                write!(f, "line {}: id {} is not declared in the dictionary", self.line, id)
            }
            WarningKind::MissingValue { id, raw } => {
                write!(f, "line {}: id {} has non-numeric value '{}'", self.line, id, raw)
            }
            WarningKind::OrphanValue { id } => {
                write!(f, "line {}: id {} reported before any interval header", self.line, id)
            }
            WarningKind::DuplicateValue { id } => {
                write!(f, "line {}: id {} reported twice in one step", self.line, id)
            }
            WarningKind::MalformedLine { raw } => {
                write!(f, "line {}: unreadable data line '{}'", self.line, raw)
            }
        }
    }
}

/// Per-frequency time series
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    /// Record ids in declaration order
    record_ids: Vec<u32>,
    timestamps: Vec<Timestamp>,
    steps: Vec<StepInfo>,
    values: HashMap<u32, Vec<f64>>,
}

impl Bucket {
    /// Record ids in declaration order
    pub fn record_ids(&self) -> &[u32] {
        &self.record_ids
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn steps(&self) -> &[StepInfo] {
        &self.steps
    }

    /// Values of a record; on a finalized store the length equals `len()`
    pub fn values(&self, id: u32) -> Option<&[f64]> {
        self.values.get(&id).map(|v| v.as_slice())
    }

    /// Number of reported steps
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    fn add_record(&mut self, id: u32) {
        self.record_ids.push(id);
        self.values.insert(id, Vec::new());
    }

    fn reset(&mut self) {
        self.timestamps.clear();
        self.steps.clear();
        for array in self.values.values_mut() {
            array.clear();
        }
    }

    /// Pad every array to the current step count
    fn fill_to(&mut self, len: usize) {
        for array in self.values.values_mut() {
            if array.len() < len {
                array.resize(len, MISSING);
            }
        }
    }

    fn advance(&mut self, timestamp: Timestamp, info: StepInfo) -> bool {
        if self.timestamps.last() == Some(&timestamp) {
            return false;
        }
        let len = self.timestamps.len();
        self.fill_to(len);
        self.timestamps.push(timestamp);
        self.steps.push(info);
        true
    }

    /// Returns true when an earlier value of this step was replaced
    fn record(&mut self, id: u32, value: f64) -> bool {
        let len = self.timestamps.len();
        let array = self.values.entry(id).or_default();
        if array.len() == len {
            if let Some(last) = array.last_mut() {
                *last = value;
            }
            return true;
        }
        array.resize(len - 1, MISSING);
        array.push(value);
        false
    }
}

/// Parsed, randomly queryable time-series store
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesStore {
    environment_name: Option<String>,
    records: HashMap<u32, ReportRecord>,
    buckets: BTreeMap<Frequency, Bucket>,
    warnings: Vec<ParseWarning>,
    finalized: bool,
}

impl TimeSeriesStore {
    /// Create an empty, mutable store
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_mutable(&self) -> StorageResult<()> {
        if self.finalized {
            Err(StorageError::AlreadyFinalized)
        } else {
            Ok(())
        }
    }

    /// Add a dictionary record
    pub fn register(&mut self, record: ReportRecord) -> StorageResult<()> {
        self.ensure_mutable()?;
        if self.records.contains_key(&record.id) {
            return Err(StorageError::DuplicateRecord(record.id));
        }
        self.buckets
            .entry(record.frequency)
            .or_default()
            .add_record(record.id);
        self.records.insert(record.id, record);
        Ok(())
    }

    /// Start a new environment, discarding all accumulated steps, values
    /// and warnings
    pub fn begin_environment(&mut self, name: impl Into<String>) -> StorageResult<()> {
        self.ensure_mutable()?;
        let name = name.into();
        tracing::debug!(environment = %name, "Beginning environment");
        for bucket in self.buckets.values_mut() {
            bucket.reset();
        }
        self.warnings.clear();
        self.environment_name = Some(name);
        Ok(())
    }

    /// Move every timestamp of the current environment by `years` calendar
    /// years
    pub fn shift_years(&mut self, years: i32) -> StorageResult<()> {
        self.ensure_mutable()?;
        for bucket in self.buckets.values_mut() {
            for timestamp in bucket.timestamps.iter_mut() {
                *timestamp = calendar::shift_years(*timestamp, years).ok_or(
                    StorageError::InvalidYearShift {
                        timestamp: *timestamp,
                        years,
                    },
                )?;
            }
        }
        Ok(())
    }

    /// Append a timestamp to a bucket unless it equals the bucket's last one
    ///
    /// Returns true when the bucket advanced.
    pub fn advance_timestamp(
        &mut self,
        frequency: Frequency,
        timestamp: Timestamp,
    ) -> StorageResult<bool> {
        self.advance_step(frequency, timestamp, StepInfo::default())
    }

    /// Same as `advance_timestamp`, carrying metadata of the new step
    pub fn advance_step(
        &mut self,
        frequency: Frequency,
        timestamp: Timestamp,
        info: StepInfo,
    ) -> StorageResult<bool> {
        self.ensure_mutable()?;
        Ok(self
            .buckets
            .entry(frequency)
            .or_default()
            .advance(timestamp, info))
    }

    /// Record a value for the current step of the record's bucket
    ///
    /// Returns true when a value already recorded for this step was replaced.
    pub fn record_value(&mut self, id: u32, value: f64) -> StorageResult<bool> {
        self.ensure_mutable()?;
        let frequency = self
            .records
            .get(&id)
            .map(|r| r.frequency)
            .ok_or(StorageError::UnknownRecord(id))?;
        let bucket = self.buckets.entry(frequency).or_default();
        if bucket.is_empty() {
            return Err(StorageError::NoTimestamp { id, frequency });
        }
        Ok(bucket.record(id, value))
    }

    /// Attach a recoverable problem to the store
    pub fn push_warning(&mut self, warning: ParseWarning) -> StorageResult<()> {
        self.ensure_mutable()?;
        self.warnings.push(warning);
        Ok(())
    }

    /// Freeze the store; pads arrays of records that did not report at the
    /// final steps
    pub fn finalize(&mut self) -> StorageResult<()> {
        self.ensure_mutable()?;
        for bucket in self.buckets.values_mut() {
            let len = bucket.len();
            bucket.fill_to(len);
        }
        self.finalized = true;
        Ok(())
    }

    /// Finalized copy of the current state, leaving this store mutable
    pub fn snapshot(&self) -> TimeSeriesStore {
        let mut copy = self.clone();
        copy.finalized = false;
        // A fresh clone is never finalized, so this cannot fail
        let _ = copy.finalize();
        copy
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Name of the environment whose data the store holds
    pub fn environment_name(&self) -> Option<&str> {
        self.environment_name.as_deref()
    }

    pub fn record(&self, id: u32) -> Option<&ReportRecord> {
        self.records.get(&id)
    }

    /// All dictionary records, ordered by id
    pub fn records(&self) -> Vec<&ReportRecord> {
        let mut records: Vec<&ReportRecord> = self.records.values().collect();
        records.sort_by_key(|r| r.id);
        records
    }

    /// Frequencies with at least one declared record, in listing order
    pub fn frequencies(&self) -> Vec<Frequency> {
        self.buckets
            .iter()
            .filter(|(_, bucket)| !bucket.record_ids.is_empty())
            .map(|(freq, _)| *freq)
            .collect()
    }

    pub fn bucket(&self, frequency: Frequency) -> Option<&Bucket> {
        self.buckets.get(&frequency)
    }

    /// Declared `(id, Variable)` pairs of a bucket in declaration order
    pub fn variables(&self, frequency: Frequency) -> Vec<(u32, &Variable)> {
        self.buckets
            .get(&frequency)
            .map(|bucket| {
                bucket
                    .record_ids
                    .iter()
                    .filter_map(|id| self.records.get(id).map(|r| (*id, &r.variable)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn timestamps(&self, frequency: Frequency) -> &[Timestamp] {
        self.buckets
            .get(&frequency)
            .map(|b| b.timestamps())
            .unwrap_or(&[])
    }

    /// Values of a record in its own bucket
    pub fn values(&self, id: u32) -> Option<&[f64]> {
        let record = self.records.get(&id)?;
        self.buckets.get(&record.frequency)?.values(id)
    }

    /// Day type of every step, for timestep, hourly and daily buckets
    pub fn days_of_week(&self, frequency: Frequency) -> Option<Vec<&str>> {
        if !matches!(
            frequency,
            Frequency::Timestep | Frequency::Hourly | Frequency::Daily
        ) {
            return None;
        }
        let bucket = self.buckets.get(&frequency)?;
        Some(
            bucket
                .steps
                .iter()
                .map(|s| s.day_type.as_deref().unwrap_or(""))
                .collect(),
        )
    }

    /// Number of days covered by every step, for monthly, annual and
    /// run-period buckets
    pub fn n_days(&self, frequency: Frequency) -> Option<Vec<u32>> {
        if !matches!(
            frequency,
            Frequency::Monthly | Frequency::Annual | Frequency::RunPeriod
        ) {
            return None;
        }
        let bucket = self.buckets.get(&frequency)?;
        let mut previous = 0;
        bucket
            .steps
            .iter()
            .map(|s| {
                let cumulative = s.cumulative_days?;
                let n = cumulative.saturating_sub(previous);
                previous = cumulative;
                Some(n)
            })
            .collect()
    }

    /// Recoverable problems met in the environment the store holds
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hour(h: i64) -> Timestamp {
        NaiveDate::from_ymd_opt(2002, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::hours(h)
    }

    fn zone_store() -> TimeSeriesStore {
        let mut store = TimeSeriesStore::new();
        store
            .register(ReportRecord::new(
                7,
                Variable::new("Zone1", "Temperature", "C"),
                Frequency::Hourly,
            ))
            .unwrap();
        store
            .register(ReportRecord::new(
                8,
                Variable::new("Zone1", "Humidity", "%"),
                Frequency::Hourly,
            ))
            .unwrap();
        store
            .register(ReportRecord::new(
                9,
                Variable::new("Zone1", "Temperature", "C"),
                Frequency::Daily,
            ))
            .unwrap();
        store
    }

    #[test]
    fn test_duplicate_register() {
        let mut store = zone_store();
        let err = store
            .register(ReportRecord::new(7, Variable::any(), Frequency::Daily))
            .unwrap_err();
        assert_eq!(err, StorageError::DuplicateRecord(7));
    }

    #[test]
    fn test_advance_is_idempotent() {
        let mut store = zone_store();
        store.begin_environment("RUN").unwrap();

        assert!(store.advance_timestamp(Frequency::Hourly, hour(1)).unwrap());
        assert!(!store.advance_timestamp(Frequency::Hourly, hour(1)).unwrap());
        assert!(store.advance_timestamp(Frequency::Hourly, hour(2)).unwrap());

        assert_eq!(store.timestamps(Frequency::Hourly).len(), 2);
        assert!(store.timestamps(Frequency::Daily).is_empty());
    }

    #[test]
    fn test_record_requires_timestamp() {
        let mut store = zone_store();
        store.begin_environment("RUN").unwrap();

        let err = store.record_value(7, 1.0).unwrap_err();
        assert_eq!(
            err,
            StorageError::NoTimestamp {
                id: 7,
                frequency: Frequency::Hourly
            }
        );
        assert_eq!(
            store.record_value(99, 1.0).unwrap_err(),
            StorageError::UnknownRecord(99)
        );
    }

    #[test]
    fn test_arrays_stay_aligned_with_timestamps() {
        let mut store = zone_store();
        store.begin_environment("RUN").unwrap();

        store.advance_timestamp(Frequency::Hourly, hour(1)).unwrap();
        store.record_value(7, 20.0).unwrap();
        store.record_value(8, 40.0).unwrap();

        // id 8 skips the second step
        store.advance_timestamp(Frequency::Hourly, hour(2)).unwrap();
        store.record_value(7, 21.0).unwrap();

        store.advance_timestamp(Frequency::Hourly, hour(3)).unwrap();
        store.record_value(8, 42.0).unwrap();

        store.finalize().unwrap();

        assert_eq!(store.values(7).unwrap().len(), 3);
        assert_eq!(store.values(8).unwrap().len(), 3);
        assert_eq!(store.values(7).unwrap()[..2], [20.0, 21.0]);
        assert!(store.values(7).unwrap()[2].is_nan());
        assert!(store.values(8).unwrap()[1].is_nan());
        assert_eq!(store.values(8).unwrap()[2], 42.0);
    }

    #[test]
    fn test_duplicate_value_replaces() {
        let mut store = zone_store();
        store.begin_environment("RUN").unwrap();
        store.advance_timestamp(Frequency::Hourly, hour(1)).unwrap();

        assert!(!store.record_value(7, 1.0).unwrap());
        assert!(store.record_value(7, 2.0).unwrap());
        assert_eq!(store.values(7).unwrap(), &[2.0]);
    }

    #[test]
    fn test_begin_environment_resets_buckets() {
        let mut store = zone_store();
        store.begin_environment("SIZING").unwrap();
        store.advance_timestamp(Frequency::Hourly, hour(1)).unwrap();
        store.record_value(7, 1.0).unwrap();

        store.begin_environment("RUN PERIOD").unwrap();
        assert!(store.timestamps(Frequency::Hourly).is_empty());
        assert_eq!(store.values(7).unwrap().len(), 0);
        assert_eq!(store.environment_name(), Some("RUN PERIOD"));
        // Dictionary survives the reset
        assert_eq!(store.variables(Frequency::Hourly).len(), 2);
    }

    #[test]
    fn test_begin_environment_clears_warnings() {
        let mut store = zone_store();
        store.begin_environment("SIZING").unwrap();
        store
            .push_warning(ParseWarning {
                line: 7,
                kind: WarningKind::DanglingRecord { id: 99 },
            })
            .unwrap();
        assert_eq!(store.warnings().len(), 1);

        store.begin_environment("RUN PERIOD").unwrap();
        assert!(store.warnings().is_empty());
    }

    #[test]
    fn test_shift_years() {
        let mut store = zone_store();
        store.begin_environment("RUN").unwrap();
        store.advance_timestamp(Frequency::Hourly, hour(1)).unwrap();
        store.advance_timestamp(Frequency::Daily, hour(0)).unwrap();

        store.shift_years(6).unwrap();
        assert_eq!(
            store.timestamps(Frequency::Hourly),
            &[calendar::interval_end(2008, 1, 1, 1, 60.0).unwrap()]
        );
        assert_eq!(
            store.timestamps(Frequency::Daily),
            &[calendar::day_start(2008, 1, 1).unwrap()]
        );

        let mut store = zone_store();
        store.begin_environment("RUN").unwrap();
        let leap_day = calendar::day_start(2008, 2, 29).unwrap();
        store.advance_timestamp(Frequency::Daily, leap_day).unwrap();
        assert_eq!(
            store.shift_years(1),
            Err(StorageError::InvalidYearShift {
                timestamp: leap_day,
                years: 1
            })
        );
    }

    #[test]
    fn test_finalize_freezes() {
        let mut store = zone_store();
        store.begin_environment("RUN").unwrap();
        store.finalize().unwrap();

        assert!(store.is_finalized());
        assert_eq!(
            store.advance_timestamp(Frequency::Hourly, hour(1)),
            Err(StorageError::AlreadyFinalized)
        );
        assert_eq!(store.record_value(7, 1.0), Err(StorageError::AlreadyFinalized));
        assert_eq!(store.begin_environment("X"), Err(StorageError::AlreadyFinalized));
        assert_eq!(store.finalize(), Err(StorageError::AlreadyFinalized));
    }

    #[test]
    fn test_snapshot_keeps_source_mutable() {
        let mut store = zone_store();
        store.begin_environment("RUN").unwrap();
        store.advance_timestamp(Frequency::Hourly, hour(1)).unwrap();
        store.record_value(7, 5.0).unwrap();

        let snapshot = store.snapshot();
        assert!(snapshot.is_finalized());
        assert_eq!(snapshot.values(8).unwrap().len(), 1);

        assert!(!store.is_finalized());
        store.advance_timestamp(Frequency::Hourly, hour(2)).unwrap();
        assert_eq!(snapshot.timestamps(Frequency::Hourly).len(), 1);
    }

    #[test]
    fn test_frequencies_and_variables_order() {
        let store = zone_store();
        assert_eq!(store.frequencies(), vec![Frequency::Hourly, Frequency::Daily]);

        let ids: Vec<u32> = store
            .variables(Frequency::Hourly)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![7, 8]);
        assert!(store.variables(Frequency::Monthly).is_empty());
    }

    #[test]
    fn test_step_metadata() {
        let mut store = TimeSeriesStore::new();
        store
            .register(ReportRecord::new(
                1,
                Variable::new("Zone1", "Temperature", "C"),
                Frequency::Monthly,
            ))
            .unwrap();
        store.begin_environment("RUN").unwrap();
        store
            .advance_step(Frequency::Monthly, hour(0), StepInfo::cumulative_days(31))
            .unwrap();
        store
            .advance_step(Frequency::Monthly, hour(24 * 31), StepInfo::cumulative_days(59))
            .unwrap();

        assert_eq!(store.n_days(Frequency::Monthly), Some(vec![31, 28]));
        assert_eq!(store.days_of_week(Frequency::Monthly), None);
        assert_eq!(store.n_days(Frequency::Hourly), None);
    }

    #[test]
    fn test_store_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TimeSeriesStore>();
    }
}
