//! Core data types for the eplusout time-series store
//!
//! This module defines the fundamental types used throughout the reader:
//! - `Variable`: A `(key, type, units)` identity or filter triple
//! - `Frequency`: The reporting interval bucket
//! - `ReportRecord`: One declared output of a simulation file
//! - `StepInfo`: Per-step metadata kept alongside timestamps
//! - `DateRange`: An inclusive, optionally open-ended date interval

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Timestamp type used for every time series
pub type Timestamp = NaiveDateTime;

/// Sentinel stored in a value slot whose number could not be read
pub const MISSING: f64 = f64::NAN;

/// Check whether a stored value is the missing sentinel
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// A reported output identity, or a filter over reported outputs
///
/// Each field is optional: an absent field acts as a wildcard when the
/// variable is used as a filter. Variables read from a file always carry
/// all three fields (units may be the empty string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variable {
    /// Reporting object, e.g. "BLOCK1:ZONE1", "Environment" or "Meter"
    pub key: Option<String>,
    /// Output name, e.g. "Zone Mean Air Temperature"
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    /// Units without brackets, e.g. "C"
    pub units: Option<String>,
}

impl Variable {
    /// Create a fully specified variable
    pub fn new(
        key: impl Into<String>,
        type_name: impl Into<String>,
        units: impl Into<String>,
    ) -> Self {
        Self {
            key: Some(key.into()),
            type_name: Some(type_name.into()),
            units: Some(units.into()),
        }
    }

    /// Create an all-wildcard filter which matches every stored variable
    pub fn any() -> Self {
        Self {
            key: None,
            type_name: None,
            units: None,
        }
    }

    /// Builder: constrain the key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Builder: constrain the type
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Builder: constrain the units
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// True when no field is constrained
    pub fn is_wildcard(&self) -> bool {
        self.key.is_none() && self.type_name.is_none() && self.units.is_none()
    }

    /// Fields in `(key, type, units)` order
    pub fn fields(&self) -> [Option<&str>; 3] {
        [
            self.key.as_deref(),
            self.type_name.as_deref(),
            self.units.as_deref(),
        ]
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [key, type_name, units] = self.fields();
        write!(
            f,
            "{}:{}:{}",
            key.unwrap_or("*"),
            type_name.unwrap_or("*"),
            units.unwrap_or("*")
        )
    }
}

/// Reporting interval of an output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every zone or system timestep
    Timestep,
    Hourly,
    Daily,
    Monthly,
    /// Once per calendar year
    Annual,
    /// Once per environment
    RunPeriod,
}

impl Frequency {
    /// Get all frequencies in listing order
    pub fn all() -> &'static [Frequency] {
        &[
            Frequency::Timestep,
            Frequency::Hourly,
            Frequency::Daily,
            Frequency::Monthly,
            Frequency::Annual,
            Frequency::RunPeriod,
        ]
    }

    /// Map a frequency token as written in ESO dictionary comments
    ///
    /// Case-insensitive; spaces are ignored so "Run Period" and "RunPeriod"
    /// are the same token.
    pub fn from_token(token: &str) -> Option<Self> {
        let normalized: String = token
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "ts" | "timestep" | "eachcall" => Some(Frequency::Timestep),
            "hourly" => Some(Frequency::Hourly),
            "daily" => Some(Frequency::Daily),
            "monthly" => Some(Frequency::Monthly),
            "annual" => Some(Frequency::Annual),
            "runperiod" => Some(Frequency::RunPeriod),
            _ => None,
        }
    }

    /// True for the buckets stamped by timestep/hourly interval headers
    pub fn is_sub_daily(&self) -> bool {
        matches!(self, Frequency::Timestep | Frequency::Hourly)
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Timestep => write!(f, "timestep"),
            Frequency::Hourly => write!(f, "hourly"),
            Frequency::Daily => write!(f, "daily"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Annual => write!(f, "annual"),
            Frequency::RunPeriod => write!(f, "runperiod"),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Frequency::from_token(s).ok_or_else(|| s.to_string())
    }
}

/// One declared output of a simulation file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRecord {
    /// File-local id joining the dictionary to the data lines
    pub id: u32,
    pub variable: Variable,
    pub frequency: Frequency,
}

impl ReportRecord {
    pub fn new(id: u32, variable: Variable, frequency: Frequency) -> Self {
        Self {
            id,
            variable,
            frequency,
        }
    }
}

/// Metadata of one reported step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepInfo {
    /// Day type of the step ("Tuesday", "SummerDesignDay", ...)
    pub day_type: Option<String>,
    /// Cumulative simulation days reached at this step
    pub cumulative_days: Option<u32>,
}

impl StepInfo {
    pub fn day_type(day_type: impl Into<String>) -> Self {
        Self {
            day_type: Some(day_type.into()),
            cumulative_days: None,
        }
    }

    pub fn cumulative_days(days: u32) -> Self {
        Self {
            day_type: None,
            cumulative_days: Some(days),
        }
    }
}

/// Inclusive date interval for queries (`[start, end]`)
///
/// An absent bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl DateRange {
    pub fn new(start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        Self { start, end }
    }

    /// Range with no bounds at all
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// True when the bounds are inverted, so nothing can fall inside
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }

    /// Check if a timestamp falls within this range
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.start.map_or(true, |s| timestamp >= s) && self.end.map_or(true, |e| timestamp <= e)
    }

    /// Index range of `timestamps` (sorted, non-decreasing) inside this range
    pub fn slice_indices(&self, timestamps: &[Timestamp]) -> std::ops::Range<usize> {
        if self.is_inverted() {
            return 0..0;
        }
        let lo = match self.start {
            Some(s) => timestamps.partition_point(|t| *t < s),
            None => 0,
        };
        let hi = match self.end {
            Some(e) => timestamps.partition_point(|t| *t <= e),
            None => timestamps.len(),
        };
        if lo >= hi {
            0..0
        } else {
            lo..hi
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2002, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_variable_builders() {
        let filter = Variable::any().with_key("BLOCK1:ZONE1").with_units("C");
        assert_eq!(filter.key.as_deref(), Some("BLOCK1:ZONE1"));
        assert!(filter.type_name.is_none());
        assert!(!filter.is_wildcard());
        assert!(Variable::any().is_wildcard());

        let var = Variable::new("Environment", "Site Outdoor Air Drybulb Temperature", "C");
        assert_eq!(
            var.to_string(),
            "Environment:Site Outdoor Air Drybulb Temperature:C"
        );
    }

    #[test]
    fn test_empty_units_are_not_a_wildcard() {
        let var = Variable::new("Zone", "Count", "");
        assert_eq!(var.units.as_deref(), Some(""));
        assert!(!var.is_wildcard());
    }

    #[test]
    fn test_frequency_tokens() {
        assert_eq!(Frequency::from_token("TimeStep"), Some(Frequency::Timestep));
        assert_eq!(Frequency::from_token("TS"), Some(Frequency::Timestep));
        assert_eq!(Frequency::from_token("Each Call"), Some(Frequency::Timestep));
        assert_eq!(Frequency::from_token("hourly"), Some(Frequency::Hourly));
        assert_eq!(Frequency::from_token("Run Period"), Some(Frequency::RunPeriod));
        assert_eq!(Frequency::from_token("RunPeriod"), Some(Frequency::RunPeriod));
        assert_eq!(Frequency::from_token("fortnightly"), None);

        assert_eq!("annual".parse::<Frequency>(), Ok(Frequency::Annual));
        assert!("weekly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_frequency_display_round_trips() {
        for freq in Frequency::all() {
            assert_eq!(freq.to_string().parse::<Frequency>(), Ok(*freq));
        }
    }

    #[test]
    fn test_date_range_contains() {
        let range = DateRange::new(Some(at(1, 1)), Some(at(1, 23)));

        assert!(!range.contains(at(1, 0)));
        assert!(range.contains(at(1, 1)));
        assert!(range.contains(at(1, 23)));
        assert!(!range.contains(at(2, 0)));
        assert!(DateRange::unbounded().contains(at(9, 9)));
    }

    #[test]
    fn test_slice_indices() {
        let stamps: Vec<Timestamp> = (1..=24).map(|h| at(1, 0) + chrono::Duration::hours(h)).collect();

        let range = DateRange::new(Some(at(1, 1)), Some(at(1, 23)));
        assert_eq!(range.slice_indices(&stamps), 0..23);

        let open_start = DateRange::new(None, Some(at(1, 3)));
        assert_eq!(open_start.slice_indices(&stamps), 0..3);

        let open_end = DateRange::new(Some(at(1, 22)), None);
        assert_eq!(open_end.slice_indices(&stamps), 21..24);

        let inverted = DateRange::new(Some(at(1, 5)), Some(at(1, 2)));
        assert!(inverted.is_inverted());
        assert_eq!(inverted.slice_indices(&stamps), 0..0);

        let outside = DateRange::new(Some(at(5, 0)), None);
        assert_eq!(outside.slice_indices(&stamps), 0..0);
    }

    #[test]
    fn test_missing_sentinel() {
        assert!(is_missing(MISSING));
        assert!(!is_missing(0.0));
    }
}
