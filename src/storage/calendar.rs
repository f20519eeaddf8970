//! Calendar helpers
//!
//! Simulation outputs identify steps by month, day and hour but carry no
//! calendar year. These helpers turn that information into timestamps:
//! - `YearTracker`: resolves the year of every step of one environment
//! - `interval_end`, `day_start`, `month_start`, `year_start`: step → timestamp

use crate::storage::types::Timestamp;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Year used when nothing pins or implies one
pub const DEFAULT_YEAR: i32 = 2002;

/// Latest year considered when inferring a year from a weekday
pub const LATEST_INFERRED_YEAR: i32 = 2020;

const EARLIEST_INFERRED_YEAR: i32 = 1900;

/// Parse a day type as a weekday; design-day and holiday types give None
pub fn parse_weekday(day_type: &str) -> Option<Weekday> {
    day_type.trim().parse::<Weekday>().ok()
}

/// Whether `year` has a 29 February
pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Latest year, not after `LATEST_INFERRED_YEAR`, where month/day is `weekday`
pub fn infer_year(month: u32, day: u32, weekday: Weekday) -> Option<i32> {
    (EARLIEST_INFERRED_YEAR..=LATEST_INFERRED_YEAR)
        .rev()
        .find(|year| {
            NaiveDate::from_ymd_opt(*year, month, day)
                .map(|date| date.weekday() == weekday)
                .unwrap_or(false)
        })
}

/// Resolves the calendar year of consecutive steps in one environment
///
/// The first step fixes the year (pinned, inferred from its weekday, or the
/// default); afterwards a decreasing month moves to the next year. An
/// unpinned year is revised when the file shows it cannot be right: a
/// 29 February in a common year, or an annual header stating the year that
/// was only defaulted.
#[derive(Debug, Clone)]
pub struct YearTracker {
    pinned: Option<i32>,
    first: Option<i32>,
    year: Option<i32>,
    last_month: Option<u32>,
    /// The year came from `DEFAULT_YEAR`, not from the file
    defaulted: bool,
}

impl YearTracker {
    pub fn new(pinned: Option<i32>) -> Self {
        Self {
            pinned,
            first: None,
            year: None,
            last_month: None,
            defaulted: false,
        }
    }

    /// Forget the state of the previous environment
    pub fn reset(&mut self) {
        self.first = None;
        self.year = None;
        self.last_month = None;
        self.defaulted = false;
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }

    /// Year of the first step of the environment
    pub fn first_year(&self) -> Option<i32> {
        self.first
    }

    /// Year of a step in `month`, optionally located on `day` with `day_type`
    pub fn resolve(&mut self, month: u32, day: Option<u32>, day_type: Option<&str>) -> i32 {
        let year = match (self.year, self.last_month) {
            (Some(year), Some(last)) if month < last => year + 1,
            (Some(year), _) => year,
            (None, _) => {
                let year = self.pinned.or_else(|| {
                    day.zip(day_type.and_then(parse_weekday))
                        .and_then(|(day, weekday)| infer_year(month, day, weekday))
                });
                self.defaulted = year.is_none();
                let year = year.unwrap_or(DEFAULT_YEAR);
                self.first = Some(year);
                year
            }
        };
        self.year = Some(year);
        self.last_month = Some(month);
        year
    }

    /// Move an unpinned year to a leap year when `month`/`day` is a
    /// 29 February the current year lacks
    ///
    /// The leap year is inferred from `day_type` when it names a weekday,
    /// otherwise the next leap year is taken. Returns the number of years
    /// every earlier step of the environment has to move by.
    pub fn fit_leap_day(&mut self, month: u32, day: u32, day_type: Option<&str>) -> Option<i32> {
        if self.pinned.is_some() || (month, day) != (2, 29) {
            return None;
        }
        let year = self.year?;
        if is_leap_year(year) {
            return None;
        }
        let leap = match day_type.and_then(parse_weekday) {
            Some(weekday) => infer_year(2, 29, weekday)?,
            None => (year..).find(|y| is_leap_year(*y))?,
        };
        Some(self.shift(leap - year))
    }

    /// Account for a year stated by the file
    ///
    /// A defaulted year moves to `stated`; returns the number of years every
    /// earlier step of the environment has to move by.
    pub fn observe_year(&mut self, stated: i32) -> Option<i32> {
        if self.pinned.is_some() {
            return None;
        }
        match self.year {
            None => {
                self.first = Some(stated);
                self.year = Some(stated);
                None
            }
            Some(year) if self.defaulted && year != stated => Some(self.shift(stated - year)),
            Some(_) => {
                self.defaulted = false;
                None
            }
        }
    }

    /// Year stamped on an annual step whose header states `stated`
    pub fn annual_year(&self, stated: i32) -> i32 {
        if self.pinned.is_some() {
            self.current()
        } else {
            stated
        }
    }

    fn shift(&mut self, years: i32) -> i32 {
        self.first = self.first.map(|y| y + years);
        self.year = self.year.map(|y| y + years);
        self.defaulted = false;
        years
    }

    /// Year of the latest step, or the starting year when none was seen
    pub fn current(&self) -> i32 {
        self.year.or(self.pinned).unwrap_or(DEFAULT_YEAR)
    }
}

/// Timestamp at the end of a timestep or hourly interval
///
/// `hour` is 1-based (1..=24) and `end_minute` counts minutes into that hour,
/// so hour 1 with end minute 60 is 01:00 and hour 24 rolls to the next day.
pub fn interval_end(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    end_minute: f64,
) -> Option<Timestamp> {
    if !(1..=24).contains(&hour) || !(0.0..=60.0).contains(&end_minute) {
        return None;
    }
    let minutes = (i64::from(hour) - 1) * 60 + end_minute.round() as i64;
    Some(day_start(year, month, day)? + Duration::minutes(minutes))
}

/// The same instant `years` calendar years later; None when it would land
/// on a missing 29 February
pub fn shift_years(timestamp: Timestamp, years: i32) -> Option<Timestamp> {
    timestamp.with_year(timestamp.year() + years)
}

/// Midnight at the start of a day
pub fn day_start(year: i32, month: u32, day: u32) -> Option<Timestamp> {
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
}

/// Midnight on the first day of a month
pub fn month_start(year: i32, month: u32) -> Option<Timestamp> {
    day_start(year, month, 1)
}

/// Midnight on 1 January
pub fn year_start(year: i32) -> Option<Timestamp> {
    day_start(year, 1, 1)
}
