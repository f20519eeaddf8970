//! ESO line grammar
//!
//! Parses single lines of an ESO file into typed records. The parser state
//! machine decides which grammar applies to a line.
//!
//! # Dictionary lines
//!
//! ```text
//! 1,5,Environment Title[],Latitude[deg],Longitude[deg],Time Zone[],Elevation[m]
//! 2,8,Day of Simulation[],Month[],Day of Month[],DST Indicator[1=yes 0=no],Hour[],StartMinute[],EndMinute[],DayType
//! 7,1,Environment,Site Outdoor Air Drybulb Temperature [C] !Hourly
//! 9,7,BLOCK1:ZONE1,Zone Mean Air Temperature [C] !Daily [Value,Min,Hour,Minute,Max,Hour,Minute]
//! 56,1,Electricity:Facility [J] !Monthly [Value,Min,Day,Hour,Minute,Max,Day,Hour,Minute]
//! ```
//!
//! # Data lines
//!
//! ```text
//! 1,UNTITLED (01-01:31-12),  48.15,  17.10,   1.00, 138.00
//! 2,1, 1, 1, 0, 1, 0.00,60.00,Tuesday
//! 7,-1.35
//! ```

use crate::storage::{Frequency, Variable};
use nom::{
    character::complete::{char, space0, u32 as decimal},
    sequence::{delimited, terminated},
    IResult,
};

/// Header families a dictionary can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StampKind {
    Environment,
    /// Shared by timestep and hourly outputs
    Interval,
    Daily,
    Monthly,
    RunPeriod,
    Annual,
}

impl StampKind {
    /// Header family that stamps outputs of `frequency`
    pub fn for_frequency(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Timestep | Frequency::Hourly => StampKind::Interval,
            Frequency::Daily => StampKind::Daily,
            Frequency::Monthly => StampKind::Monthly,
            Frequency::RunPeriod => StampKind::RunPeriod,
            Frequency::Annual => StampKind::Annual,
        }
    }
}

/// A parsed dictionary line
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// Reserved declaration of an environment or interval header
    Stamp { id: u32, kind: StampKind },
    /// A reported output
    Output {
        id: u32,
        field_count: u32,
        variable: Variable,
        frequency: Frequency,
    },
}

/// Why a dictionary line was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationError {
    Malformed(String),
    UnknownFrequency(String),
}

/// Leading `id,` of any line
fn id_prefix(input: &str) -> IResult<&str, u32> {
    terminated(delimited(space0, decimal, space0), char(','))(input)
}

/// Field count following the id; the trailing comma is absent on lines
/// without fields
fn count_prefix(input: &str) -> IResult<&str, u32> {
    let (input, count) = delimited(space0, decimal, space0)(input)?;
    match char::<&str, nom::error::Error<&str>>(',')(input) {
        Ok((rest, _)) => Ok((rest, count)),
        Err(_) => Ok((input, count)),
    }
}

/// Split a line into its leading id and the remaining text
pub fn split_id(line: &str) -> Option<(u32, &str)> {
    id_prefix(line).ok().map(|(rest, id)| (id, rest))
}

fn stamp_kind(first_field: &str, field_count: u32) -> Option<StampKind> {
    let name = first_field.trim();
    let is = |expected: &str| name.eq_ignore_ascii_case(expected);

    if is("Environment Title[]") {
        Some(StampKind::Environment)
    } else if is("Day of Simulation[]") {
        Some(StampKind::Interval)
    } else if is("Cumulative Day of Simulation[]") {
        Some(StampKind::Daily)
    } else if is("Cumulative Days of Simulation[]") {
        if field_count >= 2 {
            Some(StampKind::Monthly)
        } else {
            Some(StampKind::RunPeriod)
        }
    } else if is("Calendar Year of Simulation[]") {
        Some(StampKind::Annual)
    } else {
        None
    }
}

/// Split `Name [units]` into its name and units; units are empty when the
/// brackets are missing
pub fn split_units(text: &str) -> (String, String) {
    let text = text.trim();
    if let Some(stripped) = text.strip_suffix(']') {
        if let Some(open) = stripped.rfind('[') {
            return (
                stripped[..open].trim().to_string(),
                stripped[open + 1..].trim().to_string(),
            );
        }
    }
    (text.to_string(), String::new())
}

/// Frequency token of a dictionary comment such as `Daily [Value,Min,...]`
fn frequency_token(comment: &str) -> &str {
    comment.split('[').next().unwrap_or("").trim()
}

/// Parse one dictionary line
pub fn parse_declaration(line: &str) -> Result<Declaration, DeclarationError> {
    let (statement, comment) = match line.split_once('!') {
        Some((statement, comment)) => (statement, Some(comment)),
        None => (line, None),
    };

    let (rest, id) = id_prefix(statement)
        .map_err(|_| DeclarationError::Malformed("invalid record id".to_string()))?;
    let (rest, field_count) = count_prefix(rest)
        .map_err(|_| DeclarationError::Malformed("invalid field count".to_string()))?;

    let fields: Vec<&str> = rest
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    let first = fields
        .first()
        .ok_or_else(|| DeclarationError::Malformed("missing output name".to_string()))?;

    if let Some(kind) = stamp_kind(first, field_count) {
        return Ok(Declaration::Stamp { id, kind });
    }

    let token = comment.map(frequency_token).unwrap_or("");
    let frequency = Frequency::from_token(token)
        .ok_or_else(|| DeclarationError::UnknownFrequency(token.to_string()))?;

    // Meters carry no key field
    let variable = if fields.len() == 1 {
        let (name, units) = split_units(first);
        let key = if name.starts_with("Cumulative ") {
            "Cumulative Meter"
        } else {
            "Meter"
        };
        Variable::new(key, name, units)
    } else {
        let (name, units) = split_units(&fields[1..].join(","));
        Variable::new(*first, name, units)
    };

    Ok(Declaration::Output {
        id,
        field_count,
        variable,
        frequency,
    })
}

/// Environment header: `name, latitude, longitude, time zone, elevation`
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentHeader {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub time_zone: Option<f64>,
    pub elevation: Option<f64>,
}

/// Timestep/hourly header: `day of sim, month, day, dst, hour, start, end, day type`
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalHeader {
    pub day_of_simulation: u32,
    pub month: u32,
    pub day: u32,
    pub dst: u32,
    pub hour: u32,
    pub start_minute: f64,
    pub end_minute: f64,
    pub day_type: String,
}

impl IntervalHeader {
    /// Reporting interval length in minutes
    pub fn interval_minutes(&self) -> f64 {
        self.end_minute - self.start_minute
    }
}

/// Daily header: `cumulative day, month, day, dst, day type`
#[derive(Debug, Clone, PartialEq)]
pub struct DailyHeader {
    pub cumulative_day: u32,
    pub month: u32,
    pub day: u32,
    pub dst: u32,
    pub day_type: String,
}

/// Monthly header: `cumulative days, month`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyHeader {
    pub cumulative_days: u32,
    pub month: u32,
}

fn fields(rest: &str) -> Vec<&str> {
    rest.split(',').map(str::trim).collect()
}

fn field<T: std::str::FromStr>(fields: &[&str], index: usize, what: &str) -> Result<T, String> {
    let raw = fields
        .get(index)
        .ok_or_else(|| format!("missing {}", what))?;
    raw.parse::<T>()
        .map_err(|_| format!("invalid {} '{}'", what, raw))
}

/// Parse the text following the id of an environment header
pub fn parse_environment(rest: &str) -> Result<EnvironmentHeader, String> {
    let fields = fields(rest);
    let name = fields
        .first()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| "missing environment name".to_string())?;
    let number = |index: usize| fields.get(index).and_then(|f| f.parse::<f64>().ok());

    Ok(EnvironmentHeader {
        name: name.to_string(),
        latitude: number(1),
        longitude: number(2),
        time_zone: number(3),
        elevation: number(4),
    })
}

/// Parse the text following the id of a timestep/hourly header
pub fn parse_interval(rest: &str) -> Result<IntervalHeader, String> {
    let fields = fields(rest);
    Ok(IntervalHeader {
        day_of_simulation: field(&fields, 0, "day of simulation")?,
        month: field(&fields, 1, "month")?,
        day: field(&fields, 2, "day of month")?,
        dst: field(&fields, 3, "DST indicator")?,
        hour: field(&fields, 4, "hour")?,
        start_minute: field(&fields, 5, "start minute")?,
        end_minute: field(&fields, 6, "end minute")?,
        day_type: fields.get(7).map(|s| s.to_string()).unwrap_or_default(),
    })
}

/// Parse the text following the id of a daily header
pub fn parse_daily(rest: &str) -> Result<DailyHeader, String> {
    let fields = fields(rest);
    Ok(DailyHeader {
        cumulative_day: field(&fields, 0, "cumulative day")?,
        month: field(&fields, 1, "month")?,
        day: field(&fields, 2, "day of month")?,
        dst: field(&fields, 3, "DST indicator")?,
        day_type: fields.get(4).map(|s| s.to_string()).unwrap_or_default(),
    })
}

/// Parse the text following the id of a monthly header
pub fn parse_monthly(rest: &str) -> Result<MonthlyHeader, String> {
    let fields = fields(rest);
    Ok(MonthlyHeader {
        cumulative_days: field(&fields, 0, "cumulative days")?,
        month: field(&fields, 1, "month")?,
    })
}

/// Parse the text following the id of a run-period header
pub fn parse_run_period(rest: &str) -> Result<u32, String> {
    field(&fields(rest), 0, "cumulative days")
}

/// Parse the text following the id of an annual header
pub fn parse_annual(rest: &str) -> Result<i32, String> {
    field(&fields(rest), 0, "calendar year")
}

/// Value field of a data line; extra fields (min/max columns) are ignored
pub fn data_value(rest: &str) -> &str {
    rest.split(',').next().unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variable_declaration() {
        let decl =
            parse_declaration("7,1,Environment,Site Outdoor Air Drybulb Temperature [C] !Hourly")
                .unwrap();
        assert_eq!(
            decl,
            Declaration::Output {
                id: 7,
                field_count: 1,
                variable: Variable::new("Environment", "Site Outdoor Air Drybulb Temperature", "C"),
                frequency: Frequency::Hourly,
            }
        );
    }

    #[test]
    fn test_parse_declaration_with_column_list() {
        let decl = parse_declaration(
            "9,7,BLOCK1:ZONE1,Zone Mean Air Temperature [C] !Daily [Value,Min,Hour,Minute,Max,Hour,Minute]",
        )
        .unwrap();
        match decl {
            Declaration::Output {
                variable,
                frequency,
                field_count,
                ..
            } => {
                assert_eq!(variable.key.as_deref(), Some("BLOCK1:ZONE1"));
                assert_eq!(frequency, Frequency::Daily);
                assert_eq!(field_count, 7);
            }
            other => panic!("unexpected declaration {:?}", other),
        }
    }

    #[test]
    fn test_parse_meter_declaration() {
        let decl = parse_declaration("56,1,Electricity:Facility [J] !Monthly").unwrap();
        match decl {
            Declaration::Output { variable, .. } => {
                assert_eq!(variable, Variable::new("Meter", "Electricity:Facility", "J"));
            }
            other => panic!("unexpected declaration {:?}", other),
        }

        let decl = parse_declaration("57,1,Cumulative Electricity:Facility [J] !RunPeriod").unwrap();
        match decl {
            Declaration::Output { variable, frequency, .. } => {
                assert_eq!(variable.key.as_deref(), Some("Cumulative Meter"));
                assert_eq!(frequency, Frequency::RunPeriod);
            }
            other => panic!("unexpected declaration {:?}", other),
        }
    }

    #[test]
    fn test_parse_stamp_declarations() {
        let cases = [
            (
                "1,5,Environment Title[],Latitude[deg],Longitude[deg],Time Zone[],Elevation[m]",
                StampKind::Environment,
            ),
            (
                "2,8,Day of Simulation[],Month[],Day of Month[],DST Indicator[1=yes 0=no],Hour[],StartMinute[],EndMinute[],DayType",
                StampKind::Interval,
            ),
            (
                "3,5,Cumulative Day of Simulation[],Month[],Day of Month[],DST Indicator[1=yes 0=no],DayType  ! When Daily Report Variables Requested",
                StampKind::Daily,
            ),
            (
                "4,2,Cumulative Days of Simulation[],Month[]  ! When Monthly Report Variables Requested",
                StampKind::Monthly,
            ),
            (
                "5,1,Cumulative Days of Simulation[] ! When Run Period Report Variables Requested",
                StampKind::RunPeriod,
            ),
            (
                "6,1,Calendar Year of Simulation[] ! When Annual Report Variables Requested",
                StampKind::Annual,
            ),
        ];
        for (line, kind) in cases {
            match parse_declaration(line).unwrap() {
                Declaration::Stamp { kind: parsed, .. } => assert_eq!(parsed, kind, "{}", line),
                other => panic!("unexpected declaration {:?}", other),
            }
        }
    }

    #[test]
    fn test_declaration_errors() {
        assert!(matches!(
            parse_declaration("x,1,Zone,Temp [C] !Hourly"),
            Err(DeclarationError::Malformed(_))
        ));
        assert!(matches!(
            parse_declaration("7,one,Zone,Temp [C] !Hourly"),
            Err(DeclarationError::Malformed(_))
        ));
        assert_eq!(
            parse_declaration("7,1,Zone,Temp [C] !Fortnightly"),
            Err(DeclarationError::UnknownFrequency("Fortnightly".to_string()))
        );
        assert_eq!(
            parse_declaration("7,1,Zone,Temp [C]"),
            Err(DeclarationError::UnknownFrequency(String::new()))
        );
    }

    #[test]
    fn test_split_units() {
        assert_eq!(
            split_units("Zone Mean Air Temperature [C]"),
            ("Zone Mean Air Temperature".to_string(), "C".to_string())
        );
        assert_eq!(split_units("Count []"), ("Count".to_string(), String::new()));
        assert_eq!(split_units("No Units"), ("No Units".to_string(), String::new()));
    }

    #[test]
    fn test_parse_headers() {
        let (id, rest) = split_id("1,UNTITLED (01-01:31-12),  48.15,  17.10,   1.00, 138.00").unwrap();
        assert_eq!(id, 1);
        let env = parse_environment(rest).unwrap();
        assert_eq!(env.name, "UNTITLED (01-01:31-12)");
        assert_eq!(env.elevation, Some(138.0));

        let (_, rest) = split_id("2,1, 1, 1, 0, 1, 0.00,60.00,Tuesday").unwrap();
        let interval = parse_interval(rest).unwrap();
        assert_eq!((interval.month, interval.day, interval.hour), (1, 1, 1));
        assert_eq!(interval.interval_minutes(), 60.0);
        assert_eq!(interval.day_type, "Tuesday");

        let (_, rest) = split_id("3,1, 1, 1, 0,Tuesday").unwrap();
        let daily = parse_daily(rest).unwrap();
        assert_eq!(daily.cumulative_day, 1);
        assert_eq!(daily.day_type, "Tuesday");

        let (_, rest) = split_id("4,31, 1").unwrap();
        assert_eq!(
            parse_monthly(rest).unwrap(),
            MonthlyHeader {
                cumulative_days: 31,
                month: 1
            }
        );

        let (_, rest) = split_id("5,365").unwrap();
        assert_eq!(parse_run_period(rest).unwrap(), 365);

        let (_, rest) = split_id("6,2002").unwrap();
        assert_eq!(parse_annual(rest).unwrap(), 2002);
    }

    #[test]
    fn test_malformed_interval_header() {
        let err = parse_interval("1, 1, x, 0, 1, 0.00,60.00,Tuesday").unwrap_err();
        assert_eq!(err, "invalid day of month 'x'");
        assert_eq!(parse_monthly("31").unwrap_err(), "missing month");
    }

    #[test]
    fn test_data_value() {
        let (id, rest) = split_id("9,20.5,15.2, 3,15,25.1,14,30").unwrap();
        assert_eq!(id, 9);
        assert_eq!(data_value(rest), "20.5");
        assert!(split_id("End of Data").is_none());
    }
}
