//! Results requests
//!
//! A request names the variables to select (as wildcard filters), the
//! frequency bucket to read and an optional inclusive date range.
//!
//! ```text
//! variables: [Zone1:Temperature:*, *:Site Outdoor Air Drybulb Temperature:*]
//! frequency: hourly
//! alike:     false
//! start/end: 2002-07-01 00:00:00 ..= 2002-07-31 23:00:00
//! ```

use crate::query::error::{QueryError, QueryResult};
use crate::storage::{DateRange, Frequency, Timestamp, Variable};
use serde::{Deserialize, Serialize};

/// A query against one frequency bucket of an output source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsRequest {
    /// Filters; a variable is selected when any filter matches it
    pub variables: Vec<Variable>,
    pub frequency: Frequency,
    /// Match present filter fields by substring instead of equality
    #[serde(default)]
    pub alike: bool,
    #[serde(default)]
    pub start: Option<Timestamp>,
    #[serde(default)]
    pub end: Option<Timestamp>,
}

impl ResultsRequest {
    /// Create a request for `variables` at `frequency`
    pub fn new(variables: impl IntoIterator<Item = Variable>, frequency: Frequency) -> Self {
        Self {
            variables: variables.into_iter().collect(),
            frequency,
            alike: false,
            start: None,
            end: None,
        }
    }

    /// Create a request naming its frequency as text (`"hourly"`, `"runperiod"`, ...)
    pub fn parse(
        variables: impl IntoIterator<Item = Variable>,
        frequency: &str,
    ) -> QueryResult<Self> {
        let frequency = frequency
            .parse::<Frequency>()
            .map_err(QueryError::InvalidFrequency)?;
        Ok(Self::new(variables, frequency))
    }

    /// Select every variable of the bucket
    pub fn all(frequency: Frequency) -> Self {
        Self::new([Variable::any()], frequency)
    }

    pub fn alike(mut self, alike: bool) -> Self {
        self.alike = alike;
        self
    }

    /// Inclusive lower bound
    pub fn start(mut self, start: Timestamp) -> Self {
        self.start = Some(start);
        self
    }

    /// Inclusive upper bound
    pub fn end(mut self, end: Timestamp) -> Self {
        self.end = Some(end);
        self
    }

    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }

    /// Reject requests no source can answer
    pub fn validate(&self) -> QueryResult<()> {
        if self.variables.is_empty() {
            return Err(QueryError::InvalidFilter(
                "at least one variable filter is required".to_string(),
            ));
        }
        Ok(())
    }
}
