//! Results view
//!
//! Read-only answer to a `ResultsRequest`: one shared time axis and, per
//! matched variable, a value array of the same length.

use crate::storage::{Frequency, Timestamp, Variable};
use serde::Serialize;

/// Matched variables and their values at one frequency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsView {
    frequency: Frequency,
    time_series: Vec<Timestamp>,
    variables: Vec<Variable>,
    arrays: Vec<Vec<f64>>,
}

impl ResultsView {
    /// Assemble a view; every array must be as long as `time_series`
    pub(crate) fn new(
        frequency: Frequency,
        time_series: Vec<Timestamp>,
        columns: Vec<(Variable, Vec<f64>)>,
    ) -> Self {
        debug_assert!(columns.iter().all(|(_, a)| a.len() == time_series.len()));
        let (variables, arrays): (Vec<Variable>, Vec<Vec<f64>>) = columns.into_iter().unzip();
        Self {
            frequency,
            time_series,
            variables,
            arrays,
        }
    }

    /// View without steps or variables
    pub fn empty(frequency: Frequency) -> Self {
        Self::new(frequency, Vec::new(), Vec::new())
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn time_series(&self) -> &[Timestamp] {
        &self.time_series
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Value arrays, index-aligned with `variables()`
    pub fn arrays(&self) -> &[Vec<f64>] {
        &self.arrays
    }

    /// Number of matched variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn first_variable(&self) -> Option<&Variable> {
        self.variables.first()
    }

    pub fn first_array(&self) -> Option<&[f64]> {
        self.arrays.first().map(Vec::as_slice)
    }

    /// First value of the first array; handy for run-period and annual results
    pub fn scalar(&self) -> Option<f64> {
        self.first_array()?.first().copied()
    }

    /// Values of a matched variable (compared structurally)
    pub fn get(&self, variable: &Variable) -> Option<&[f64]> {
        self.variables
            .iter()
            .position(|v| v == variable)
            .map(|i| self.arrays[i].as_slice())
    }

    /// `(Variable, values)` pairs in match order
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &[f64])> {
        self.variables
            .iter()
            .zip(self.arrays.iter().map(Vec::as_slice))
    }
}

impl<'a> IntoIterator for &'a ResultsView {
    type Item = (&'a Variable, &'a [f64]);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
