//! Query Executor
//!
//! Answers a `ResultsRequest` from a finalized `TimeSeriesStore`.
//!
//! # Execution Pipeline
//!
//! ```text
//! Request → Validate → Bucket → Match variables → Slice dates → ResultsView
//! ```

use crate::query::error::QueryResult;
use crate::query::matcher::select_matching;
use crate::query::request::ResultsRequest;
use crate::query::results::ResultsView;
use crate::storage::{TimeSeriesStore, MISSING};

/// Run `request` against a parsed store
pub fn query(store: &TimeSeriesStore, request: &ResultsRequest) -> QueryResult<ResultsView> {
    request.validate()?;

    let bucket = match store.bucket(request.frequency) {
        Some(bucket) if !bucket.is_empty() => bucket,
        _ => {
            tracing::debug!(frequency = %request.frequency, "No steps recorded");
            return Ok(ResultsView::empty(request.frequency));
        }
    };

    let matched = select_matching(
        &request.variables,
        store.variables(request.frequency),
        request.alike,
    );

    let range = request.date_range().slice_indices(bucket.timestamps());
    let time_series = bucket.timestamps()[range.clone()].to_vec();

    let columns = matched
        .into_iter()
        .map(|(id, variable)| {
            let values = bucket.values(id).unwrap_or(&[]);
            let array = range
                .clone()
                .map(|i| values.get(i).copied().unwrap_or(MISSING))
                .collect::<Vec<f64>>();
            (variable.clone(), array)
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        frequency = %request.frequency,
        matched = columns.len(),
        steps = time_series.len(),
        "Query executed"
    );

    Ok(ResultsView::new(request.frequency, time_series, columns))
}
