//! Delimited-text export
//!
//! Layout of an exported view:
//!
//! ```text
//! Zone temperatures                         <- optional title row
//! timestamp,BLOCK1:ZONE1:Zone Mean Air Temperature:C,...
//! 2002-01-01 01:00:00,21.3,...
//! 2002-01-01 02:00:00,,...                  <- missing value
//! ```
//!
//! With an exploded header the single header row becomes three rows labelled
//! `key`, `type` and `units`, one field per cell.

use crate::query::error::{QueryError, QueryResult};
use crate::query::results::ResultsView;
use crate::storage::{is_missing, Timestamp, Variable, MISSING};
use chrono::NaiveDateTime;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Format of the timestamp column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TIMESTAMP_LABEL: &str = "timestamp";
const EXPLODED_LABELS: [&str; 3] = ["key", "type", "units"];

/// How a view is written to delimited text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: u8,
    /// Three header rows (key, type, units) instead of one combined row
    pub explode_header: bool,
    pub title: Option<String>,
    /// Add rows after existing content instead of replacing the file
    pub append: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            explode_header: false,
            title: None,
            append: false,
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_exploded_header(mut self, explode: bool) -> Self {
        self.explode_header = explode;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    fn header_rows(&self) -> usize {
        if self.explode_header {
            EXPLODED_LABELS.len()
        } else {
            1
        }
    }
}

fn format_value(value: f64) -> String {
    if is_missing(value) {
        String::new()
    } else {
        value.to_string()
    }
}

fn field_text(field: Option<&str>) -> &str {
    field.unwrap_or("*")
}

impl ResultsView {
    /// Write the view to `path`
    ///
    /// In append mode an existing non-empty file only receives data rows.
    pub fn to_csv(&self, path: impl AsRef<Path>, options: &ExportOptions) -> QueryResult<()> {
        let path = path.as_ref();
        let append = options.append
            && fs::metadata(path)
                .map(|meta| meta.len() > 0)
                .unwrap_or(false);

        let file = if append {
            OpenOptions::new().append(true).open(path)?
        } else {
            File::create(path)?
        };

        tracing::debug!(
            path = %path.display(),
            append,
            rows = self.time_series().len(),
            "Exporting results"
        );
        self.write_csv(BufWriter::new(file), options, !append)
    }

    /// Write the view to any writer; `preamble` controls the title and header
    pub fn write_csv<W: Write>(
        &self,
        writer: W,
        options: &ExportOptions,
        preamble: bool,
    ) -> QueryResult<()> {
        let mut csv = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .flexible(true)
            .from_writer(writer);

        if preamble {
            if let Some(title) = &options.title {
                csv.write_record([title.as_str()])?;
            }
            if options.explode_header {
                for (i, label) in EXPLODED_LABELS.iter().enumerate() {
                    let mut row = vec![label.to_string()];
                    row.extend(
                        self.variables()
                            .iter()
                            .map(|v| field_text(v.fields()[i]).to_string()),
                    );
                    csv.write_record(&row)?;
                }
            } else {
                let mut row = vec![TIMESTAMP_LABEL.to_string()];
                row.extend(self.variables().iter().map(|v| v.to_string()));
                csv.write_record(&row)?;
            }
        }

        for (i, timestamp) in self.time_series().iter().enumerate() {
            let mut row = vec![timestamp.format(TIMESTAMP_FORMAT).to_string()];
            row.extend(
                self.arrays()
                    .iter()
                    .map(|array| format_value(array.get(i).copied().unwrap_or(MISSING))),
            );
            csv.write_record(&row)?;
        }

        csv.flush()?;
        Ok(())
    }
}

/// Contents of an exported file, read back
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedTable {
    pub title: Option<String>,
    /// Combined `key:type:units` label of every value column
    pub columns: Vec<String>,
    /// Variables of the value columns; only known for exploded headers
    pub variables: Vec<Variable>,
    pub time_series: Vec<Timestamp>,
    /// One array per value column; empty cells are missing values
    pub arrays: Vec<Vec<f64>>,
}

impl ExportedTable {
    /// Values of a column by its combined label
    pub fn column(&self, label: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|c| c == label)
            .map(|i| self.arrays[i].as_slice())
    }
}

fn csv_error(line: usize, message: impl std::fmt::Display) -> QueryError {
    QueryError::Csv(format!("line {}: {}", line, message))
}

/// Read a file written by [`ResultsView::to_csv`] with the same options
pub fn read_csv(path: impl AsRef<Path>, options: &ExportOptions) -> QueryResult<ExportedTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path.as_ref())?;

    let mut records = reader.records().enumerate();
    let mut next_row = |what: &str| -> QueryResult<csv::StringRecord> {
        match records.next() {
            Some((_, record)) => Ok(record?),
            None => Err(QueryError::Csv(format!("missing {} row", what))),
        }
    };

    let title = match options.title {
        Some(_) => Some(next_row("title")?.get(0).unwrap_or("").to_string()),
        None => None,
    };

    let header: Vec<csv::StringRecord> = (0..options.header_rows())
        .map(|_| next_row("header"))
        .collect::<QueryResult<_>>()?;

    let width = header[0].len().saturating_sub(1);
    let cell = |row: &csv::StringRecord, i: usize| row.get(i + 1).unwrap_or("").to_string();

    let (columns, variables): (Vec<String>, Vec<Variable>) = if options.explode_header {
        let variables: Vec<Variable> = (0..width)
            .map(|i| {
                Variable::new(
                    cell(&header[0], i),
                    cell(&header[1], i),
                    cell(&header[2], i),
                )
            })
            .collect();
        let columns = variables.iter().map(|v| v.to_string()).collect();
        (columns, variables)
    } else {
        ((0..width).map(|i| cell(&header[0], i)).collect(), Vec::new())
    };

    let mut time_series = Vec::new();
    let mut arrays = vec![Vec::new(); width];
    for (index, record) in records {
        let line = index + 1;
        let record = record?;
        let raw = record.get(0).unwrap_or("").trim();
        let timestamp = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .map_err(|e| csv_error(line, format!("invalid timestamp '{}': {}", raw, e)))?;
        time_series.push(timestamp);

        for (i, array) in arrays.iter_mut().enumerate() {
            let raw = record.get(i + 1).unwrap_or("").trim();
            let value = if raw.is_empty() {
                MISSING
            } else {
                raw.parse::<f64>()
                    .map_err(|_| csv_error(line, format!("invalid value '{}'", raw)))?
            };
            array.push(value);
        }
    }

    Ok(ExportedTable {
        title,
        columns,
        variables,
        time_series,
        arrays,
    })
}
