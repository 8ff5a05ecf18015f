//! Assembly of flattened rows into a rectangular CSV table.

use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use crate::flatten::FlatRow;

#[cfg(windows)]
const LINE_TERMINATOR: Terminator = Terminator::CRLF;
#[cfg(not(windows))]
const LINE_TERMINATOR: Terminator = Terminator::Any(b'\n');

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("table has no rows")]
    Empty,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Flattened rows plus the union of their column names.
///
/// Columns are kept in first-seen order, so the header is stable for a
/// given result stream.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: IndexSet<String>,
    rows: Vec<FlatRow>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row, extending the column set with any new keys.
    pub fn push(&mut self, row: FlatRow) {
        for key in row.keys() {
            if !self.columns.contains(key) {
                self.columns.insert(key.clone());
            }
        }
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    /// Cells of `row` in column order, blank where the row has no value.
    pub fn record(&self, row: &FlatRow) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| render_cell(row.get(column)))
            .collect()
    }

    /// Write the header and every row to `writer`, quoting all fields.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), TableError> {
        if self.is_empty() {
            return Err(TableError::Empty);
        }

        let mut csv_writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(LINE_TERMINATOR)
            .from_writer(writer);

        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(self.record(row))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write the table to a CSV file at `path`, creating parent directories.
    ///
    /// Rows go to a hidden sibling file that is renamed over `path` once
    /// complete, so a failed write never leaves a truncated table behind.
    /// Returns the number of data rows written.
    pub fn write_to_path(&self, path: &Path) -> Result<u64, TableError> {
        if self.is_empty() {
            return Err(TableError::Empty);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let staging = staging_path(path);
        let written = File::create(&staging)
            .map_err(TableError::from)
            .and_then(|file| self.write_csv(io::BufWriter::new(file)))
            .and_then(|()| fs::rename(&staging, path).map_err(TableError::from));
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }

        debug!(
            path = %path.display(),
            rows = self.rows.len(),
            columns = self.columns.len(),
            "Wrote CSV table"
        );

        Ok(self.rows.len() as u64)
    }
}

/// `dir/.name.tmp` for `dir/name`.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_else(|| OsStr::new("table")));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Text of one CSV cell. Null and absent values are blank; nested values are
/// written as compact JSON.
pub fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
