//! Dense, integral summary tables and their CSV form.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// One row per group key, one `u64` per value column. Rows are kept sorted
/// by key; absent counts are zeros, never missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryTable {
    key_column: String,
    columns: Vec<String>,
    rows: BTreeMap<String, Vec<u64>>,
}

impl SummaryTable {
    #[must_use]
    pub fn new(key_column: &str, columns: Vec<String>) -> Self {
        Self {
            key_column: key_column.to_string(),
            columns,
            rows: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[u64])> {
        self.rows.iter().map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Mutable values of `key`, creating a zero row if absent.
    pub fn row_mut(&mut self, key: &str) -> &mut [u64] {
        let width = self.columns.len();
        self.rows
            .entry(key.to_string())
            .or_insert_with(|| vec![0; width])
    }

    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    #[must_use]
    pub fn value(&self, key: &str, column: &str) -> Option<u64> {
        let index = self.column_index(column)?;
        self.rows.get(key).map(|values| values[index])
    }

    /// Copy of this table laid out on `columns`, zero-filling columns it does
    /// not have.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSchema`] if this table has a column
    /// missing from `columns`.
    pub fn conform_to(&self, columns: &[String]) -> Result<Self> {
        let mut positions = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let position = columns.iter().position(|c| c == column).ok_or_else(|| {
                PipelineError::InvalidSchema(format!(
                    "column '{column}' has no place in target layout"
                ))
            })?;
            positions.push(position);
        }

        let mut conformed = Self::new(&self.key_column, columns.to_vec());
        for (key, values) in &self.rows {
            let row = conformed.row_mut(key);
            for (value, position) in values.iter().zip(&positions) {
                row[*position] = *value;
            }
        }
        Ok(conformed)
    }

    /// Single-row table holding the column sums under `key`.
    #[must_use]
    pub fn column_sums(&self, key: &str) -> Self {
        let mut sums = Self::new(&self.key_column, self.columns.clone());
        let row = sums.row_mut(key);
        for values in self.rows.values() {
            for (total, value) in row.iter_mut().zip(values) {
                *total += value;
            }
        }
        sums
    }

    /// Add every row of `other` (same layout) into this table.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSchema`] if the layouts differ.
    pub fn absorb(&mut self, other: &Self) -> Result<()> {
        if other.columns != self.columns || other.key_column != self.key_column {
            return Err(PipelineError::InvalidSchema(
                "cannot combine tables with different layouts".into(),
            ));
        }
        for (key, values) in &other.rows {
            match self.rows.entry(key.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(values.clone());
                }
                Entry::Occupied(mut slot) => {
                    for (total, value) in slot.get_mut().iter_mut().zip(values) {
                        *total += value;
                    }
                }
            }
        }
        Ok(())
    }

    /// Rename every value column to `<prefix><column>`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        for column in &mut self.columns {
            *column = format!("{prefix}{column}");
        }
        self
    }

    /// Read a summary CSV whose first column is `key_column`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingData`] if the file does not exist and
    /// [`PipelineError::SchemaMismatch`] if the key column differs or a value
    /// is not a non-negative integer.
    pub fn read_csv(path: &Path, key_column: &str) -> Result<Self> {
        if !path.is_file() {
            return Err(PipelineError::MissingData(path.to_path_buf()));
        }
        let mut reader =
            csv::Reader::from_path(path).map_err(|e| PipelineError::csv_read(path, e))?;
        let headers = reader
            .headers()
            .map_err(|e| PipelineError::csv_read(path, e))?
            .clone();

        let mismatch = |detail: String| PipelineError::SchemaMismatch {
            path: path.to_path_buf(),
            detail,
        };
        match headers.get(0) {
            Some(first) if first == key_column => {}
            other => {
                return Err(mismatch(format!(
                    "expected key column '{key_column}', found '{}'",
                    other.unwrap_or_default()
                )));
            }
        }

        let columns: Vec<String> = headers.iter().skip(1).map(ToString::to_string).collect();
        let mut table = Self::new(key_column, columns);
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| PipelineError::csv_read(path, e))?;
            let key = record.get(0).unwrap_or_default().to_string();
            let mut values = Vec::with_capacity(table.columns.len());
            for field in record.iter().skip(1) {
                let value = parse_count(field).ok_or_else(|| {
                    mismatch(format!("row {}: '{field}' is not a count", line + 1))
                })?;
                values.push(value);
            }
            if values.len() != table.columns.len() {
                return Err(mismatch(format!(
                    "row {} has {} values, header has {}",
                    line + 1,
                    values.len(),
                    table.columns.len()
                )));
            }
            table.rows.insert(key, values);
        }
        Ok(table)
    }

    /// Write the table to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| PipelineError::write(path, e))?;
        self.write_to(file, true, path)
    }

    /// Append rows to `path`, writing the header only when the file is new.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn append_csv(&self, path: &Path) -> Result<()> {
        let is_new = !path.is_file();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| PipelineError::write(path, e))?;
        self.write_to(file, is_new, path)
    }

    fn write_to(&self, sink: impl Write, header: bool, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_writer(sink);
        if header {
            let names = std::iter::once(self.key_column.as_str())
                .chain(self.columns.iter().map(String::as_str));
            writer
                .write_record(names)
                .map_err(|e| PipelineError::csv_write(path, e))?;
        }
        for (key, values) in &self.rows {
            let mut record = Vec::with_capacity(values.len() + 1);
            record.push(key.clone());
            record.extend(values.iter().map(u64::to_string));
            writer
                .write_record(&record)
                .map_err(|e| PipelineError::csv_write(path, e))?;
        }
        writer.flush().map_err(|e| PipelineError::write(path, e))?;
        Ok(())
    }
}

/// Parse an integral count. Accepts `"3"` and the `"3.0"` form older
/// float-typed exports used.
fn parse_count(field: &str) -> Option<u64> {
    let field = field.trim();
    if field.is_empty() {
        return Some(0);
    }
    field
        .parse::<u64>()
        .ok()
        .or_else(|| field.strip_suffix(".0").and_then(|n| n.parse().ok()))
}
