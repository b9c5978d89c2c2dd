use std::fs::{self, File};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{PipelineError, Result};

/// Streaming CSV writer for one record type.
///
/// The header comes from the first record's field names. A writer that is
/// finished without records leaves an empty file.
pub struct RecordWriter<T> {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: usize,
    _record: PhantomData<fn(&T)>,
}

impl<T: Serialize> RecordWriter<T> {
    /// Create (or truncate) `path`. Parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns an I/O error naming `path`.
    pub fn create(path: &Path) -> Result<Self> {
        ensure_parent(path)?;
        let file = File::create(path).map_err(|e| PipelineError::write(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: csv::Writer::from_writer(file),
            rows: 0,
            _record: PhantomData,
        })
    }

    /// # Errors
    ///
    /// Returns a CSV error naming the file.
    pub fn write(&mut self, record: &T) -> Result<()> {
        self.writer
            .serialize(record)
            .map_err(|e| PipelineError::csv_write(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and close, returning the number of records written.
    ///
    /// # Errors
    ///
    /// Returns an I/O error naming the file.
    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .map_err(|e| PipelineError::write(&self.path, e))?;
        Ok(self.rows)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| PipelineError::write(parent, e))?;
    }
    Ok(())
}
