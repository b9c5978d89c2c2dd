use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Locate `<dir>/<stem>.zip`, falling back to `<dir>/<stem>.csv`.
///
/// # Errors
///
/// Returns [`PipelineError::MissingData`] naming the `.zip` path when
/// neither exists.
pub fn find_table(dir: &Path, stem: &str) -> Result<PathBuf> {
    let zipped = dir.join(format!("{stem}.zip"));
    if zipped.is_file() {
        return Ok(zipped);
    }
    let plain = dir.join(format!("{stem}.csv"));
    if plain.is_file() {
        return Ok(plain);
    }
    Err(PipelineError::MissingData(zipped))
}

/// Stream every record of `path` through `f`, returning the record count.
///
/// A `.zip` path is read from the archive's first entry.
///
/// # Errors
///
/// Returns [`PipelineError::MissingData`] if `path` does not exist, a CSV or
/// archive error naming `path`, or the first error `f` returns.
pub fn for_each_record<T, F>(path: &Path, mut f: F) -> Result<usize>
where
    T: DeserializeOwned,
    F: FnMut(T) -> Result<()>,
{
    if !path.is_file() {
        return Err(PipelineError::MissingData(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| PipelineError::read(path, e))?;

    let count = if is_zip(path) {
        let mut archive = zip::ZipArchive::new(file).map_err(|source| PipelineError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        let entry = archive.by_index(0).map_err(|source| PipelineError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        stream(entry, path, &mut f)?
    } else {
        stream(file, path, &mut f)?
    };

    debug!(path = %path.display(), records = count, "read table");
    Ok(count)
}

/// Read every record of `path` into memory.
///
/// # Errors
///
/// See [`for_each_record`].
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for_each_record(path, |record| {
        records.push(record);
        Ok(())
    })?;
    Ok(records)
}

fn stream<T, F>(source: impl Read, path: &Path, f: &mut F) -> Result<usize>
where
    T: DeserializeOwned,
    F: FnMut(T) -> Result<()>,
{
    let mut reader = csv::ReaderBuilder::new().flexible(false).from_reader(source);
    let mut count = 0;
    for record in reader.deserialize() {
        f(record.map_err(|e| PipelineError::csv_read(path, e))?)?;
        count += 1;
    }
    Ok(count)
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}
