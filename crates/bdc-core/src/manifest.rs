//! `metadata.json` manifests of a snapshot collection.
//!
//! ```text
//! <root>/metadata.json                      {"as_of_dates": [...]}
//! <root>/<as_of_date>/metadata.json         {"states": [...]}
//! <root>/<as_of_date>/<state>/metadata.json {"state_fips", "state_name", "files"}
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// File name of every manifest.
pub const MANIFEST_FILE: &str = "metadata.json";

/// A snapshot identifier: an ISO date, totally ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AsOfDate(NaiveDate);

impl FromStr for AsOfDate {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| PipelineError::InvalidSnapshot(s.to_string()))
    }
}

impl fmt::Display for AsOfDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Root manifest listing the published snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionManifest {
    pub as_of_dates: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CollectionManifest {
    /// # Errors
    ///
    /// See [`read_manifest`].
    pub fn load(root: &Path) -> Result<Self> {
        read_manifest(root)
    }

    /// Snapshots in ascending order, duplicates removed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSnapshot`] if an entry is not an ISO
    /// date.
    pub fn snapshots(&self) -> Result<Vec<AsOfDate>> {
        let mut dates = self
            .as_of_dates
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<AsOfDate>>>()?;
        dates.sort_unstable();
        dates.dedup();
        Ok(dates)
    }
}

/// Per-snapshot manifest listing the published states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub states: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SnapshotManifest {
    /// # Errors
    ///
    /// See [`read_manifest`].
    pub fn load(root: &Path, snapshot: AsOfDate) -> Result<Self> {
        read_manifest(&snapshot_dir(root, snapshot))
    }

    /// States in ascending order, duplicates removed.
    #[must_use]
    pub fn sorted_states(&self) -> Vec<String> {
        let mut states = self.states.clone();
        states.sort_unstable();
        states.dedup();
        states
    }
}

/// One published technology file of a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub file_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-state manifest of the raw availability tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateManifest {
    #[serde(default)]
    pub state_fips: String,
    #[serde(default)]
    pub state_name: String,
    pub files: Vec<FileEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StateManifest {
    /// # Errors
    ///
    /// See [`read_manifest`].
    pub fn load(root: &Path, snapshot: AsOfDate, state: &str) -> Result<Self> {
        read_manifest(&snapshot_dir(root, snapshot).join(state))
    }
}

/// `<root>/<snapshot>`.
#[must_use]
pub fn snapshot_dir(root: &Path, snapshot: AsOfDate) -> PathBuf {
    root.join(snapshot.to_string())
}

/// Read and parse `<dir>/metadata.json`.
///
/// # Errors
///
/// Returns [`PipelineError::MissingMetadata`] if the file does not exist and
/// [`PipelineError::InvalidMetadata`] if it does not parse.
pub fn read_manifest<T: DeserializeOwned>(dir: &Path) -> Result<T> {
    let path = dir.join(MANIFEST_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PipelineError::MissingMetadata(path));
        }
        Err(e) => return Err(PipelineError::read(path, e)),
    };
    serde_json::from_str(&text).map_err(|source| PipelineError::InvalidMetadata { path, source })
}

/// Copy `<from>/metadata.json` to `<to>/metadata.json`, creating `to`.
/// The file is copied as-is, so fields this crate does not model survive.
///
/// # Errors
///
/// Returns [`PipelineError::MissingMetadata`] if the source is absent, or an
/// I/O error.
pub fn copy_manifest(from: &Path, to: &Path) -> Result<()> {
    let source = from.join(MANIFEST_FILE);
    if !source.is_file() {
        return Err(PipelineError::MissingMetadata(source));
    }
    fs::create_dir_all(to).map_err(|e| PipelineError::write(to, e))?;
    let target = to.join(MANIFEST_FILE);
    fs::copy(&source, &target).map_err(|e| PipelineError::write(&target, e))?;
    debug!(from = %source.display(), to = %target.display(), "copied manifest");
    Ok(())
}

/// Map each state of a collection to the snapshots publishing it, both
/// sorted ascending.
///
/// # Errors
///
/// Fails if the root manifest or any snapshot manifest is missing or
/// malformed.
pub fn state_snapshots(root: &Path) -> Result<BTreeMap<String, Vec<AsOfDate>>> {
    let collection = CollectionManifest::load(root)?;
    let mut states: BTreeMap<String, Vec<AsOfDate>> = BTreeMap::new();
    for snapshot in collection.snapshots()? {
        let manifest = SnapshotManifest::load(root, snapshot)?;
        for state in manifest.sorted_states() {
            states.entry(state).or_default().push(snapshot);
        }
    }
    Ok(states)
}
