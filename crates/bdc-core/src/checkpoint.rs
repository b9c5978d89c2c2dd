//! Idempotent units of work keyed by their output files.
//!
//! A unit is complete when every output exists. Bodies never write outputs
//! directly: they write staging files (`<output>.partial`) which are renamed
//! into place only after the body succeeds, so an interrupted run leaves
//! either finished outputs or staging debris, and debris is cleared before
//! the next attempt.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

/// Suffix of staging files.
pub const STAGING_SUFFIX: &str = "partial";

/// Progress of a unit as observed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Every output exists.
    Complete,
    /// Some outputs exist, left by a run that did not finish.
    Partial,
    /// No output exists.
    Pending,
}

/// Result of [`UnitOfWork::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome<T> {
    Skipped,
    Completed(T),
}

impl<T> UnitOutcome<T> {
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

/// Staging path of an output: `<output>.partial`.
#[must_use]
pub fn staging_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".");
    name.push(STAGING_SUFFIX);
    output.with_file_name(name)
}

/// A named computation whose checkpoint is the set of files it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOfWork {
    name: String,
    outputs: Vec<PathBuf>,
}

impl UnitOfWork {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outputs: Vec::new(),
        }
    }

    #[must_use]
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(path.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn outputs(&self) -> &[PathBuf] {
        &self.outputs
    }

    #[must_use]
    pub fn state(&self) -> UnitState {
        let present = self.outputs.iter().filter(|path| path.is_file()).count();
        if present == 0 {
            UnitState::Pending
        } else if present == self.outputs.len() {
            UnitState::Complete
        } else {
            UnitState::Partial
        }
    }

    /// Scratch directory for intermediate files, beside the first output.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        let parent = self
            .outputs
            .first()
            .and_then(|path| path.parent())
            .unwrap_or_else(|| Path::new("."));
        let slug: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        parent.join(format!(".{slug}.{STAGING_SUFFIX}"))
    }

    /// Run `body` unless the unit is complete.
    ///
    /// `body` must write each output to its [`staging_path`]. On success every
    /// staging file is renamed onto its output; on failure staging files and
    /// the scratch directory are removed and no output is touched.
    ///
    /// # Errors
    ///
    /// Returns the body's error, [`PipelineError::MissingData`] if the body
    /// did not produce a staging file, or an I/O error from cleanup or
    /// rename.
    pub fn run<T>(&self, body: impl FnOnce() -> Result<T>) -> Result<UnitOutcome<T>> {
        match self.state() {
            UnitState::Complete => {
                info!(unit = %self.name, "outputs exist; skipping");
                return Ok(UnitOutcome::Skipped);
            }
            UnitState::Partial => {
                for output in &self.outputs {
                    if remove_if_exists(output)? {
                        warn!(unit = %self.name, path = %output.display(), "removed output of unfinished run");
                    }
                }
            }
            UnitState::Pending => {}
        }
        self.clear_staging()?;
        for output in &self.outputs {
            if let Some(parent) = output.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(|e| PipelineError::write(parent, e))?;
            }
        }

        info!(unit = %self.name, "running");
        let value = match body().and_then(|value| self.promote().map(|()| value)) {
            Ok(value) => value,
            Err(e) => {
                if let Err(cleanup) = self.clear_staging() {
                    warn!(unit = %self.name, error = %cleanup, "staging cleanup failed");
                }
                return Err(e);
            }
        };
        self.remove_scratch()?;
        Ok(UnitOutcome::Completed(value))
    }

    fn promote(&self) -> Result<()> {
        for output in &self.outputs {
            let staged = staging_path(output);
            if !staged.is_file() {
                return Err(PipelineError::MissingData(staged));
            }
        }
        for output in &self.outputs {
            let staged = staging_path(output);
            fs::rename(&staged, output).map_err(|e| PipelineError::write(output, e))?;
            debug!(path = %output.display(), "wrote output");
        }
        Ok(())
    }

    fn clear_staging(&self) -> Result<()> {
        for output in &self.outputs {
            let staged = staging_path(output);
            if remove_if_exists(&staged)? {
                warn!(unit = %self.name, path = %staged.display(), "removed stale staging file");
            }
        }
        self.remove_scratch()
    }

    fn remove_scratch(&self) -> Result<()> {
        let scratch = self.scratch_dir();
        if scratch.is_dir() {
            fs::remove_dir_all(&scratch).map_err(|e| PipelineError::write(&scratch, e))?;
        }
        Ok(())
    }
}

/// Remove `path` if it exists, reporting whether it did.
fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PipelineError::write(path, e)),
    }
}
