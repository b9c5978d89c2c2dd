//! Pipeline stage commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bdc_core::config::{ProjectConfig, load_config};
use bdc_core::{Pipeline, Stage, StageReport};
use tracing::{debug, info};

/// A project root with its effective config.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
}

impl Project {
    /// Resolve the project root (`--root`, else the current directory) and
    /// load its config.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory is unavailable or the
    /// config cannot be loaded.
    pub fn open(root: Option<&Path>, config: Option<&Path>) -> Result<Self> {
        let root = match root {
            Some(root) => root.to_path_buf(),
            None => std::env::current_dir().context("cannot determine current directory")?,
        };
        let config = load_config(&root, config)?;
        debug!(root = %root.display(), ?config, "project opened");
        Ok(Self { root, config })
    }

    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(&self.config, &self.root)
    }
}

/// Run `stages` in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the failing stage's error with the stage named as context.
pub fn run_stages(pipeline: &Pipeline, stages: &[Stage]) -> Result<Vec<StageReport>> {
    let mut reports = Vec::with_capacity(stages.len());
    for stage in stages {
        info!(%stage, "stage started");
        let report = pipeline
            .run(*stage)
            .with_context(|| format!("stage '{stage}' failed"))?;
        info!(
            %stage,
            completed = report.completed,
            skipped = report.skipped,
            rows = report.rows,
            "stage finished"
        );
        reports.push(report);
    }
    Ok(reports)
}
