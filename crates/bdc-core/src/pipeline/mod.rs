//! Pipeline stages over the on-disk data tree.
//!
//! Every stage is a sequence of [`UnitOfWork`]s, so a stage can be re-run
//! after an interruption and only unfinished units are recomputed.
//!
//! [`UnitOfWork`]: crate::checkpoint::UnitOfWork

mod challenges;
mod consolidate;
mod extract;
mod geolocate;
mod merge;
mod summarize;

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::checkpoint::UnitOutcome;
use crate::config::{PathsConfig, ProjectConfig};
use crate::error::Result;
use crate::resolve::CrossStateMoves;

pub use merge::{AVAILABILITY_PREFIX, CHALLENGE_PREFIX};
pub use summarize::{availability_schema, challenge_schema};

/// Resolved geolocation of every location, under the availability tree.
pub const GEOLOCATION_FILE: &str = "bsl_geolocation.csv";
/// Consolidated challenges, under the challenge tree.
pub const CHALLENGE_FILE: &str = "challenge.csv";
/// Availability records of challenged locations, per snapshot.
pub const CBSL_FILE: &str = "cbsl.csv";

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Consolidate,
    Geolocate,
    Challenges,
    ExtractCbsl,
    SummarizeAvailability,
    SummarizeCbsl,
    SummarizeChallenges,
    SummarizeChallengeBsls,
    Merge,
}

impl Stage {
    pub const ALL: [Self; 9] = [
        Self::Consolidate,
        Self::Geolocate,
        Self::Challenges,
        Self::ExtractCbsl,
        Self::SummarizeAvailability,
        Self::SummarizeCbsl,
        Self::SummarizeChallenges,
        Self::SummarizeChallengeBsls,
        Self::Merge,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Consolidate => "consolidate",
            Self::Geolocate => "geolocate",
            Self::Challenges => "challenges",
            Self::ExtractCbsl => "extract-cbsl",
            Self::SummarizeAvailability => "summarize-availability",
            Self::SummarizeCbsl => "summarize-cbsl",
            Self::SummarizeChallenges => "summarize-challenges",
            Self::SummarizeChallengeBsls => "summarize-challenge-bsls",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What one stage did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    /// Units computed in this run.
    pub completed: usize,
    /// Units skipped because their outputs already existed.
    pub skipped: usize,
    /// Rows written by the completed units.
    pub rows: u64,
}

impl StageReport {
    #[must_use]
    pub const fn new(stage: Stage) -> Self {
        Self {
            stage,
            completed: 0,
            skipped: 0,
            rows: 0,
        }
    }

    /// Count a unit outcome whose value is the rows it wrote.
    pub fn record(&mut self, outcome: UnitOutcome<u64>) {
        match outcome {
            UnitOutcome::Skipped => self.skipped += 1,
            UnitOutcome::Completed(rows) => {
                self.completed += 1;
                self.rows += rows;
            }
        }
    }
}

/// The pipeline bound to a project's data directories.
#[derive(Debug, Clone)]
pub struct Pipeline {
    paths: PathsConfig,
    moves: CrossStateMoves,
}

impl Pipeline {
    /// Bind `config` to the project at `root`.
    #[must_use]
    pub fn new(config: &ProjectConfig, root: &Path) -> Self {
        Self {
            paths: config.paths.under(root),
            moves: config.geolocation.cross_state_moves(),
        }
    }

    #[must_use]
    pub const fn paths(&self) -> &PathsConfig {
        &self.paths
    }

    /// Run one stage.
    ///
    /// # Errors
    ///
    /// Returns the first error of any unit; finished units stay finished.
    pub fn run(&self, stage: Stage) -> Result<StageReport> {
        let paths = &self.paths;
        match stage {
            Stage::Consolidate => consolidate::run(paths),
            Stage::Geolocate => geolocate::run(paths, self.moves),
            Stage::Challenges => challenges::run(paths),
            Stage::ExtractCbsl => extract::run(paths),
            Stage::SummarizeAvailability => summarize::availability_per_geo(paths),
            Stage::SummarizeCbsl => summarize::availability_per_cbsl(paths),
            Stage::SummarizeChallenges => summarize::challenges_per_geo(paths),
            Stage::SummarizeChallengeBsls => summarize::challenges_per_bsl(paths),
            Stage::Merge => merge::run(paths),
        }
    }

    /// Run every stage in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing stage.
    pub fn run_all(&self) -> Result<Vec<StageReport>> {
        Stage::ALL.iter().map(|stage| self.run(*stage)).collect()
    }
}
