//! Summary tables: availability and challenges, per geography and per location.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{CBSL_FILE, CHALLENGE_FILE, Stage, StageReport};
use crate::aggregate::{DimensionSpec, GroupKey, Measure, SummarySchema, SummaryTable, aggregate};
use crate::checkpoint::{UnitOfWork, staging_path};
use crate::codes::{CATEGORY_CODES, OUTCOME_CODES, STATUS_CODES, TECHNOLOGY_CODES};
use crate::config::PathsConfig;
use crate::error::{PipelineError, Result};
use crate::geo::GeoLevel;
use crate::manifest::{CollectionManifest, SnapshotManifest, snapshot_dir};
use crate::record::{AvailabilityRecord, ChallengeRecord};
use crate::store::read_records;

/// Key column of geography summaries.
pub(super) const GEOID: &str = "geoid";
/// Key column of per-location summaries.
pub(super) const LOCATION_ID: &str = "location_id";

/// Summary granularity, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Level {
    Nation,
    Geo(GeoLevel),
}

impl Level {
    pub(super) const GEOGRAPHIES: [Self; 6] = [
        Self::Nation,
        Self::Geo(GeoLevel::State),
        Self::Geo(GeoLevel::County),
        Self::Geo(GeoLevel::Tract),
        Self::Geo(GeoLevel::BlockGroup),
        Self::Geo(GeoLevel::Block),
    ];

    pub(super) const fn name(self) -> &'static str {
        match self {
            Self::Nation => "nation",
            Self::Geo(level) => level.name(),
        }
    }

    fn group_key(self) -> GroupKey {
        match self {
            Self::Nation => GroupKey::constant(""),
            Self::Geo(level) => GroupKey::column(level.column()),
        }
    }
}

/// `<dir>/<name>_summary.csv`.
pub(super) fn summary_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}_summary.csv"))
}

/// Availability summary layout: tier `s` and technology `t`, alone and
/// crossed. With `count_locations`, each cell also counts locations by their
/// best tier.
///
/// # Errors
///
/// Only fails if the declared layout is inconsistent.
pub fn availability_schema(key_column: &str, count_locations: bool) -> Result<SummarySchema> {
    let mut builder = SummarySchema::builder(key_column)
        .dimension(DimensionSpec::new("status", "s", &STATUS_CODES))
        .dimension(DimensionSpec::new("technology", "t", &TECHNOLOGY_CODES))
        .measure(Measure::rows("records"));
    if count_locations {
        builder = builder.measure(Measure::best_per_entity("bsls", 0));
    }
    builder
        .combine(&["status"])
        .combine(&["technology"])
        .combine(&["technology", "status"])
        .build()
}

/// Challenge summary layout: outcome `o`, technology `t` and category `c`,
/// alone, pairwise and all three. With `count_locations`, each cell also
/// counts distinct locations.
///
/// # Errors
///
/// Only fails if the declared layout is inconsistent.
pub fn challenge_schema(key_column: &str, count_locations: bool) -> Result<SummarySchema> {
    let mut builder = SummarySchema::builder(key_column)
        .dimension(DimensionSpec::new("outcome_code", "o", &OUTCOME_CODES))
        .dimension(DimensionSpec::new("technology", "t", &TECHNOLOGY_CODES))
        .dimension(DimensionSpec::new("category_code", "c", &CATEGORY_CODES))
        .measure(Measure::rows("challenges"));
    if count_locations {
        builder = builder.measure(Measure::distinct("bsls"));
    }
    builder
        .combine(&["outcome_code"])
        .combine(&["technology"])
        .combine(&["category_code"])
        .combine(&["outcome_code", "technology"])
        .combine(&["outcome_code", "category_code"])
        .combine(&["technology", "category_code"])
        .combine(&["outcome_code", "technology", "category_code"])
        .build()
}

/// Per snapshot: state through block summaries built state by state, plus
/// the nation row summed from the state rows.
pub(super) fn availability_per_geo(paths: &PathsConfig) -> Result<StageReport> {
    let root = &paths.availability;
    let mut report = StageReport::new(Stage::SummarizeAvailability);

    let collection = CollectionManifest::load(root)?;
    for snapshot in collection.snapshots()? {
        let dir = snapshot_dir(root, snapshot);
        let unit = Level::GEOGRAPHIES.iter().fold(
            UnitOfWork::new(format!("summarize-availability {snapshot}")),
            |unit, level| unit.output(summary_path(&dir, level.name())),
        );
        report.record(unit.run(|| {
            let states = SnapshotManifest::load(root, snapshot)?.sorted_states();
            let scratch = unit.scratch_dir();
            fs::create_dir_all(&scratch).map_err(|e| PipelineError::write(&scratch, e))?;

            let mut schema = availability_schema(GEOID, true)?;
            for (index, state) in states.iter().enumerate() {
                let records: Vec<AvailabilityRecord> =
                    read_records(&dir.join(format!("{state}.csv")))?;
                for level in GeoLevel::ALL {
                    let part = aggregate(&mut schema, &GroupKey::column(level.column()), &records);
                    part.write_csv(&part_path(&scratch, level.name(), index))?;
                }
                debug!(state = %state, records = records.len(), "summarized state");
            }

            let mut nation = SummaryTable::new(GEOID, schema.columns().to_vec());
            let mut rows = 0;
            for level in GeoLevel::ALL {
                let target = staging_path(&summary_path(&dir, level.name()));
                SummaryTable::new(GEOID, schema.columns().to_vec()).write_csv(&target)?;
                for index in 0..states.len() {
                    let part = SummaryTable::read_csv(&part_path(&scratch, level.name(), index), GEOID)?
                        .conform_to(schema.columns())?;
                    part.append_csv(&target)?;
                    rows += part.len() as u64;
                    if level == GeoLevel::State {
                        nation.absorb(&part.column_sums(""))?;
                    }
                }
            }
            nation.write_csv(&staging_path(&summary_path(&dir, Level::Nation.name())))?;
            Ok(rows + nation.len() as u64)
        })?);
    }

    info!(
        completed = report.completed,
        skipped = report.skipped,
        rows = report.rows,
        "summarized availability per geography"
    );
    Ok(report)
}

fn part_path(scratch: &Path, level: &str, index: usize) -> PathBuf {
    scratch.join(format!("{level}-{index:05}.csv"))
}

/// Per snapshot: one row per challenged location, counting its records.
pub(super) fn availability_per_cbsl(paths: &PathsConfig) -> Result<StageReport> {
    let root = &paths.availability;
    let mut report = StageReport::new(Stage::SummarizeCbsl);

    let collection = CollectionManifest::load(root)?;
    for snapshot in collection.snapshots()? {
        let dir = snapshot_dir(root, snapshot);
        let output = summary_path(&dir, "cbsl");
        let unit = UnitOfWork::new(format!("summarize-cbsl {snapshot}")).output(&output);
        report.record(unit.run(|| {
            let records: Vec<AvailabilityRecord> = read_records(&dir.join(CBSL_FILE))?;
            let mut schema = availability_schema(LOCATION_ID, false)?;
            let table = aggregate(&mut schema, &GroupKey::column(LOCATION_ID), &records);
            table.write_csv(&staging_path(&output))?;
            Ok(table.len() as u64)
        })?);
    }

    info!(
        completed = report.completed,
        skipped = report.skipped,
        rows = report.rows,
        "summarized challenged locations"
    );
    Ok(report)
}

/// Nation through block challenge summaries.
pub(super) fn challenges_per_geo(paths: &PathsConfig) -> Result<StageReport> {
    let dir = &paths.challenge;
    let mut report = StageReport::new(Stage::SummarizeChallenges);

    let unit = Level::GEOGRAPHIES.iter().fold(
        UnitOfWork::new("summarize-challenges"),
        |unit, level| unit.output(summary_path(dir, level.name())),
    );
    report.record(unit.run(|| {
        let challenges: Vec<ChallengeRecord> = read_records(&dir.join(CHALLENGE_FILE))?;
        let mut schema = challenge_schema(GEOID, true)?;
        let tables: Vec<(Level, SummaryTable)> = Level::GEOGRAPHIES
            .iter()
            .map(|level| (*level, aggregate(&mut schema, &level.group_key(), &challenges)))
            .collect();

        let mut rows = 0;
        for (level, table) in tables {
            let table = table.conform_to(schema.columns())?;
            table.write_csv(&staging_path(&summary_path(dir, level.name())))?;
            rows += table.len() as u64;
        }
        Ok(rows)
    })?);

    info!(rows = report.rows, skipped = report.skipped, "summarized challenges per geography");
    Ok(report)
}

/// One row per challenged location.
pub(super) fn challenges_per_bsl(paths: &PathsConfig) -> Result<StageReport> {
    let dir = &paths.challenge;
    let output = summary_path(dir, "bsl");
    let mut report = StageReport::new(Stage::SummarizeChallengeBsls);

    let unit = UnitOfWork::new("summarize-challenge-bsls").output(&output);
    report.record(unit.run(|| {
        let challenges: Vec<ChallengeRecord> = read_records(&dir.join(CHALLENGE_FILE))?;
        let mut schema = challenge_schema(LOCATION_ID, false)?;
        let table = aggregate(&mut schema, &GroupKey::column(LOCATION_ID), &challenges);
        table.write_csv(&staging_path(&output))?;
        Ok(table.len() as u64)
    })?);

    info!(rows = report.rows, skipped = report.skipped, "summarized challenges per location");
    Ok(report)
}
