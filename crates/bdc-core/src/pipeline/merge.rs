//! Challenge and availability summaries joined per snapshot and level.

use tracing::info;

use super::summarize::{GEOID, LOCATION_ID, Level, summary_path};
use super::{Stage, StageReport};
use crate::aggregate::SummaryTable;
use crate::checkpoint::{UnitOfWork, staging_path};
use crate::config::PathsConfig;
use crate::error::Result;
use crate::manifest::{CollectionManifest, copy_manifest, snapshot_dir};
use crate::merge::merge;

/// Prefix of challenge-derived columns.
pub const CHALLENGE_PREFIX: &str = "c_";
/// Prefix of availability-derived columns.
pub const AVAILABILITY_PREFIX: &str = "a_";

/// A merged level: its name, key column, and the availability summary it
/// pairs with.
struct MergeLevel {
    name: &'static str,
    key: &'static str,
    availability: &'static str,
}

fn levels() -> Vec<MergeLevel> {
    let mut levels: Vec<MergeLevel> = Level::GEOGRAPHIES
        .iter()
        .map(|level| MergeLevel {
            name: level.name(),
            key: GEOID,
            availability: level.name(),
        })
        .collect();
    levels.push(MergeLevel {
        name: "bsl",
        key: LOCATION_ID,
        availability: "cbsl",
    });
    levels
}

pub(super) fn run(paths: &PathsConfig) -> Result<StageReport> {
    let availability = &paths.availability;
    let merged = &paths.merged;
    let mut report = StageReport::new(Stage::Merge);

    let collection = CollectionManifest::load(availability)?;
    copy_manifest(availability, merged)?;
    let snapshots = collection.snapshots()?;

    for level in levels() {
        let demand = summary_path(&paths.challenge, level.name);
        for snapshot in &snapshots {
            let output = summary_path(&snapshot_dir(merged, *snapshot), level.name);
            let unit = UnitOfWork::new(format!("merge {snapshot} {}", level.name)).output(&output);
            report.record(unit.run(|| {
                let challenges = SummaryTable::read_csv(&demand, level.key)?;
                let source =
                    summary_path(&snapshot_dir(availability, *snapshot), level.availability);
                let supply = SummaryTable::read_csv(&source, level.key)?;
                let table = merge(&challenges, CHALLENGE_PREFIX, &supply, AVAILABILITY_PREFIX)?;
                table.write_csv(&staging_path(&output))?;
                Ok(table.len() as u64)
            })?);
        }
    }

    info!(
        completed = report.completed,
        skipped = report.skipped,
        rows = report.rows,
        "merged summaries"
    );
    Ok(report)
}
