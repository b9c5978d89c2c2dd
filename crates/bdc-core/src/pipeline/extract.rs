//! Availability records of challenged locations, one table per snapshot.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, info};

use super::{CBSL_FILE, CHALLENGE_FILE, Stage, StageReport};
use crate::checkpoint::{UnitOfWork, staging_path};
use crate::config::PathsConfig;
use crate::error::Result;
use crate::manifest::{CollectionManifest, SnapshotManifest, snapshot_dir};
use crate::record::AvailabilityRecord;
use crate::store::{RecordWriter, for_each_record};

#[derive(Deserialize)]
struct ChallengedLocation {
    location_id: String,
}

pub(super) fn run(paths: &PathsConfig) -> Result<StageReport> {
    let root = &paths.availability;
    let mut report = StageReport::new(Stage::ExtractCbsl);

    let mut challenged: HashSet<String> = HashSet::new();
    for_each_record(
        &paths.challenge.join(CHALLENGE_FILE),
        |row: ChallengedLocation| {
            challenged.insert(row.location_id);
            Ok(())
        },
    )?;
    debug!(locations = challenged.len(), "challenged locations");

    let collection = CollectionManifest::load(root)?;
    for snapshot in collection.snapshots()? {
        let dir = snapshot_dir(root, snapshot);
        let output = dir.join(CBSL_FILE);
        let unit = UnitOfWork::new(format!("extract-cbsl {snapshot}")).output(&output);
        report.record(unit.run(|| {
            let manifest = SnapshotManifest::load(root, snapshot)?;
            let mut writer = RecordWriter::create(&staging_path(&output))?;
            for state in manifest.sorted_states() {
                for_each_record(
                    &dir.join(format!("{state}.csv")),
                    |record: AvailabilityRecord| {
                        if challenged.contains(&record.location_id) {
                            writer.write(&record)?;
                        }
                        Ok(())
                    },
                )?;
            }
            Ok(writer.finish()? as u64)
        })?);
    }

    info!(
        completed = report.completed,
        skipped = report.skipped,
        rows = report.rows,
        "extracted challenged locations"
    );
    Ok(report)
}
