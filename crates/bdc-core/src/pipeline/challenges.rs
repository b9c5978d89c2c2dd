//! Consolidated, deduplicated, geolocated challenge table.

use std::collections::HashMap;

use tracing::info;

use super::{CHALLENGE_FILE, GEOLOCATION_FILE, Stage, StageReport};
use crate::checkpoint::{UnitOfWork, staging_path};
use crate::config::PathsConfig;
use crate::error::Result;
use crate::manifest::{CollectionManifest, SnapshotManifest, snapshot_dir};
use crate::record::{BslLocation, ChallengeRecord};
use crate::resolve::{code_outcomes, dedup_challenges, geolocate_challenges};
use crate::store::{RecordWriter, find_table, for_each_record};

pub(super) fn run(paths: &PathsConfig) -> Result<StageReport> {
    let raw = &paths.raw_challenge;
    let output = paths.challenge.join(CHALLENGE_FILE);
    let mut report = StageReport::new(Stage::Challenges);

    let unit = UnitOfWork::new("challenges").output(&output);
    report.record(unit.run(|| {
        let collection = CollectionManifest::load(raw)?;
        let mut filed: Vec<ChallengeRecord> = Vec::new();
        for snapshot in collection.snapshots()? {
            let manifest = SnapshotManifest::load(raw, snapshot)?;
            for state in manifest.sorted_states() {
                let path = find_table(&snapshot_dir(raw, snapshot), &state)?;
                for_each_record(&path, |challenge: ChallengeRecord| {
                    filed.push(challenge);
                    Ok(())
                })?;
            }
        }

        let filed_count = filed.len();
        let mut challenges = dedup_challenges(filed);
        code_outcomes(&mut challenges)?;

        let mut locations: HashMap<String, BslLocation> = HashMap::new();
        for_each_record(&paths.availability.join(GEOLOCATION_FILE), |location: BslLocation| {
            locations.insert(location.location_id.clone(), location);
            Ok(())
        })?;
        let matched = geolocate_challenges(&mut challenges, &locations)?;
        info!(
            filed = filed_count,
            unique = challenges.len(),
            geolocated = matched,
            "resolved challenges"
        );

        let mut writer = RecordWriter::create(&staging_path(&output))?;
        for challenge in &challenges {
            writer.write(challenge)?;
        }
        Ok(writer.finish()? as u64)
    })?);

    Ok(report)
}
