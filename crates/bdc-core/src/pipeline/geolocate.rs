//! Canonical geolocation of every location across all snapshots.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use super::{GEOLOCATION_FILE, Stage, StageReport};
use crate::checkpoint::{UnitOfWork, staging_path};
use crate::config::PathsConfig;
use crate::error::Result;
use crate::geo::GeoChain;
use crate::manifest::{AsOfDate, snapshot_dir, state_snapshots};
use crate::record::BslLocation;
use crate::resolve::{CrossStateMoves, collapse_batch, resolve_across_states, resolve_state};
use crate::store::{RecordWriter, for_each_record};

pub(super) fn run(paths: &PathsConfig, moves: CrossStateMoves) -> Result<StageReport> {
    let root = &paths.availability;
    let output = root.join(GEOLOCATION_FILE);
    let mut report = StageReport::new(Stage::Geolocate);

    let unit = UnitOfWork::new("geolocate").output(&output);
    report.record(unit.run(|| {
        let states = state_snapshots(root)?;
        let mut resolved_states = Vec::with_capacity(states.len());
        for (state, snapshots) in &states {
            let mut batches = Vec::with_capacity(snapshots.len());
            for snapshot in snapshots {
                batches.push(read_batch(root, *snapshot, state)?);
            }
            let resolved = resolve_state(batches);
            debug!(state = %state, locations = resolved.len(), "resolved state");
            resolved_states.push(resolved);
        }

        let resolved = resolve_across_states(resolved_states, moves)?;
        let mut writer = RecordWriter::create(&staging_path(&output))?;
        for location in &resolved {
            writer.write(location)?;
        }
        Ok(writer.finish()? as u64)
    })?);

    info!(rows = report.rows, skipped = report.skipped, "geolocated locations");
    Ok(report)
}

/// Distinct (location, chain) rows of one consolidated state table.
fn read_batch(root: &Path, snapshot: AsOfDate, state: &str) -> Result<Vec<BslLocation>> {
    let path = snapshot_dir(root, snapshot).join(format!("{state}.csv"));
    let mut seen: HashSet<(String, GeoChain)> = HashSet::new();
    let mut rows = Vec::new();
    for_each_record(&path, |location: BslLocation| {
        if seen.insert((location.location_id.clone(), location.chain())) {
            rows.push(location);
        }
        Ok(())
    })?;
    collapse_batch(rows, &snapshot.to_string(), state)
}
