//! One classified, geolocated availability table per (snapshot, state).

use std::path::Path;

use tracing::{debug, info};

use super::{Stage, StageReport};
use crate::checkpoint::{UnitOfWork, staging_path};
use crate::classify::attach_tier;
use crate::config::PathsConfig;
use crate::error::Result;
use crate::manifest::{
    AsOfDate, CollectionManifest, SnapshotManifest, StateManifest, copy_manifest, snapshot_dir,
};
use crate::record::AvailabilityRecord;
use crate::store::{RecordWriter, find_table, for_each_record};

pub(super) fn run(paths: &PathsConfig) -> Result<StageReport> {
    let raw = &paths.raw_availability;
    let out = &paths.availability;
    let mut report = StageReport::new(Stage::Consolidate);

    let collection = CollectionManifest::load(raw)?;
    copy_manifest(raw, out)?;

    for snapshot in collection.snapshots()? {
        let manifest = SnapshotManifest::load(raw, snapshot)?;
        copy_manifest(&snapshot_dir(raw, snapshot), &snapshot_dir(out, snapshot))?;

        for state in manifest.sorted_states() {
            let output = snapshot_dir(out, snapshot).join(format!("{state}.csv"));
            let unit = UnitOfWork::new(format!("consolidate {snapshot} {state}")).output(&output);
            let outcome =
                unit.run(|| consolidate_state(raw, snapshot, &state, &staging_path(&output)))?;
            report.record(outcome);
        }
    }

    info!(
        completed = report.completed,
        skipped = report.skipped,
        rows = report.rows,
        "consolidated availability"
    );
    Ok(report)
}

/// Concatenate a state's technology files, deriving geoids and tiers.
fn consolidate_state(raw: &Path, snapshot: AsOfDate, state: &str, target: &Path) -> Result<u64> {
    let manifest = StateManifest::load(raw, snapshot, state)?;
    let state_dir = snapshot_dir(raw, snapshot).join(state);
    let mut writer = RecordWriter::create(target)?;

    for file in &manifest.files {
        let path = find_table(&state_dir, &file.file_name)?;
        let records = for_each_record(&path, |mut record: AvailabilityRecord| {
            record.derive_geoids();
            attach_tier(&mut record);
            writer.write(&record)
        })?;
        debug!(file = %file.file_name, records, "consolidated technology file");
    }

    Ok(writer.finish()? as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    use crate::codes::ServiceTier;
    use crate::store::read_records;

    const FIBER: &str = "frn,provider_id,brand_name,location_id,technology,\
max_advertised_download_speed,max_advertised_upload_speed,low_latency,\
business_residential_code,state_usps,block_geoid,h3_res8_id\n\
0001,130,Acme,1001,50,1000,1000,1,X,DE,100010401001000,88\n\
0001,130,Acme,1002,50,50,10,1,R,DE,100010401001001,88\n";

    const COPPER: &str = "frn,provider_id,brand_name,location_id,technology,\
max_advertised_download_speed,max_advertised_upload_speed,low_latency,\
business_residential_code,state_usps,block_geoid,h3_res8_id\n\
0002,140,Bell,1001,10,10,1,0,X,DE,100010401001000,88\n";

    fn seed(root: &Path) {
        let state_dir = root.join("2023-06-30").join("10");
        fs::create_dir_all(&state_dir).expect("mkdir");
        fs::write(root.join("metadata.json"), r#"{"as_of_dates": ["2023-06-30"]}"#)
            .expect("root manifest");
        fs::write(root.join("2023-06-30/metadata.json"), r#"{"states": ["10"]}"#)
            .expect("snapshot manifest");
        fs::write(
            state_dir.join("metadata.json"),
            r#"{"state_fips": "10", "state_name": "Delaware",
                "files": [{"file_name": "fiber"}, {"file_name": "copper"}]}"#,
        )
        .expect("state manifest");
        fs::write(state_dir.join("fiber.csv"), FIBER).expect("fiber");
        fs::write(state_dir.join("copper.csv"), COPPER).expect("copper");
    }

    fn paths(dir: &Path) -> PathsConfig {
        PathsConfig::default().under(dir)
    }

    #[test]
    fn classifies_and_geolocates_each_record() {
        let dir = TempDir::new().expect("tempdir");
        let paths = paths(dir.path());
        seed(&paths.raw_availability);

        let report = run(&paths).expect("consolidate");
        assert_eq!(report.completed, 1);
        assert_eq!(report.rows, 3);

        let out = paths.availability.join("2023-06-30/10.csv");
        let records: Vec<AvailabilityRecord> = read_records(&out).expect("read back");
        assert_eq!(records[0].county_geoid, "10001");
        assert_eq!(records[0].block_group_geoid, "100010401001");
        assert_eq!(records[0].frn, "0001");
        let tiers: Vec<_> = records.iter().map(|r| r.status).collect();
        assert_eq!(
            tiers,
            [
                Some(ServiceTier::Served),
                Some(ServiceTier::Underserved),
                Some(ServiceTier::Unserved)
            ]
        );
        assert!(paths.availability.join("metadata.json").is_file());
        assert!(paths.availability.join("2023-06-30/metadata.json").is_file());
    }

    #[test]
    fn second_run_skips() {
        let dir = TempDir::new().expect("tempdir");
        let paths = paths(dir.path());
        seed(&paths.raw_availability);
        run(&paths).expect("first");
        let report = run(&paths).expect("second");
        assert_eq!(report.completed, 0);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn missing_technology_file_fails_the_state() {
        let dir = TempDir::new().expect("tempdir");
        let paths = paths(dir.path());
        seed(&paths.raw_availability);
        fs::remove_file(paths.raw_availability.join("2023-06-30/10/copper.csv")).expect("rm");

        assert!(run(&paths).is_err());
        assert!(!paths.availability.join("2023-06-30/10.csv").exists());
    }
}
