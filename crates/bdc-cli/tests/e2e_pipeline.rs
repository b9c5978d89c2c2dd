use assert_cmd::Command;
use predicates::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const AVAILABILITY_HEADER: &str = "frn,provider_id,brand_name,location_id,technology,\
max_advertised_download_speed,max_advertised_upload_speed,low_latency,\
business_residential_code,state_usps,block_geoid,h3_res8_id\n";

const CHALLENGE_HEADER: &str =
    "challenge_id,location_id,location_state,technology,category_code,outcome,adjudication_date\n";

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, text).expect("write");
}

fn state_files(raw: &Path, snapshot: &str, state: &str, files: &[(&str, &str)]) {
    let dir = raw.join(snapshot).join(state);
    let entries: Vec<String> = files
        .iter()
        .map(|(name, _)| format!("{{\"file_name\": \"{name}\"}}"))
        .collect();
    write(
        &dir.join("metadata.json"),
        &format!(
            "{{\"state_fips\": \"{state}\", \"state_name\": \"{state}\", \"files\": [{}]}}",
            entries.join(", ")
        ),
    );
    for (name, body) in files {
        write(&dir.join(format!("{name}.csv")), &format!("{AVAILABILITY_HEADER}{body}"));
    }
}

/// Two availability snapshots over Delaware and Maryland, one challenge
/// snapshot.
fn seed(root: &Path) {
    let raw = root.join("data/raw/bdc/availability/fixed");
    write(
        &raw.join("metadata.json"),
        r#"{"as_of_dates": ["2023-12-31", "2023-06-30"], "source": "fixture"}"#,
    );
    write(&raw.join("2023-06-30/metadata.json"), r#"{"states": ["10"]}"#);
    write(&raw.join("2023-12-31/metadata.json"), r#"{"states": ["24", "10"]}"#);

    state_files(
        &raw,
        "2023-06-30",
        "10",
        &[
            (
                "fiber",
                "0001,130,Acme,1001,50,1000,100,1,R,DE,100010401001000,88\n\
                 0001,130,Acme,1002,50,50,10,1,R,DE,100010401001001,88\n",
            ),
            ("copper", "0002,140,Bell,1001,10,10,1,0,X,DE,100010401001000,88\n"),
        ],
    );
    state_files(
        &raw,
        "2023-12-31",
        "10",
        &[(
            "fiber",
            "0001,130,Acme,1001,50,1000,100,1,R,DE,100010401001000,88\n\
             0001,130,Acme,1002,50,1000,100,1,R,DE,100010401002000,88\n",
        )],
    );
    state_files(
        &raw,
        "2023-12-31",
        "24",
        &[("cable", "0003,150,Cabl,2001,40,300,30,1,R,MD,240010001001000,88\n")],
    );

    let challenges = root.join("data/raw/bdc/challenge/fixed_resolved");
    write(&challenges.join("metadata.json"), r#"{"as_of_dates": ["2023-11-01"]}"#);
    write(
        &challenges.join("2023-11-01/metadata.json"),
        r#"{"states": ["MD", "DE"]}"#,
    );
    write(
        &challenges.join("2023-11-01/DE.csv"),
        &format!(
            "{CHALLENGE_HEADER}\
             C1,1001,DE,50,1,Challenge Upheld - Provider Conceded,2023-10-01\n\
             C2,1002,DE,50,2,Challenge Overturned,2023-10-02\n"
        ),
    );
    write(
        &challenges.join("2023-11-01/MD.csv"),
        &format!(
            "{CHALLENGE_HEADER}\
             C3,2001,MD,40,1,Challenge Withdrawn,2023-10-03\n\
             C4,9999,MD,40,3,Challenge Overturned,\n"
        ),
    );
}

fn bdc(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bdc"));
    cmd.current_dir(root)
        .env("XDG_CONFIG_HOME", root.join(".config"))
        .env("HOME", root)
        .env("BDC_LOG", "warn")
        .env_remove("FORMAT")
        .env_remove("DEBUG");
    cmd
}

/// Every file under `dir`, keyed by relative path.
fn snapshot_tree(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(base: &Path, dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).expect("read dir") {
            let path = entry.expect("entry").path();
            if path.is_dir() {
                walk(base, &path, files);
            } else {
                let relative = path.strip_prefix(base).expect("prefix").to_path_buf();
                files.insert(relative, fs::read(&path).expect("read"));
            }
        }
    }
    let mut files = BTreeMap::new();
    walk(dir, dir, &mut files);
    files
}

fn run_json(root: &Path) -> serde_json::Value {
    let output = bdc(root)
        .args(["--json", "run"])
        .output()
        .expect("run bdc");
    assert!(
        output.status.success(),
        "bdc run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json report")
}

#[test]
fn full_run_then_rerun_skips_everything() {
    let dir = TempDir::new().expect("tempdir");
    seed(dir.path());

    let first = run_json(dir.path());
    let reports = first.as_array().expect("array of reports");
    assert_eq!(reports.len(), 9);
    assert_eq!(reports[0]["stage"], "consolidate");
    assert_eq!(reports[8]["stage"], "merge");
    for report in reports {
        assert!(
            report["completed"].as_u64().expect("completed") > 0,
            "stage {} did nothing",
            report["stage"]
        );
        assert_eq!(report["skipped"], 0);
    }

    let processed = dir.path().join("data/processed");
    let before = snapshot_tree(&processed);
    assert!(!before.keys().any(|path| path.to_string_lossy().ends_with(".partial")));

    let second = run_json(dir.path());
    for report in second.as_array().expect("array of reports") {
        assert_eq!(report["completed"], 0, "stage {} recomputed", report["stage"]);
        assert!(report["skipped"].as_u64().expect("skipped") > 0);
    }
    assert_eq!(snapshot_tree(&processed), before);
}

#[test]
fn merged_tables_cover_both_sources() {
    let dir = TempDir::new().expect("tempdir");
    seed(dir.path());
    run_json(dir.path());

    let merged = dir.path().join("data/processed/bdc/challenge_availability/fixed");
    let manifest = fs::read_to_string(merged.join("metadata.json")).expect("manifest");
    assert!(manifest.contains("fixture"));

    let state = fs::read_to_string(merged.join("2023-12-31/state_summary.csv")).expect("state");
    let mut lines = state.lines();
    let header = lines.next().expect("header");
    assert!(header.starts_with("geoid,c_total_challenges,c_total_bsls,"));
    assert!(header.contains(",a_total_records,a_total_bsls,"));
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("10,2,2,"));
    assert!(rows[1].starts_with("24,2,2,"));

    let bsl = fs::read_to_string(merged.join("2023-06-30/bsl_summary.csv")).expect("bsl");
    let keys: Vec<&str> = bsl
        .lines()
        .skip(1)
        .filter_map(|line| line.split(',').next())
        .collect();
    assert_eq!(keys, ["1001", "1002", "2001", "9999"]);

    let geolocation = fs::read_to_string(
        dir.path()
            .join("data/processed/bdc/availability/fixed/bsl_geolocation.csv"),
    )
    .expect("geolocation");
    assert!(geolocation.contains("1002,10,10001,10001040100,100010401002,100010401002000,2023-12-31"));
}

#[test]
fn single_stage_prints_text_report() {
    let dir = TempDir::new().expect("tempdir");
    seed(dir.path());

    bdc(dir.path())
        .args(["--format", "text", "consolidate"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("stage  completed  skipped  rows\n"))
        .stdout(predicate::str::contains("consolidate  3  0  6"));
}

#[test]
fn missing_manifest_fails_with_code_and_hint() {
    let dir = TempDir::new().expect("tempdir");

    bdc(dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E1001]"))
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn json_errors_are_structured() {
    let dir = TempDir::new().expect("tempdir");

    let output = bdc(dir.path())
        .args(["--json", "geolocate"])
        .output()
        .expect("run bdc");
    assert!(!output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stderr).expect("json error");
    assert_eq!(value["error"]["error_code"], "E1001");
}

#[test]
fn root_flag_and_config_paths() {
    let project = TempDir::new().expect("tempdir");
    let elsewhere = TempDir::new().expect("tempdir");
    seed(project.path());
    write(
        &project.path().join("bdc.toml"),
        "[paths]\navailability = \"out/availability\"\n",
    );

    bdc(elsewhere.path())
        .args(["--root"])
        .arg(project.path())
        .args(["-q", "consolidate"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(project.path().join("out/availability/2023-06-30/10.csv").is_file());
}

#[test]
fn completions_name_the_binary() {
    let dir = TempDir::new().expect("tempdir");
    bdc(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bdc"));
}
