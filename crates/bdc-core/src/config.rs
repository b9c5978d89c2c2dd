use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::resolve::CrossStateMoves;

/// Project config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "bdc.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub geolocation: GeolocationConfig,
    /// Preferred output mode (`pretty`, `text`, `json`).
    #[serde(default)]
    pub output: Option<String>,
}

/// Data directories. Relative paths are taken from the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_raw_availability")]
    pub raw_availability: PathBuf,
    #[serde(default = "default_availability")]
    pub availability: PathBuf,
    #[serde(default = "default_raw_challenge")]
    pub raw_challenge: PathBuf,
    #[serde(default = "default_challenge")]
    pub challenge: PathBuf,
    #[serde(default = "default_merged")]
    pub merged: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_availability: default_raw_availability(),
            availability: default_availability(),
            raw_challenge: default_raw_challenge(),
            challenge: default_challenge(),
            merged: default_merged(),
        }
    }
}

impl PathsConfig {
    /// Copy with every relative path joined onto `root`.
    #[must_use]
    pub fn under(&self, root: &Path) -> Self {
        let join = |path: &PathBuf| {
            if path.is_absolute() {
                path.clone()
            } else {
                root.join(path)
            }
        };
        Self {
            raw_availability: join(&self.raw_availability),
            availability: join(&self.availability),
            raw_challenge: join(&self.raw_challenge),
            challenge: join(&self.challenge),
            merged: join(&self.merged),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeolocationConfig {
    /// Fail instead of keeping the latest chain when a location changes
    /// state between snapshots.
    #[serde(default)]
    pub reject_cross_state_moves: bool,
}

impl GeolocationConfig {
    #[must_use]
    pub const fn cross_state_moves(&self) -> CrossStateMoves {
        if self.reject_cross_state_moves {
            CrossStateMoves::Reject
        } else {
            CrossStateMoves::Allow
        }
    }
}

/// Load the effective config.
///
/// An explicit path must exist. Otherwise `<root>/bdc.toml` is tried, then
/// `<config dir>/bdc/config.toml`, then defaults.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] for a malformed file and an I/O error if
/// an explicit path cannot be read.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<ProjectConfig> {
    if let Some(path) = explicit {
        return parse_file(path);
    }

    let project = root.join(CONFIG_FILE);
    if project.is_file() {
        return parse_file(&project);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user = config_dir.join("bdc/config.toml");
        if user.is_file() {
            return parse_file(&user);
        }
    }

    Ok(ProjectConfig::default())
}

fn parse_file(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PipelineError::read(path, e))?;
    toml::from_str(&content).map_err(|source| PipelineError::Config {
        path: path.to_path_buf(),
        source,
    })
}

fn default_raw_availability() -> PathBuf {
    PathBuf::from("data/raw/bdc/availability/fixed")
}

fn default_availability() -> PathBuf {
    PathBuf::from("data/processed/bdc/availability/fixed")
}

fn default_raw_challenge() -> PathBuf {
    PathBuf::from("data/raw/bdc/challenge/fixed_resolved")
}

fn default_challenge() -> PathBuf {
    PathBuf::from("data/processed/bdc/challenge/fixed_resolved")
}

fn default_merged() -> PathBuf {
    PathBuf::from("data/processed/bdc/challenge_availability/fixed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_mirror_data_layout() {
        let cfg = ProjectConfig::default();
        assert_eq!(
            cfg.paths.availability,
            Path::new("data/processed/bdc/availability/fixed")
        );
        assert_eq!(cfg.geolocation.cross_state_moves(), CrossStateMoves::Allow);
    }

    #[test]
    fn project_file_overrides_some_paths() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[paths]\nmerged = \"out/merged\"\n\n[geolocation]\nreject_cross_state_moves = true\n",
        )
        .expect("write config");

        let cfg = load_config(dir.path(), None).expect("parse");
        assert_eq!(cfg.paths.merged, Path::new("out/merged"));
        assert_eq!(cfg.paths.challenge, default_challenge());
        assert_eq!(cfg.geolocation.cross_state_moves(), CrossStateMoves::Reject);

        let resolved = cfg.paths.under(dir.path());
        assert_eq!(resolved.merged, dir.path().join("out/merged"));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[paths\n").expect("write config");
        let err = load_config(dir.path(), Some(&path)).expect_err("bad toml");
        assert!(matches!(err, PipelineError::Config { .. }));
        assert!(err.to_string().contains("custom.toml"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        assert!(load_config(dir.path(), Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn absolute_paths_are_kept() {
        let mut paths = PathsConfig::default();
        paths.merged = PathBuf::from("/srv/bdc/merged");
        assert_eq!(
            paths.under(Path::new("/work")).merged,
            Path::new("/srv/bdc/merged")
        );
    }
}
