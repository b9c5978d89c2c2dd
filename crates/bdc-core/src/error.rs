use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result alias used across the pipeline.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Machine-readable error codes for operators and wrapper scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingMetadata,
    InvalidMetadata,
    InvalidSnapshot,
    ConfigParseError,
    MissingData,
    ConsistencyViolation,
    InconsistentChain,
    UnknownOutcome,
    UnknownState,
    SchemaMismatch,
    TableReadFailed,
    OutputWriteFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingMetadata => "E1001",
            Self::InvalidMetadata => "E1002",
            Self::InvalidSnapshot => "E1003",
            Self::ConfigParseError => "E1004",
            Self::MissingData => "E2001",
            Self::TableReadFailed => "E2002",
            Self::ConsistencyViolation => "E3001",
            Self::InconsistentChain => "E3002",
            Self::UnknownOutcome => "E3003",
            Self::UnknownState => "E3004",
            Self::SchemaMismatch => "E4001",
            Self::OutputWriteFailed => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingMetadata => "Manifest file missing",
            Self::InvalidMetadata => "Manifest file malformed",
            Self::InvalidSnapshot => "Snapshot date malformed",
            Self::ConfigParseError => "Config file parse error",
            Self::MissingData => "Record table missing",
            Self::TableReadFailed => "Record table unreadable",
            Self::ConsistencyViolation => "Location resolves to conflicting geolocations",
            Self::InconsistentChain => "Geoid chain is not prefix-consistent",
            Self::UnknownOutcome => "Unrecognized challenge outcome",
            Self::UnknownState => "Unrecognized state identifier",
            Self::SchemaMismatch => "Summary table schema mismatch",
            Self::OutputWriteFailed => "Output write failed",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::MissingMetadata | Self::MissingData => {
                Some("Re-run the download step for the affected snapshot.")
            }
            Self::InvalidMetadata => Some("Regenerate metadata.json for the affected snapshot."),
            Self::InvalidSnapshot => Some("Snapshot names must be ISO dates (YYYY-MM-DD)."),
            Self::ConfigParseError => Some("Fix syntax in bdc.toml and retry."),
            Self::ConsistencyViolation | Self::InconsistentChain => {
                Some("Upstream data is corrupt; re-download the snapshot before retrying.")
            }
            Self::UnknownOutcome | Self::UnknownState => {
                Some("Extend the code tables if the upstream vocabulary changed.")
            }
            Self::SchemaMismatch => Some("Delete the stale summary files and re-run the stage."),
            Self::TableReadFailed => None,
            Self::OutputWriteFailed => Some("Check disk space and write permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Every failure the pipeline can report. All are terminal for the unit of
/// work in which they occur.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("manifest not found: {}", .0.display())]
    MissingMetadata(PathBuf),

    #[error("malformed manifest {}: {source}", path.display())]
    InvalidMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot '{0}' is not an ISO date")]
    InvalidSnapshot(String),

    #[error("malformed config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("record table not found: {}", .0.display())]
    MissingData(PathBuf),

    #[error(
        "location {location_id} has {chains} distinct geolocations in snapshot {snapshot}, state {state}"
    )]
    ConsistencyViolation {
        location_id: String,
        snapshot: String,
        state: String,
        chains: usize,
    },

    #[error("location {location_id}: {detail}")]
    InconsistentChain { location_id: String, detail: String },

    #[error("challenge {challenge_id} has unrecognized outcome '{outcome}'")]
    UnknownOutcome {
        challenge_id: String,
        outcome: String,
    },

    #[error("unrecognized state identifier '{0}'")]
    UnknownState(String),

    #[error("schema mismatch in {}: {detail}", path.display())]
    SchemaMismatch { path: PathBuf, detail: String },

    #[error("invalid summary schema: {0}")]
    InvalidSchema(String),

    #[error("read table {}: {source}", path.display())]
    CsvRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("write table {}: {source}", path.display())]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("open archive {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingMetadata(_) => ErrorCode::MissingMetadata,
            Self::InvalidMetadata { .. } => ErrorCode::InvalidMetadata,
            Self::InvalidSnapshot(_) => ErrorCode::InvalidSnapshot,
            Self::Config { .. } => ErrorCode::ConfigParseError,
            Self::MissingData(_) => ErrorCode::MissingData,
            Self::ConsistencyViolation { .. } => ErrorCode::ConsistencyViolation,
            Self::InconsistentChain { .. } => ErrorCode::InconsistentChain,
            Self::UnknownOutcome { .. } => ErrorCode::UnknownOutcome,
            Self::UnknownState(_) => ErrorCode::UnknownState,
            Self::SchemaMismatch { .. } | Self::InvalidSchema(_) => ErrorCode::SchemaMismatch,
            Self::CsvRead { .. } | Self::Zip { .. } | Self::Read { .. } => {
                ErrorCode::TableReadFailed
            }
            Self::CsvWrite { .. } | Self::Write { .. } => ErrorCode::OutputWriteFailed,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv_read(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::CsvRead {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv_write(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::CsvWrite {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, PipelineError};
    use std::collections::HashSet;
    use std::io;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::MissingMetadata,
            ErrorCode::InvalidMetadata,
            ErrorCode::InvalidSnapshot,
            ErrorCode::ConfigParseError,
            ErrorCode::MissingData,
            ErrorCode::TableReadFailed,
            ErrorCode::ConsistencyViolation,
            ErrorCode::InconsistentChain,
            ErrorCode::UnknownOutcome,
            ErrorCode::UnknownState,
            ErrorCode::SchemaMismatch,
            ErrorCode::OutputWriteFailed,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn consistency_violation_names_the_location() {
        let err = PipelineError::ConsistencyViolation {
            location_id: "1010".into(),
            snapshot: "2023-06-30".into(),
            state: "10".into(),
            chains: 2,
        };
        let text = err.to_string();
        assert!(text.contains("1010"));
        assert!(text.contains("2023-06-30"));
        assert_eq!(err.code(), ErrorCode::ConsistencyViolation);
        assert!(err.hint().is_some());
    }

    #[test]
    fn missing_metadata_names_the_file() {
        let err = PipelineError::MissingMetadata("data/2023-06-30/metadata.json".into());
        assert!(err.to_string().contains("data/2023-06-30/metadata.json"));
        assert_eq!(err.code().code(), "E1001");
    }

    #[test]
    fn read_and_write_failures_have_distinct_codes() {
        let denied = || io::Error::from(io::ErrorKind::PermissionDenied);

        let open = PipelineError::read("raw/10.csv", denied());
        assert_eq!(open.code(), ErrorCode::TableReadFailed);
        assert!(open.to_string().starts_with("read raw/10.csv"));

        let create = PipelineError::write("out/10.csv", denied());
        assert_eq!(create.code(), ErrorCode::OutputWriteFailed);
        assert!(create.hint().is_some());

        let parse = PipelineError::csv_read("raw/10.csv", csv::Error::from(denied()));
        assert_eq!(parse.code(), ErrorCode::TableReadFailed);

        let serialize = PipelineError::csv_write("out/10.csv", csv::Error::from(denied()));
        assert_eq!(serialize.code(), ErrorCode::OutputWriteFailed);
        assert!(serialize.to_string().starts_with("write table out/10.csv"));
    }
}
