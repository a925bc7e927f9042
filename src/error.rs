//! Error types for treeskip
//!
//! All modules use `TreeskipResult<T>` as their return type. Every variant
//! belongs to one [`ErrorKind`], which decides the process exit status.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for treeskip operations
pub type TreeskipResult<T> = Result<T, TreeskipError>;

/// Exit status when the step may be skipped
pub const EXIT_SKIP: u8 = 0;
/// Exit status when the step must run
pub const EXIT_RUN: u8 = 1;
/// Exit status for runtime failures
pub const EXIT_ERROR: u8 = 2;
/// Exit status for configuration failures
pub const EXIT_CONFIG_ERROR: u8 = 6;

/// Coarse classification of failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid settings, detected before any state is recorded
    Config,
    /// A watched path or revision could not be resolved
    NotComputable,
    /// The job history or the local history file could not be used
    LedgerUnreachable,
    /// The artifact of a matched run could not be restored
    ArtifactUnusable,
    /// Everything else (local I/O, serialization)
    Internal,
}

impl ErrorKind {
    /// Process exit status for this kind of failure
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config => EXIT_CONFIG_ERROR,
            _ => EXIT_ERROR,
        }
    }
}

/// All errors that can occur in treeskip
#[derive(Error, Debug)]
pub enum TreeskipError {
    // Configuration errors
    #[error("The watched path list is empty")]
    EmptyWatchSet,

    #[error("Missing setting: {name}")]
    MissingSetting { name: String },

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Fingerprint errors
    #[error("Cannot open git repository at {path}: {reason}")]
    RepositoryOpen { path: PathBuf, reason: String },

    #[error("Revision {revision} not found: {reason}")]
    RevisionNotFound { revision: String, reason: String },

    #[error("Path {path} not found at revision {revision}")]
    PathNotFound { revision: String, path: String },

    // Ledger errors
    #[error("Job history request failed: {context}")]
    Http {
        context: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("Unexpected job history response: {0}")]
    JobHistoryDecode(String),

    #[error("Corrupt history file {path} at line {line}: {reason}")]
    HistoryCorrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    // Artifact errors
    #[error("Artifacts of job {job_id} expired at {expired_at}")]
    ArtifactExpired { job_id: String, expired_at: String },

    #[error("Failed to download artifacts of job {job_id}: {reason}")]
    ArtifactDownload { job_id: String, reason: String },

    #[error("Failed to extract artifacts of job {job_id}: {reason}")]
    ArtifactExtract { job_id: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TreeskipError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an HTTP error with context
    pub fn http(context: impl Into<String>, source: ureq::Error) -> Self {
        Self::Http {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Create a missing setting error
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingSetting { name: name.into() }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyWatchSet
            | Self::MissingSetting { .. }
            | Self::InvalidSetting { .. }
            | Self::ConfigInvalid { .. }
            | Self::ConfigDirCreate { .. }
            | Self::TomlParse(_) => ErrorKind::Config,

            Self::RepositoryOpen { .. }
            | Self::RevisionNotFound { .. }
            | Self::PathNotFound { .. } => ErrorKind::NotComputable,

            Self::Http { .. } | Self::JobHistoryDecode(_) | Self::HistoryCorrupt { .. } => {
                ErrorKind::LedgerUnreachable
            }

            Self::ArtifactExpired { .. }
            | Self::ArtifactDownload { .. }
            | Self::ArtifactExtract { .. } => ErrorKind::ArtifactUnusable,

            Self::Io { .. } | Self::Json(_) | Self::TomlSerialize(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::EmptyWatchSet => {
                Some("Set SKIP_IF_TREE_OK_IN_PAST to the space-separated paths used by the job")
            }
            Self::MissingSetting { .. } => Some("Run inside a GitLab CI job or pass the flag explicitly"),
            Self::RevisionNotFound { .. } => Some("Use a deeper clone: set GIT_DEPTH to 0 or a larger value"),
            Self::HistoryCorrupt { .. } => Some("Delete the history file or clear the CI cache"),
            Self::ArtifactExpired { .. } => Some("Unset FAIL_IF_ARTIFACTS_EXPIRED to ignore expired artifacts"),
            _ => None,
        }
    }
}
