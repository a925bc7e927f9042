//! Per-run decision marker
//!
//! The first invocation of a guarded step writes `true` (skip) or `false`
//! (run) to a file keyed by project and job id. Later invocations in the
//! same job read it back instead of searching the history again.

use crate::error::{TreeskipError, TreeskipResult};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// State recorded for the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMarker {
    /// No decision taken yet in this run
    Unset,
    /// The step may be skipped
    Skip,
    /// The step must run
    Run,
}

impl DecisionMarker {
    /// Parse marker file content; anything but `true` means run
    pub fn from_content(content: &str) -> Self {
        if content.trim() == "true" {
            Self::Skip
        } else {
            Self::Run
        }
    }

    /// File content for this marker
    pub fn as_content(&self) -> &'static str {
        match self {
            Self::Skip => "true",
            Self::Run | Self::Unset => "false",
        }
    }
}

impl fmt::Display for DecisionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Skip => write!(f, "skip"),
            Self::Run => write!(f, "run"),
        }
    }
}

/// File-backed marker for one run
#[derive(Debug, Clone)]
pub struct MarkerStore {
    path: PathBuf,
}

impl MarkerStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Marker location for a project/job pair inside `dir`
    pub fn for_run(dir: &Path, project_id: &str, job_id: &str) -> Self {
        Self::new(dir.join(format!("ci-skip-{}-{}", project_id, job_id)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the marker; a missing or unreadable file is `Unset`
    pub fn read(&self) -> DecisionMarker {
        if !self.path.exists() {
            debug!("No marker at {}", self.path.display());
            return DecisionMarker::Unset;
        }

        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let marker = DecisionMarker::from_content(&content);
                debug!("Marker {} holds {:?} ({})", self.path.display(), content, marker);
                marker
            }
            Err(e) => {
                warn!("Ignoring unreadable marker {}: {}", self.path.display(), e);
                DecisionMarker::Unset
            }
        }
    }

    /// Persist a terminal decision
    pub fn write(&self, marker: DecisionMarker) -> TreeskipResult<()> {
        debug!("Writing {} to marker {}", marker, self.path.display());
        fs::write(&self.path, marker.as_content()).map_err(|e| {
            TreeskipError::io(format!("writing marker {}", self.path.display()), e)
        })
    }
}
