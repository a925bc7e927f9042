//! History of fingerprints from previously successful runs
//!
//! Two strategies share the [`Ledger`] contract:
//!
//! | Strategy | Source | Compares | Bounded by |
//! |----------|--------|----------|------------|
//! | remote | GitLab job history, paginated | raw canonical string | job, page and same-ref budgets |
//! | local | `digest:job` lines in a cached file | SHA-1 digest | retention count |

pub mod local;
pub mod remote;

pub use local::{LedgerEntry, LocalLedger};
pub use remote::{JobHistory, RemoteLedger, SearchBudget};

use crate::error::TreeskipResult;
use crate::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Query the remote job history
    #[default]
    Remote,
    /// Read and prepend to a persisted history file
    Local,
}

impl Strategy {
    /// Whether a failed artifact download aborts the decision unless configured otherwise
    pub fn fails_on_restore_error_by_default(&self) -> bool {
        matches!(self, Self::Remote)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// What is known about the artifacts of a matched run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactAvailability {
    /// The ledger does not track artifacts; try to restore
    Unknown,
    /// The run kept no artifacts
    None,
    /// Artifacts are kept until the given time
    ExpiresAt(DateTime<Utc>),
}

/// A previous run with the same fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerHit {
    /// Identifier of the matched run (CI job id)
    pub run_id: String,
    /// Artifact availability of the matched run
    pub artifact: ArtifactAvailability,
    /// Human-facing URL of the matched run
    pub web_url: Option<String>,
    /// URL of the run that originally did the work, following skip chains
    pub origin_url: Option<String>,
}

impl LedgerHit {
    /// Hit carrying only a run identifier
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            artifact: ArtifactAvailability::Unknown,
            web_url: None,
            origin_url: None,
        }
    }
}

/// Lookup and record capability shared by the strategies
pub trait Ledger {
    /// Find the most recent run with this fingerprint
    fn lookup(&self, fingerprint: &Fingerprint) -> TreeskipResult<Option<LedgerHit>>;

    /// Remember that `run_id` ran with this fingerprint
    fn record(&mut self, fingerprint: &Fingerprint, run_id: &str) -> TreeskipResult<()>;

    /// Strategy implemented by this ledger
    fn strategy(&self) -> Strategy;
}
