//! Skip/run decision for one guarded step
//!
//! ```text
//! marker set? ──yes──> return it
//!     │no
//! forced? ──yes──> write marker, return it
//!     │no
//! fingerprint ──error──> write run, fail
//!     │
//! ledger lookup ──hit──> restore artifacts, write skip
//!     │miss
//! record, write run
//! ```

use crate::artifact::ArtifactStore;
use crate::error::{TreeskipError, TreeskipResult, EXIT_RUN, EXIT_SKIP};
use crate::fingerprint::{Fingerprint, WatchSet};
use crate::ledger::{ArtifactAvailability, Ledger, LedgerHit};
use crate::marker::{DecisionMarker, MarkerStore};
use crate::revision::RevisionTree;
use chrono::Utc;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Terminal outcome of a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Outcome {
    /// Reuse the previous run, do not execute the step
    #[value(alias = "true")]
    Skip,
    /// Execute the step
    #[value(alias = "false")]
    Run,
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Skip => EXIT_SKIP,
            Self::Run => EXIT_RUN,
        }
    }

    fn marker(&self) -> DecisionMarker {
        match self {
            Self::Skip => DecisionMarker::Skip,
            Self::Run => DecisionMarker::Run,
        }
    }
}

/// What happened to the artifacts of a matched run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    Restored,
    /// The matched run kept no artifacts
    NotKept,
    Expired,
    /// Restoration turned off by configuration
    Disabled,
    /// Restoration failed and the policy tolerates it
    Failed(String),
}

/// Why the engine reached its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// An earlier invocation in the same run decided
    AlreadyDecided,
    /// The outcome was forced by configuration
    Forced,
    /// A previous run had the same fingerprint
    Match {
        hit: LedgerHit,
        artifact: ArtifactOutcome,
    },
    /// No previous run matched; the fingerprint was recorded
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub outcome: Outcome,
    pub reason: Reason,
}

/// How artifact problems on a hit are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactPolicy {
    pub restore: bool,
    pub fail_if_expired: bool,
    pub fail_on_restore_error: bool,
}

impl Default for ArtifactPolicy {
    fn default() -> Self {
        Self {
            restore: true,
            fail_if_expired: false,
            fail_on_restore_error: true,
        }
    }
}

/// Resolved inputs of one decision
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub watch_set: WatchSet,
    /// Revision of the current run
    pub revision: String,
    /// Identifier of the current run, recorded on a miss
    pub run_id: String,
    pub force: Option<Outcome>,
    pub artifacts: ArtifactPolicy,
}

pub struct DecisionEngine {
    config: EngineConfig,
    tree: Rc<dyn RevisionTree>,
    ledger: Box<dyn Ledger>,
    artifacts: Box<dyn ArtifactStore>,
    markers: MarkerStore,
}

impl DecisionEngine {
    pub fn new(
        config: EngineConfig,
        tree: Rc<dyn RevisionTree>,
        ledger: Box<dyn Ledger>,
        artifacts: Box<dyn ArtifactStore>,
        markers: MarkerStore,
    ) -> Self {
        Self {
            config,
            tree,
            ledger,
            artifacts,
            markers,
        }
    }

    /// Decide, persisting the outcome for later invocations in this run
    ///
    /// On failure a `Run` marker is still written so a retry of the job
    /// runs the step instead of failing again.
    pub fn decide(&mut self) -> TreeskipResult<Decision> {
        if let Some(decision) = already_decided(&self.markers) {
            return Ok(decision);
        }

        match self.decide_fresh() {
            Ok(decision) => {
                self.markers.write(decision.outcome.marker())?;
                Ok(decision)
            }
            Err(e) => {
                mark_run(&self.markers);
                Err(e)
            }
        }
    }

    fn decide_fresh(&mut self) -> TreeskipResult<Decision> {
        if let Some(outcome) = self.config.force {
            info!("Outcome forced to {:?}", outcome);
            return Ok(Decision {
                outcome,
                reason: Reason::Forced,
            });
        }

        let fingerprint = Fingerprint::compute(
            self.tree.as_ref(),
            &self.config.revision,
            &self.config.watch_set,
        )?;
        debug!(
            "Looking up {} in {} ledger",
            fingerprint.digest(),
            self.ledger.strategy()
        );

        match self.ledger.lookup(&fingerprint)? {
            Some(hit) => {
                info!("Watched paths already passed in job {}", hit.run_id);
                let artifact = self.restore(&hit)?;
                Ok(Decision {
                    outcome: Outcome::Skip,
                    reason: Reason::Match { hit, artifact },
                })
            }
            None => {
                info!("No previous job matches the watched paths");
                self.ledger.record(&fingerprint, &self.config.run_id)?;
                Ok(Decision {
                    outcome: Outcome::Run,
                    reason: Reason::NoMatch,
                })
            }
        }
    }

    fn restore(&self, hit: &LedgerHit) -> TreeskipResult<ArtifactOutcome> {
        let policy = self.config.artifacts;
        if !policy.restore {
            debug!("Artifact restoration disabled");
            return Ok(ArtifactOutcome::Disabled);
        }

        match &hit.artifact {
            ArtifactAvailability::None => {
                debug!("Job {} kept no artifacts", hit.run_id);
                return Ok(ArtifactOutcome::NotKept);
            }
            ArtifactAvailability::ExpiresAt(at) if *at <= Utc::now() => {
                if policy.fail_if_expired {
                    return Err(TreeskipError::ArtifactExpired {
                        job_id: hit.run_id.clone(),
                        expired_at: at.to_rfc3339(),
                    });
                }
                warn!("Artifacts of job {} expired at {}, ignoring them", hit.run_id, at);
                return Ok(ArtifactOutcome::Expired);
            }
            ArtifactAvailability::ExpiresAt(_) | ArtifactAvailability::Unknown => {}
        }

        match self.artifacts.restore(&hit.run_id) {
            Ok(true) => Ok(ArtifactOutcome::Restored),
            Ok(false) => {
                warn!("Job {} has no artifact archive", hit.run_id);
                Ok(ArtifactOutcome::NotKept)
            }
            Err(e) if policy.fail_on_restore_error => Err(e),
            Err(e) => {
                warn!("Artifacts of job {} not restored: {}", hit.run_id, e);
                Ok(ArtifactOutcome::Failed(e.to_string()))
            }
        }
    }
}

/// Persist a forced outcome without touching the repository or a ledger
pub fn apply_override(markers: &MarkerStore, outcome: Outcome) -> TreeskipResult<Decision> {
    if let Some(decision) = already_decided(markers) {
        return Ok(decision);
    }

    info!("Outcome forced to {:?}", outcome);
    markers.write(outcome.marker())?;
    Ok(Decision {
        outcome,
        reason: Reason::Forced,
    })
}

/// Best-effort `Run` marker after a failure
pub fn mark_run(markers: &MarkerStore) {
    if let Err(e) = markers.write(DecisionMarker::Run) {
        warn!("Could not persist run marker: {}", e);
    }
}

fn already_decided(markers: &MarkerStore) -> Option<Decision> {
    let outcome = match markers.read() {
        DecisionMarker::Skip => Outcome::Skip,
        DecisionMarker::Run => Outcome::Run,
        DecisionMarker::Unset => return None,
    };
    debug!("Decision already taken in this run: {:?}", outcome);
    Some(Decision {
        outcome,
        reason: Reason::AlreadyDecided,
    })
}
