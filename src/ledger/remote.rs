//! Remote query ledger
//!
//! Walks the job history newest first and recomputes the fingerprint at
//! each candidate's commit. The walk gives up after a page budget, a job
//! budget, or too many mismatches on the current ref: a branch that keeps
//! missing has diverged and older jobs are unlikely to match.

use super::{ArtifactAvailability, Ledger, LedgerHit, Strategy};
use crate::error::TreeskipResult;
use crate::fingerprint::{Fingerprint, WatchSet};
use crate::gitlab::{parse_oldest_ancestor, Job};
use crate::revision::RevisionTree;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Paginated history of completed jobs, newest first
pub trait JobHistory {
    /// Fetch one page (1-based) of successful jobs
    fn fetch_page(&self, page: u32, per_page: u32) -> TreeskipResult<Vec<Job>>;

    /// Fetch the beginning of a job's log
    fn fetch_trace(&self, job_id: u64) -> TreeskipResult<String>;
}

/// Limits of one history walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    /// Candidate jobs compared across all pages
    pub max_jobs: u32,
    /// Pages fetched
    pub max_pages: u32,
    /// Mismatching candidates on the current ref
    pub max_same_ref_mismatches: u32,
    /// Jobs requested per page
    pub per_page: u32,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            max_jobs: 1000,
            max_pages: 5,
            max_same_ref_mismatches: 2,
            per_page: 100,
        }
    }
}

#[derive(Debug, Default)]
struct SearchProgress {
    jobs: u32,
    pages: u32,
    same_ref_mismatches: u32,
}

/// Ledger backed by the CI job history
pub struct RemoteLedger {
    history: Box<dyn JobHistory>,
    tree: Rc<dyn RevisionTree>,
    watch_set: WatchSet,
    job_name: String,
    current_ref: Option<String>,
    budget: SearchBudget,
}

impl RemoteLedger {
    pub fn new(
        history: Box<dyn JobHistory>,
        tree: Rc<dyn RevisionTree>,
        watch_set: WatchSet,
        job_name: impl Into<String>,
        current_ref: Option<String>,
        budget: SearchBudget,
    ) -> Self {
        Self {
            history,
            tree,
            watch_set,
            job_name: job_name.into(),
            current_ref,
            budget,
        }
    }

    /// Compare a candidate; an unresolvable historical commit is a mismatch
    fn matches(&self, job: &Job, current: &Fingerprint) -> bool {
        match Fingerprint::compute(self.tree.as_ref(), &job.commit.id, &self.watch_set) {
            Ok(past) => past.canonical() == current.canonical(),
            Err(e) => {
                debug!("Job {} not comparable: {}", job.id, e);
                false
            }
        }
    }

    fn hit(&self, job: &Job) -> LedgerHit {
        let origin = match self.history.fetch_trace(job.id) {
            Ok(trace) => parse_oldest_ancestor(&trace),
            Err(e) => {
                warn!("Could not read trace of job {}: {}", job.id, e);
                None
            }
        };

        LedgerHit {
            run_id: job.id.to_string(),
            artifact: match job.artifacts_expire_at {
                Some(at) => ArtifactAvailability::ExpiresAt(at),
                None => ArtifactAvailability::None,
            },
            web_url: Some(job.web_url.clone()),
            origin_url: Some(origin.unwrap_or_else(|| job.web_url.clone())),
        }
    }
}

impl Ledger for RemoteLedger {
    fn lookup(&self, fingerprint: &Fingerprint) -> TreeskipResult<Option<LedgerHit>> {
        let mut progress = SearchProgress::default();

        while progress.pages < self.budget.max_pages {
            if progress.jobs >= self.budget.max_jobs {
                info!("Job budget of {} exhausted", self.budget.max_jobs);
                return Ok(None);
            }
            progress.pages += 1;
            let jobs = self
                .history
                .fetch_page(progress.pages, self.budget.per_page)?;
            if jobs.is_empty() {
                debug!("History exhausted at page {}", progress.pages);
                break;
            }

            let candidates = jobs
                .iter()
                .filter(|job| job.name == self.job_name && job.status == "success");

            for job in candidates {
                if progress.jobs >= self.budget.max_jobs {
                    info!("Job budget of {} exhausted", self.budget.max_jobs);
                    return Ok(None);
                }
                progress.jobs += 1;
                debug!("Checking job {} at {}", job.id, job.commit.id);

                if self.matches(job, fingerprint) {
                    info!(
                        "Job {} matches after {} jobs on {} pages",
                        job.id, progress.jobs, progress.pages
                    );
                    return Ok(Some(self.hit(job)));
                }

                if self.current_ref.as_deref() == Some(job.job_ref.as_str()) {
                    progress.same_ref_mismatches += 1;
                    if progress.same_ref_mismatches > self.budget.max_same_ref_mismatches {
                        info!(
                            "{} mismatches on ref {}, giving up",
                            progress.same_ref_mismatches, job.job_ref
                        );
                        return Ok(None);
                    }
                }
            }
        }

        info!(
            "No match: {} jobs checked on {} pages, {} on the same ref",
            progress.jobs, progress.pages, progress.same_ref_mismatches
        );
        Ok(None)
    }

    fn record(&mut self, _fingerprint: &Fingerprint, run_id: &str) -> TreeskipResult<()> {
        debug!("Job {} will appear in the job history once it succeeds", run_id);
        Ok(())
    }

    fn strategy(&self) -> Strategy {
        Strategy::Remote
    }
}
