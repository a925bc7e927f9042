//! Resolution of command-line, environment and file settings
//!
//! Flags and CI variables arrive through clap; the file config fills the
//! gaps. The result is the explicit set of values a decision is built from.

use super::schema::Config;
use crate::cli::args::{CheckArgs, TreeArgs};
use crate::engine::{ArtifactPolicy, EngineConfig};
use crate::error::{TreeskipError, TreeskipResult};
use crate::fingerprint::WatchSet;
use crate::ledger::{SearchBudget, Strategy};
use crate::marker::MarkerStore;
use std::path::{Path, PathBuf};
use tracing::debug;

/// GitLab refuses larger pages
const MAX_PER_PAGE: u32 = 100;

/// Directory the job's repository lives in
///
/// `CI_PROJECT_DIR` is reported relative to the runner's default builds
/// directory; when the runner uses a custom `CI_BUILDS_DIR` the project is
/// found under the parent of that directory instead.
pub fn get_project_path(builds_dir: Option<&Path>, project_dir: &Path) -> TreeskipResult<PathBuf> {
    let builds_dir = match builds_dir {
        Some(dir) if !dir.as_os_str().is_empty() && !project_dir.starts_with(dir) => dir,
        _ => return Ok(project_dir.to_path_buf()),
    };

    let parent = builds_dir
        .parent()
        .ok_or_else(|| TreeskipError::InvalidSetting {
            name: "CI_BUILDS_DIR".to_string(),
            reason: format!("{} has no parent directory", builds_dir.display()),
        })?;
    let relative = project_dir.strip_prefix("/").unwrap_or(project_dir);
    Ok(parent.join(relative))
}

/// Project directory from the tree arguments, current directory by default
pub fn project_root(tree: &TreeArgs) -> TreeskipResult<PathBuf> {
    let project_dir = match &tree.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| TreeskipError::io("getting current directory", e))?,
    };
    let path = get_project_path(tree.builds_dir.as_deref(), &project_dir)?;
    debug!("Project path: {}", path.display());
    Ok(path)
}

/// Watched paths from the tree arguments
pub fn watch_set(tree: &TreeArgs) -> TreeskipResult<WatchSet> {
    let list = tree
        .paths
        .as_deref()
        .ok_or_else(|| TreeskipError::missing("SKIP_IF_TREE_OK_IN_PAST"))?;
    WatchSet::parse(list)
}

fn required(value: &Option<String>, name: &str) -> TreeskipResult<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(TreeskipError::missing(name)),
    }
}

/// Everything the check command needs, resolved
#[derive(Debug, Clone)]
pub struct CheckSettings {
    pub strategy: Strategy,
    pub project_dir: PathBuf,
    pub engine: EngineConfig,
    pub marker_path: PathBuf,
    pub history_path: PathBuf,
    pub retention: usize,
    /// `<api>/projects/<id>/jobs`, when the API URL is known
    pub jobs_url: Option<String>,
    pub api_token: Option<String>,
    pub job_token: Option<String>,
    pub job_name: Option<String>,
    pub current_ref: Option<String>,
    pub budget: SearchBudget,
}

impl CheckSettings {
    /// Merge arguments over the file config and validate the result
    pub fn resolve(args: &CheckArgs, config: &Config) -> TreeskipResult<Self> {
        let project_dir = project_root(&args.tree)?;
        let watch_set = watch_set(&args.tree)?;
        let project_id = required(&args.project_id, "CI_PROJECT_ID")?;
        let job_id = required(&args.job_id, "CI_JOB_ID")?;
        let strategy = args.strategy.unwrap_or(config.general.strategy);

        let budget = SearchBudget {
            max_jobs: args.max_jobs.unwrap_or(config.search.max_jobs),
            max_pages: args.max_pages.unwrap_or(config.search.max_pages),
            max_same_ref_mismatches: args
                .max_same_ref_mismatches
                .unwrap_or(config.search.max_same_ref_mismatches),
            per_page: config.search.per_page,
        };
        if budget.per_page == 0 || budget.per_page > MAX_PER_PAGE {
            return Err(TreeskipError::InvalidSetting {
                name: "search.per_page".to_string(),
                reason: format!("must be between 1 and {}", MAX_PER_PAGE),
            });
        }

        let retention = args.retention.unwrap_or(config.history.retention);
        if retention == 0 {
            return Err(TreeskipError::InvalidSetting {
                name: "history.retention".to_string(),
                reason: "must keep at least one entry".to_string(),
            });
        }
        let history_file = args.history_file.as_deref().unwrap_or(&config.history.file);

        let jobs_url = args
            .api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| format!("{}/projects/{}/jobs", url.trim_end_matches('/'), project_id));

        let force = args.force;
        let job_name = args.job_name.clone().filter(|n| !n.is_empty());
        let api_token = args.api_token.clone().filter(|t| !t.is_empty());
        if strategy == Strategy::Remote && force.is_none() {
            if jobs_url.is_none() {
                return Err(TreeskipError::missing("CI_API_V4_URL"));
            }
            if api_token.is_none() {
                return Err(TreeskipError::missing("API_READ_TOKEN"));
            }
            if job_name.is_none() {
                return Err(TreeskipError::missing("CI_JOB_NAME"));
            }
        }

        let mut restore = config.artifacts.restore && !args.no_artifact;
        if restore && jobs_url.is_none() {
            debug!("No API URL, artifacts will not be restored");
            restore = false;
        }
        let artifacts = ArtifactPolicy {
            restore,
            fail_if_expired: args.fail_if_expired || config.artifacts.fail_if_expired,
            fail_on_restore_error: args
                .fail_on_restore_error
                .or(config.artifacts.fail_on_restore_error)
                .unwrap_or_else(|| strategy.fails_on_restore_error_by_default()),
        };

        let marker_path = MarkerStore::for_run(&project_dir, &project_id, &job_id)
            .path()
            .to_path_buf();

        Ok(Self {
            strategy,
            history_path: project_dir.join(history_file),
            marker_path,
            retention,
            jobs_url,
            api_token,
            job_token: args.job_token.clone().filter(|t| !t.is_empty()),
            job_name,
            current_ref: args.ref_name.clone().filter(|r| !r.is_empty()),
            budget,
            engine: EngineConfig {
                watch_set,
                revision: args.tree.revision.clone(),
                run_id: job_id,
                force,
                artifacts,
            },
            project_dir,
        })
    }
}
