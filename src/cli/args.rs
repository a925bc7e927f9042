//! CLI argument definitions using clap derive
//!
//! Every CI-facing setting carries the GitLab variable it is read from, so
//! the binary works unchanged from a job's `script:` section.

use crate::engine::Outcome;
use crate::ledger::Strategy;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// treeskip - skip CI jobs whose inputs already passed
///
/// Fingerprints the watched paths at the current commit and looks for a
/// previous successful job with the same fingerprint.
#[derive(Parser, Debug)]
#[command(name = "treeskip")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Verbose output from the CI variable (same as one -v)
    #[arg(
        long,
        global = true,
        hide = true,
        env = "SKIP_CI_VERBOSE",
        value_parser = BoolishValueParser::new()
    )]
    pub ci_verbose: bool,

    /// Log format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Configuration file path (defaults to .treeskip.toml in the project)
    #[arg(short, long, global = true, env = "TREESKIP_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Effective verbosity level
    pub fn verbosity(&self) -> u8 {
        self.verbose.max(u8::from(self.ci_verbose))
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decide whether the current job can be skipped (exit 0 = skip, 1 = run)
    Check(CheckArgs),

    /// Print the fingerprint of the watched paths at a revision
    Fingerprint(FingerprintArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Where the repository is and what to fingerprint
#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Space-separated list of watched paths
    #[arg(long, env = "SKIP_IF_TREE_OK_IN_PAST")]
    pub paths: Option<String>,

    /// Revision of the current job
    #[arg(long, env = "CI_COMMIT_SHA", default_value = "HEAD")]
    pub revision: String,

    /// Directory the repository is cloned to (defaults to current directory)
    #[arg(long, env = "CI_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    /// Runner builds directory
    #[arg(long, env = "CI_BUILDS_DIR")]
    pub builds_dir: Option<PathBuf>,
}

/// Arguments for the check command
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub tree: TreeArgs,

    /// Ledger strategy (default: from config, else remote)
    #[arg(long, env = "SKIP_CI_STRATEGY", value_enum)]
    pub strategy: Option<Strategy>,

    /// Force the outcome without consulting the ledger
    #[arg(long, env = "SKIP_CI_VALUE", value_enum)]
    pub force: Option<Outcome>,

    /// GitLab API base URL
    #[arg(long, env = "CI_API_V4_URL")]
    pub api_url: Option<String>,

    /// GitLab project id
    #[arg(long, env = "CI_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Id of the current job
    #[arg(long, env = "CI_JOB_ID")]
    pub job_id: Option<String>,

    /// Name of the current job
    #[arg(long, env = "CI_JOB_NAME")]
    pub job_name: Option<String>,

    /// Branch or tag of the current job
    #[arg(long = "ref", env = "CI_COMMIT_REF_NAME")]
    pub ref_name: Option<String>,

    /// Token with read_api scope, used to list jobs
    #[arg(long, env = "API_READ_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Job token, used to download artifacts
    #[arg(long, env = "CI_JOB_TOKEN", hide_env_values = true)]
    pub job_token: Option<String>,

    /// Do not restore the artifacts of the matched job
    #[arg(long, env = "SKIP_CI_NO_ARTIFACT", value_parser = BoolishValueParser::new())]
    pub no_artifact: bool,

    /// Fail when the artifacts of the matched job expired
    #[arg(long, env = "FAIL_IF_ARTIFACTS_EXPIRED", value_parser = BoolishValueParser::new())]
    pub fail_if_expired: bool,

    /// Fail when artifacts cannot be restored (default: true for remote, false for local)
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub fail_on_restore_error: Option<bool>,

    /// Maximum pages of job history fetched
    #[arg(long, env = "SKIP_CI_PAGE_TO_FETCH_MAX")]
    pub max_pages: Option<u32>,

    /// Mismatching jobs on the current ref tolerated before giving up
    #[arg(long, env = "SKIP_CI_COMMIT_TO_CHECK_SAME_REF_MAX")]
    pub max_same_ref_mismatches: Option<u32>,

    /// Maximum jobs compared
    #[arg(long, env = "SKIP_CI_COMMIT_TO_CHECK_SAME_JOB_MAX")]
    pub max_jobs: Option<u32>,

    /// History file, relative to the project directory (local strategy)
    #[arg(long)]
    pub history_file: Option<String>,

    /// Entries kept in the history file (local strategy)
    #[arg(long)]
    pub retention: Option<usize>,
}

/// Arguments for the fingerprint command
#[derive(Args, Debug, Clone)]
pub struct FingerprintArgs {
    #[command(flatten)]
    pub tree: TreeArgs,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show effective file configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}
