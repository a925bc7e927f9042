//! Configuration schema for treeskip
//!
//! Configuration is stored in `.treeskip.toml` at the project root. Every
//! value can be overridden by the matching CI variable or command-line flag.

use crate::ledger::local::DEFAULT_RETENTION;
use crate::ledger::{SearchBudget, Strategy};
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Remote job history search budgets
    pub search: SearchConfig,

    /// Local history file
    pub history: HistoryConfig,

    /// Artifact restoration
    pub artifacts: ArtifactsConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Ledger strategy: "remote" or "local"
    pub strategy: Strategy,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Remote,
            log_format: "text".to_string(),
        }
    }
}

/// Bounds on the remote job history walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum candidate jobs examined
    pub max_jobs: u32,

    /// Maximum pages fetched
    pub max_pages: u32,

    /// Same-ref mismatches tolerated before giving up
    pub max_same_ref_mismatches: u32,

    /// Page size requested from the API
    pub per_page: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let budget = SearchBudget::default();
        Self {
            max_jobs: budget.max_jobs,
            max_pages: budget.max_pages,
            max_same_ref_mismatches: budget.max_same_ref_mismatches,
            per_page: budget.per_page,
        }
    }
}

/// Local history file settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// File name, relative to the project directory
    pub file: String,

    /// Number of entries kept
    pub retention: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            file: "ci_ok_history".to_string(),
            retention: DEFAULT_RETENTION,
        }
    }
}

/// Artifact restoration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Restore the artifacts of the matched job
    pub restore: bool,

    /// Fail instead of warning when the matched job's artifacts expired
    pub fail_if_expired: bool,

    /// Fail when download or extraction fails; unset uses the strategy default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_restore_error: Option<bool>,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            restore: true,
            fail_if_expired: false,
            fail_on_restore_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.general.strategy, Strategy::Remote);
        assert_eq!(config.search.max_jobs, 1000);
        assert_eq!(config.search.max_pages, 5);
        assert_eq!(config.search.max_same_ref_mismatches, 2);
        assert_eq!(config.history.file, "ci_ok_history");
        assert_eq!(config.history.retention, 500);
        assert!(config.artifacts.restore);
        assert_eq!(config.artifacts.fail_on_restore_error, None);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[general]
strategy = "local"

[history]
retention = 50
"#,
        )
        .unwrap();

        assert_eq!(config.general.strategy, Strategy::Local);
        assert_eq!(config.general.log_format, "text");
        assert_eq!(config.history.retention, 50);
        assert_eq!(config.history.file, "ci_ok_history");
        assert_eq!(config.search, SearchConfig::default());
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[general]\nstrategy = \"s3\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn serializes_without_unset_options() {
        let content = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(content.contains("strategy = \"remote\""));
        assert!(!content.contains("fail_on_restore_error"));
    }
}
