//! Local history ledger
//!
//! One `digest:job_id` entry per line, most recent first. The file lives
//! in a CI cache shared between pipelines; two pipelines writing it at the
//! same time can lose one prepend, the cache layer is expected to serialize
//! them.

use super::{Ledger, LedgerHit, Strategy};
use crate::error::{TreeskipError, TreeskipResult};
use crate::fingerprint::Fingerprint;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default number of entries kept
pub const DEFAULT_RETENTION: usize = 500;

/// One history line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub digest: String,
    pub run_id: String,
}

impl LedgerEntry {
    fn parse(line: &str) -> Result<Self, String> {
        let (digest, run_id) = line
            .split_once(':')
            .ok_or_else(|| "missing ':' separator".to_string())?;
        if digest.is_empty() {
            return Err("empty digest".to_string());
        }
        if run_id.is_empty() {
            return Err("empty job id".to_string());
        }
        Ok(Self {
            digest: digest.to_string(),
            run_id: run_id.to_string(),
        })
    }
}

/// Append-only (prepend, really) history persisted in a file
#[derive(Debug)]
pub struct LocalLedger {
    path: PathBuf,
    retention: usize,
    entries: Vec<LedgerEntry>,
}

impl LocalLedger {
    /// Load the history; a missing file is an empty history
    pub fn open(path: PathBuf, retention: usize) -> TreeskipResult<Self> {
        let entries = if path.exists() {
            let bytes = fs::read(&path).map_err(|e| {
                TreeskipError::io(format!("reading history {}", path.display()), e)
            })?;
            parse_history(&path, &bytes)?
        } else {
            debug!("History file {} does not exist yet", path.display());
            Vec::new()
        };

        debug!("Loaded {} history entries from {}", entries.len(), path.display());
        Ok(Self {
            path,
            retention,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    fn persist(&self) -> TreeskipResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                TreeskipError::io(format!("creating history directory {}", parent.display()), e)
            })?;
        }

        let content: String = self
            .entries
            .iter()
            .map(|e| format!("{}:{}\n", e.digest, e.run_id))
            .collect();
        fs::write(&self.path, content).map_err(|e| {
            TreeskipError::io(format!("writing history {}", self.path.display()), e)
        })
    }
}

fn parse_history(path: &Path, bytes: &[u8]) -> TreeskipResult<Vec<LedgerEntry>> {
    let content = std::str::from_utf8(bytes).map_err(|e| {
        let valid = &bytes[..e.valid_up_to()];
        TreeskipError::HistoryCorrupt {
            path: path.to_path_buf(),
            line: valid.iter().filter(|b| **b == b'\n').count() + 1,
            reason: "not valid UTF-8".to_string(),
        }
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            LedgerEntry::parse(line.trim()).map_err(|reason| TreeskipError::HistoryCorrupt {
                path: path.to_path_buf(),
                line: n + 1,
                reason,
            })
        })
        .collect()
}

impl Ledger for LocalLedger {
    fn lookup(&self, fingerprint: &Fingerprint) -> TreeskipResult<Option<LedgerHit>> {
        let digest = fingerprint.digest();
        debug!("Looking up digest {} in {} entries", digest, self.entries.len());

        let hit = self
            .entries
            .iter()
            .find(|e| e.digest == digest)
            .map(|e| LedgerHit::new(e.run_id.clone()));
        Ok(hit)
    }

    fn record(&mut self, fingerprint: &Fingerprint, run_id: &str) -> TreeskipResult<()> {
        let entry = LedgerEntry {
            digest: fingerprint.digest(),
            run_id: run_id.to_string(),
        };
        info!("Recording {}:{} in {}", entry.digest, entry.run_id, self.path.display());

        self.entries.insert(0, entry);
        self.entries.truncate(self.retention);
        self.persist()
    }

    fn strategy(&self) -> Strategy {
        Strategy::Local
    }
}
