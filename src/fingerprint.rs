//! Content fingerprints of watched paths
//!
//! A fingerprint is the list of `<hash> <path>` lines of every watched path
//! at one revision, in watch-set order. The remote ledger compares the raw
//! string; the local ledger stores a condensed SHA-1 digest of it.

use crate::error::{TreeskipError, TreeskipResult};
use crate::revision::RevisionTree;
use base64::Engine;
use sha1::{Digest, Sha1};
use std::fmt;
use tracing::debug;

/// Ordered, de-duplicated, non-empty list of watched paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSet {
    paths: Vec<String>,
}

impl WatchSet {
    /// Build a watch set, keeping the first occurrence of each path
    pub fn new<I, S>(paths: I) -> TreeskipResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for path in paths {
            let path = path.into();
            if path.is_empty() || unique.contains(&path) {
                continue;
            }
            unique.push(path);
        }

        if unique.is_empty() {
            return Err(TreeskipError::EmptyWatchSet);
        }
        Ok(Self { paths: unique })
    }

    /// Parse a whitespace-separated path list
    pub fn parse(list: &str) -> TreeskipResult<Self> {
        Self::new(list.split_whitespace())
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

impl fmt::Display for WatchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.paths.join(" "))
    }
}

/// Canonical content fingerprint of a watch set at a revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    canonical: String,
}

impl Fingerprint {
    /// Compute the fingerprint; any unresolvable path fails the whole computation
    pub fn compute(
        tree: &dyn RevisionTree,
        revision: &str,
        watch_set: &WatchSet,
    ) -> TreeskipResult<Self> {
        let mut canonical = String::new();
        for path in watch_set.paths() {
            let hash = tree.resolve_content_hash(revision, path)?;
            canonical.push_str(&hash);
            canonical.push(' ');
            canonical.push_str(path);
            canonical.push('\n');
        }
        debug!("Fingerprint at {}:\n{}", revision, canonical);
        Ok(Self { canonical })
    }

    /// Wrap an already canonical string
    pub fn from_canonical(canonical: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
        }
    }

    /// Raw canonical string, compared byte for byte
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Base64 SHA-1 of the canonical string
    pub fn digest(&self) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.canonical.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
    }
}
