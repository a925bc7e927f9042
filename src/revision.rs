//! Revision tree lookups
//!
//! Resolves the object id of a path at a given commit. The fingerprint and
//! the remote ledger only ever talk to the [`RevisionTree`] trait, so tests
//! can swap the git repository for an in-memory table.

use crate::error::{TreeskipError, TreeskipResult};
use git2::Repository;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Content-hash lookup of a path at a revision
pub trait RevisionTree {
    /// Return the content hash of `path` at `revision`
    fn resolve_content_hash(&self, revision: &str, path: &str) -> TreeskipResult<String>;
}

/// Revision tree backed by a local git repository
pub struct GitRevisionTree {
    repo: Repository,
}

impl GitRevisionTree {
    /// Open the repository at `path` (work tree or bare)
    pub fn open(path: &Path) -> TreeskipResult<Self> {
        let repo = Repository::open(path).map_err(|e| TreeskipError::RepositoryOpen {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })?;
        debug!("Opened git repository at {}", path.display());
        Ok(Self { repo })
    }

    /// Resolve a revision expression to a full commit id
    pub fn commit_id(&self, revision: &str) -> TreeskipResult<String> {
        let commit = self.find_commit(revision)?;
        Ok(commit.id().to_string())
    }

    fn find_commit(&self, revision: &str) -> TreeskipResult<git2::Commit<'_>> {
        let not_found = |e: git2::Error| TreeskipError::RevisionNotFound {
            revision: revision.to_string(),
            reason: e.message().to_string(),
        };
        self.repo
            .revparse_single(revision)
            .map_err(not_found)?
            .peel_to_commit()
            .map_err(not_found)
    }
}

impl RevisionTree for GitRevisionTree {
    fn resolve_content_hash(&self, revision: &str, path: &str) -> TreeskipResult<String> {
        let commit = self.find_commit(revision)?;
        let tree = commit.tree().map_err(|e| TreeskipError::RevisionNotFound {
            revision: revision.to_string(),
            reason: e.message().to_string(),
        })?;

        // "service-A/" names the same tree entry as "service-A"
        let lookup = PathBuf::from(path.trim_end_matches('/'));
        let entry = tree
            .get_path(&lookup)
            .map_err(|_| TreeskipError::PathNotFound {
                revision: revision.to_string(),
                path: path.to_string(),
            })?;

        Ok(entry.id().to_string())
    }
}
