//! Restoring the output files of a previous run

use crate::error::{TreeskipError, TreeskipResult};
use crate::gitlab::GitlabClient;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Materializes a run's artifacts into the working directory
pub trait ArtifactStore {
    /// Restore the artifacts of `run_id`; `Ok(false)` when the run kept none
    fn restore(&self, run_id: &str) -> TreeskipResult<bool>;
}

/// Extract a zip archive into `dest`
pub fn extract_archive(archive: &[u8], dest: &Path, run_id: &str) -> TreeskipResult<()> {
    let extract_error = |reason: String| TreeskipError::ArtifactExtract {
        job_id: run_id.to_string(),
        reason,
    };

    let mut zip =
        zip::ZipArchive::new(Cursor::new(archive)).map_err(|e| extract_error(e.to_string()))?;
    debug!("Extracting {} files to {}", zip.len(), dest.display());
    zip.extract(dest).map_err(|e| extract_error(e.to_string()))
}

/// Store for runs where restoration is turned off
pub struct NoArtifacts;

impl ArtifactStore for NoArtifacts {
    fn restore(&self, run_id: &str) -> TreeskipResult<bool> {
        debug!("Not restoring artifacts of job {}", run_id);
        Ok(false)
    }
}

/// Artifacts downloaded from the GitLab jobs API
pub struct GitlabArtifactStore {
    client: GitlabClient,
    dest: PathBuf,
}

impl GitlabArtifactStore {
    pub fn new(client: GitlabClient, dest: PathBuf) -> Self {
        Self { client, dest }
    }
}

impl ArtifactStore for GitlabArtifactStore {
    fn restore(&self, run_id: &str) -> TreeskipResult<bool> {
        let Some(archive) = self.client.download_artifacts(run_id)? else {
            return Ok(false);
        };
        extract_archive(&archive, &self.dest, run_id)?;
        info!("Restored artifacts of job {} into {}", run_id, self.dest.display());
        Ok(true)
    }
}
