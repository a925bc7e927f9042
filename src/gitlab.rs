//! GitLab jobs API client
//!
//! Blocking `ureq` calls against `<api>/projects/<id>/jobs`: paginated
//! listing of successful jobs, job traces and artifact archives.

use crate::error::{TreeskipError, TreeskipResult};
use crate::ledger::JobHistory;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Read;
use tracing::debug;

/// Trace line announcing that a decision was taken
pub const SKIP_CI_DONE_KEY: &str = "[skip-ci-done]";
/// Trace line carrying the URL of the job that originally did the work
pub const SKIP_CI_OLDEST_ANCESTOR_KEY: &str = "[skip-ci-oldest-ancestor]";

/// Only the head of a trace is searched for the ancestor line
const MAX_TRACE_SIZE: u64 = 100_000;

/// A job as returned by the jobs API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Job {
    pub id: u64,
    pub name: String,
    pub status: String,
    #[serde(rename = "ref")]
    pub job_ref: String,
    pub commit: JobCommit,
    pub artifacts_expire_at: Option<DateTime<Utc>>,
    pub web_url: String,
}

/// Commit a job ran on
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobCommit {
    pub id: String,
}

/// Parse a page of the jobs API
pub fn parse_jobs(json: &str) -> TreeskipResult<Vec<Job>> {
    serde_json::from_str(json).map_err(|e| TreeskipError::JobHistoryDecode(e.to_string()))
}

/// Find the ancestor URL printed in a job trace
///
/// Stops at the first `[skip-ci-done]` line: anything after it belongs to
/// the job script, not to the skip decision.
pub fn parse_oldest_ancestor(trace: &str) -> Option<String> {
    for line in trace.lines() {
        if let Some(pos) = line.find(SKIP_CI_OLDEST_ANCESTOR_KEY) {
            let rest = &line[pos + SKIP_CI_OLDEST_ANCESTOR_KEY.len()..];
            let url = rest.strip_prefix('=').unwrap_or(rest).trim();
            if !url.is_empty() {
                return Some(url.to_string());
            }
        } else if line.contains(SKIP_CI_DONE_KEY) {
            return None;
        }
    }
    None
}

/// Client for one project's jobs endpoint
#[derive(Clone)]
pub struct GitlabClient {
    agent: ureq::Agent,
    jobs_url: String,
    api_token: Option<String>,
    job_token: Option<String>,
}

impl GitlabClient {
    /// `jobs_url` is `<api>/projects/<id>/jobs`
    pub fn new(
        jobs_url: impl Into<String>,
        api_token: Option<String>,
        job_token: Option<String>,
    ) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            jobs_url: jobs_url.into().trim_end_matches('/').to_string(),
            api_token,
            job_token,
        }
    }

    pub fn jobs_url(&self) -> &str {
        &self.jobs_url
    }

    fn api_token(&self) -> TreeskipResult<&str> {
        self.api_token
            .as_deref()
            .ok_or_else(|| TreeskipError::missing("API_READ_TOKEN"))
    }

    /// Download the artifact archive of a job; `None` when the job kept none
    pub fn download_artifacts(&self, job_id: &str) -> TreeskipResult<Option<Vec<u8>>> {
        let download_error = |reason: String| TreeskipError::ArtifactDownload {
            job_id: job_id.to_string(),
            reason,
        };
        let token = self
            .job_token
            .as_deref()
            .ok_or_else(|| download_error("CI_JOB_TOKEN is not set".to_string()))?;

        let url = format!("{}/{}/artifacts", self.jobs_url, job_id);
        debug!("GET {}", url);

        let mut response = match self.agent.get(&url).header("JOB-TOKEN", token).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(404)) => {
                debug!("Job {} has no artifact archive", job_id);
                return Ok(None);
            }
            Err(e) => return Err(download_error(e.to_string())),
        };

        let mut archive = Vec::new();
        response
            .body_mut()
            .as_reader()
            .read_to_end(&mut archive)
            .map_err(|e| download_error(e.to_string()))?;
        debug!("Downloaded {} bytes of artifacts for job {}", archive.len(), job_id);
        Ok(Some(archive))
    }
}

impl JobHistory for GitlabClient {
    fn fetch_page(&self, page: u32, per_page: u32) -> TreeskipResult<Vec<Job>> {
        let token = self.api_token()?;
        debug!(
            "GET {}?scope[]=success&per_page={}&page={}",
            self.jobs_url, per_page, page
        );

        let mut response = self
            .agent
            .get(&self.jobs_url)
            .header("PRIVATE-TOKEN", token)
            .query("scope[]", "success")
            .query("per_page", per_page.to_string())
            .query("page", page.to_string())
            .call()
            .map_err(|e| TreeskipError::http(format!("listing jobs page {}", page), e))?;

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TreeskipError::http(format!("reading jobs page {}", page), e))?;
        let jobs = parse_jobs(&body)?;
        debug!("Fetched {} jobs from page {}", jobs.len(), page);
        Ok(jobs)
    }

    fn fetch_trace(&self, job_id: u64) -> TreeskipResult<String> {
        let token = self.api_token()?;
        let url = format!("{}/{}/trace", self.jobs_url, job_id);
        debug!("GET {}", url);

        let mut response = self
            .agent
            .get(&url)
            .header("PRIVATE-TOKEN", token)
            .call()
            .map_err(|e| TreeskipError::http(format!("fetching trace of job {}", job_id), e))?;

        let mut head = Vec::new();
        response
            .body_mut()
            .as_reader()
            .take(MAX_TRACE_SIZE)
            .read_to_end(&mut head)
            .map_err(|e| TreeskipError::io(format!("reading trace of job {}", job_id), e))?;
        Ok(String::from_utf8_lossy(&head).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"[
  {
    "artifacts_expire_at": "2023-03-12T19:59:33.250Z",
    "commit": { "id": "2121212121212121212121212121212121212121", "title": "x" },
    "id": 12345678,
    "name": "jobA",
    "ref": "branch1",
    "stage": "test",
    "status": "success",
    "web_url": "https://gitlab.localhost/skip/skip-rs/-/jobs/12345678"
  },
  {
    "artifacts_expire_at": null,
    "commit": { "id": "3333333333333333333333333333333333333333" },
    "id": 12345679,
    "name": "jobA",
    "ref": "branch2",
    "status": "success",
    "web_url": "https://gitlab.localhost/skip/skip-rs/-/jobs/12345679"
  }
]"#;

    #[test]
    fn parses_jobs_page() {
        let jobs = parse_jobs(PAGE).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, 12345678);
        assert_eq!(jobs[0].job_ref, "branch1");
        assert_eq!(jobs[0].commit.id, "2121212121212121212121212121212121212121");
        assert_eq!(
            jobs[0].artifacts_expire_at.unwrap().to_rfc3339(),
            "2023-03-12T19:59:33.250+00:00"
        );
        assert_eq!(jobs[1].artifacts_expire_at, None);
    }

    #[test]
    fn rejects_malformed_page() {
        let err = parse_jobs(r#"{"message": "401 Unauthorized"}"#).unwrap_err();
        assert!(matches!(err, TreeskipError::JobHistoryDecode(_)));
    }

    #[test]
    fn finds_ancestor_in_trace() {
        let trace = "Running with gitlab-runner\n\
                     $ treeskip check\n\
                     [skip-ci-oldest-ancestor]=https://gitlab.localhost/p/-/jobs/42\n\
                     [skip-ci-done]\n";
        assert_eq!(
            parse_oldest_ancestor(trace),
            Some("https://gitlab.localhost/p/-/jobs/42".to_string())
        );
    }

    #[test]
    fn ancestor_after_done_is_ignored() {
        let trace = "[skip-ci-done]\n[skip-ci-oldest-ancestor]=https://x/-/jobs/1\n";
        assert_eq!(parse_oldest_ancestor(trace), None);
    }

    #[test]
    fn ancestor_with_carriage_return() {
        let trace = "\u{1b}[0K[skip-ci-oldest-ancestor]=https://x/-/jobs/7\r\n";
        assert_eq!(
            parse_oldest_ancestor(trace),
            Some("https://x/-/jobs/7".to_string())
        );
    }

    #[test]
    fn no_ancestor_in_plain_trace() {
        assert_eq!(parse_oldest_ancestor("make test\nok\n"), None);
    }

    #[test]
    fn missing_api_token_is_config_error() {
        let client = GitlabClient::new("http://127.0.0.1:9/api/v4/projects/1/jobs", None, None);
        let err = client.fetch_page(1, 100).unwrap_err();
        assert!(matches!(err, TreeskipError::MissingSetting { .. }));
    }

    #[test]
    fn missing_job_token_fails_download() {
        let client = GitlabClient::new("http://127.0.0.1:9/jobs/", None, None);
        assert_eq!(client.jobs_url(), "http://127.0.0.1:9/jobs");
        let err = client.download_artifacts("1").unwrap_err();
        assert!(matches!(err, TreeskipError::ArtifactDownload { .. }));
    }

    #[test]
    fn unreachable_server_is_http_error() {
        let client = GitlabClient::new(
            "http://127.0.0.1:9/api/v4/projects/1/jobs",
            Some("token".to_string()),
            None,
        );
        let err = client.fetch_page(1, 100).unwrap_err();
        assert!(matches!(err, TreeskipError::Http { .. }));
    }
}
