//! Integration tests for treeskip

mod common {
    use git2::{Repository, Signature};
    use std::path::Path;
    use tempfile::TempDir;

    /// Create a temporary git repository
    pub fn create_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    /// Write files and commit them on HEAD
    pub fn commit(repo: &Repository, files: &[(&str, &str)], message: &str) -> git2::Oid {
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        let workdir = repo.workdir().unwrap().to_path_buf();
        let mut index = repo.index().unwrap();

        for (path, content) in files {
            let full_path = workdir.join(path);
            std::fs::create_dir_all(full_path.parent().unwrap()).unwrap();
            std::fs::write(&full_path, content).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }

        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    /// Repository with two watched directories and an unrelated one
    pub fn monorepo() -> (TempDir, Repository) {
        let (dir, repo) = create_repo();
        commit(
            &repo,
            &[
                ("service-A/main.rs", "fn main() {}"),
                ("lib-1/lib.rs", "pub fn f() {}"),
                ("docs/README.md", "# docs"),
            ],
            "initial",
        );
        (dir, repo)
    }
}

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn treeskip() -> Command {
        let mut cmd = cargo_bin_cmd!("treeskip");
        cmd.env_clear();
        cmd
    }

    #[test]
    fn help_displays() {
        treeskip()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("skip CI jobs whose inputs already passed"));
    }

    #[test]
    fn version_displays() {
        treeskip()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("treeskip"));
    }

    #[test]
    fn unknown_flag_is_config_error() {
        treeskip().args(["check", "--bogus"]).assert().code(6);
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        treeskip()
            .current_dir(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains(".treeskip.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        treeskip()
            .current_dir(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("max_pages = 5"));
    }

    #[test]
    fn config_init_then_invalid_file() {
        let temp = TempDir::new().unwrap();
        treeskip()
            .current_dir(temp.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(temp.path().join(".treeskip.toml").exists());

        std::fs::write(temp.path().join(".treeskip.toml"), "[general\n").unwrap();
        treeskip()
            .current_dir(temp.path())
            .args(["config", "show"])
            .assert()
            .code(6)
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}

mod fingerprint_tests {
    use super::common;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn treeskip() -> Command {
        let mut cmd = cargo_bin_cmd!("treeskip");
        cmd.env_clear();
        cmd
    }

    #[test]
    fn prints_canonical_and_digest() {
        let (dir, _repo) = common::monorepo();
        treeskip()
            .current_dir(dir.path())
            .args(["fingerprint", "--paths", "service-A lib-1"])
            .arg("--project-dir")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::is_match(r"^[0-9a-f]{40} service-A\n[0-9a-f]{40} lib-1\n").unwrap())
            .stdout(predicate::str::contains("digest"));
    }

    #[test]
    fn missing_path_is_runtime_error() {
        let (dir, _repo) = common::monorepo();
        treeskip()
            .current_dir(dir.path())
            .args(["fingerprint", "--paths", "service-A nope"])
            .arg("--project-dir")
            .arg(dir.path())
            .assert()
            .code(2)
            .stderr(predicate::str::contains("nope"));
    }

    #[test]
    fn empty_paths_is_config_error() {
        let (dir, _repo) = common::monorepo();
        treeskip()
            .current_dir(dir.path())
            .args(["fingerprint", "--paths", " "])
            .arg("--project-dir")
            .arg(dir.path())
            .assert()
            .code(6);
    }
}

mod check_tests {
    use super::common;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;

    /// `check` with the local strategy in `dir`, as job `job_id`
    fn check(dir: &Path, job_id: &str) -> Command {
        let mut cmd = cargo_bin_cmd!("treeskip");
        cmd.env_clear()
            .current_dir(dir)
            .env("CI_PROJECT_DIR", dir)
            .env("CI_PROJECT_ID", "7")
            .env("CI_JOB_ID", job_id)
            .env("SKIP_IF_TREE_OK_IN_PAST", "service-A lib-1")
            .args(["check", "--strategy", "local"]);
        cmd
    }

    fn marker(dir: &Path, job_id: &str) -> String {
        fs::read_to_string(dir.join(format!("ci-skip-7-{job_id}"))).unwrap()
    }

    #[test]
    fn miss_then_hit_across_jobs() {
        let (dir, _repo) = common::monorepo();

        check(dir.path(), "100")
            .assert()
            .code(1)
            .stdout(predicate::str::contains("[skip-ci-done]"));
        assert_eq!(marker(dir.path(), "100"), "false");
        let history = fs::read_to_string(dir.path().join("ci_ok_history")).unwrap();
        assert_eq!(history.lines().count(), 1);
        assert!(history.trim_end().ends_with(":100"));

        check(dir.path(), "101")
            .assert()
            .code(0)
            .stdout(predicate::str::contains("job 100"))
            .stdout(predicate::str::contains("[skip-ci-done]"));
        assert_eq!(marker(dir.path(), "101"), "true");
    }

    #[test]
    fn decision_is_idempotent_within_a_job() {
        let (dir, _repo) = common::monorepo();
        check(dir.path(), "100").assert().code(1);
        check(dir.path(), "101").assert().code(0);

        // the ledger is not consulted again
        fs::remove_file(dir.path().join("ci_ok_history")).unwrap();
        check(dir.path(), "101")
            .assert()
            .code(0)
            .stdout(predicate::str::contains("already decided"));
        assert!(!dir.path().join("ci_ok_history").exists());
    }

    #[test]
    fn watched_change_runs_again() {
        let (dir, repo) = common::monorepo();
        check(dir.path(), "100").assert().code(1);

        common::commit(&repo, &[("lib-1/lib.rs", "pub fn g() {}")], "change lib");
        check(dir.path(), "101").assert().code(1);
        assert_eq!(
            fs::read_to_string(dir.path().join("ci_ok_history"))
                .unwrap()
                .lines()
                .count(),
            2
        );
    }

    #[test]
    fn unrelated_change_still_skips() {
        let (dir, repo) = common::monorepo();
        check(dir.path(), "100").assert().code(1);

        common::commit(&repo, &[("docs/README.md", "# more docs")], "docs");
        check(dir.path(), "101").assert().code(0);
    }

    #[test]
    fn forced_skip_leaves_history_untouched() {
        let (dir, _repo) = common::monorepo();
        check(dir.path(), "100")
            .env("SKIP_CI_VALUE", "true")
            .assert()
            .code(0);
        assert_eq!(marker(dir.path(), "100"), "true");
        assert!(!dir.path().join("ci_ok_history").exists());
    }

    #[test]
    fn unresolvable_path_marks_run() {
        let (dir, _repo) = common::monorepo();
        check(dir.path(), "100")
            .env("SKIP_IF_TREE_OK_IN_PAST", "service-A missing-dir")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("missing-dir"));
        assert_eq!(marker(dir.path(), "100"), "false");
        assert!(!dir.path().join("ci_ok_history").exists());
    }

    #[test]
    fn corrupt_history_marks_run() {
        let (dir, _repo) = common::monorepo();
        fs::write(dir.path().join("ci_ok_history"), "not-a-history-line\n").unwrap();

        check(dir.path(), "100")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Corrupt history"));
        assert_eq!(marker(dir.path(), "100"), "false");
    }

    #[test]
    fn empty_watch_set_records_nothing() {
        let (dir, _repo) = common::monorepo();
        check(dir.path(), "100")
            .env("SKIP_IF_TREE_OK_IN_PAST", "")
            .assert()
            .code(6);
        assert!(!dir.path().join("ci-skip-7-100").exists());
    }

    #[test]
    fn remote_without_token_is_config_error() {
        let (dir, _repo) = common::monorepo();
        let mut cmd = cargo_bin_cmd!("treeskip");
        cmd.env_clear()
            .current_dir(dir.path())
            .env("CI_PROJECT_DIR", dir.path())
            .env("CI_PROJECT_ID", "7")
            .env("CI_JOB_ID", "100")
            .env("CI_JOB_NAME", "test")
            .env("CI_API_V4_URL", "http://127.0.0.1:9/api/v4")
            .env("SKIP_IF_TREE_OK_IN_PAST", "service-A")
            .arg("check")
            .assert()
            .code(6)
            .stderr(predicate::str::contains("API_READ_TOKEN"));
    }
}
