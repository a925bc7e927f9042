//! Check command - decide whether the current job runs

use crate::artifact::{ArtifactStore, GitlabArtifactStore, NoArtifacts};
use crate::cli::args::CheckArgs;
use crate::config::{CheckSettings, Config};
use crate::engine::{self, ArtifactOutcome, Decision, DecisionEngine, Outcome, Reason};
use crate::error::{TreeskipError, TreeskipResult};
use crate::gitlab::{GitlabClient, SKIP_CI_DONE_KEY, SKIP_CI_OLDEST_ANCESTOR_KEY};
use crate::ledger::{Ledger, LocalLedger, RemoteLedger, Strategy};
use crate::marker::MarkerStore;
use crate::revision::{GitRevisionTree, RevisionTree};
use crate::ui::{self, UiContext};
use std::rc::Rc;
use tracing::debug;

/// Execute the check command
pub fn execute(args: CheckArgs, config: &Config) -> TreeskipResult<Outcome> {
    let ctx = UiContext::detect();
    let settings = CheckSettings::resolve(&args, config)?;
    let markers = MarkerStore::new(settings.marker_path.clone());
    debug!("Decision marker: {}", markers.path().display());

    let result = match settings.engine.force {
        Some(outcome) => engine::apply_override(&markers, outcome),
        None => match build_engine(&settings, markers.clone()) {
            Ok(mut engine) => engine.decide(),
            Err(e) => {
                engine::mark_run(&markers);
                Err(e)
            }
        },
    };

    match result {
        Ok(decision) => {
            report(&ctx, &decision);
            println!("{}", SKIP_CI_DONE_KEY);
            Ok(decision.outcome)
        }
        Err(e) => {
            ui::banner_error(&ctx, "could not decide, the job will run");
            Err(e)
        }
    }
}

fn build_engine(settings: &CheckSettings, markers: MarkerStore) -> TreeskipResult<DecisionEngine> {
    let tree: Rc<dyn RevisionTree> = Rc::new(GitRevisionTree::open(&settings.project_dir)?);
    let client = settings.jobs_url.as_ref().map(|url| {
        GitlabClient::new(
            url.clone(),
            settings.api_token.clone(),
            settings.job_token.clone(),
        )
    });
    if let Some(client) = &client {
        debug!("Jobs API: {}", client.jobs_url());
    }

    let ledger: Box<dyn Ledger> = match settings.strategy {
        Strategy::Local => Box::new(LocalLedger::open(
            settings.history_path.clone(),
            settings.retention,
        )?),
        Strategy::Remote => {
            let client = client
                .clone()
                .ok_or_else(|| TreeskipError::missing("CI_API_V4_URL"))?;
            let job_name = settings
                .job_name
                .clone()
                .ok_or_else(|| TreeskipError::missing("CI_JOB_NAME"))?;
            Box::new(RemoteLedger::new(
                Box::new(client),
                tree.clone(),
                settings.engine.watch_set.clone(),
                job_name,
                settings.current_ref.clone(),
                settings.budget,
            ))
        }
    };

    let artifacts: Box<dyn ArtifactStore> = match client {
        Some(client) if settings.engine.artifacts.restore => Box::new(GitlabArtifactStore::new(
            client,
            settings.project_dir.clone(),
        )),
        _ => Box::new(NoArtifacts),
    };

    Ok(DecisionEngine::new(
        settings.engine.clone(),
        tree,
        ledger,
        artifacts,
        markers,
    ))
}

fn report(ctx: &UiContext, decision: &Decision) {
    match &decision.reason {
        Reason::AlreadyDecided => match decision.outcome {
            Outcome::Skip => ui::banner_ok(ctx, "already decided in this job, skipping"),
            Outcome::Run => ui::banner_warn(ctx, "already decided in this job, running"),
        },
        Reason::Forced => match decision.outcome {
            Outcome::Skip => ui::banner_ok(ctx, "skip forced by configuration"),
            Outcome::Run => ui::banner_warn(ctx, "run forced by configuration"),
        },
        Reason::NoMatch => ui::banner_warn(ctx, "no previous job with these paths, running"),
        Reason::Match { hit, artifact } => {
            if let Some(origin) = &hit.origin_url {
                println!("{}={}", SKIP_CI_OLDEST_ANCESTOR_KEY, origin);
            }
            ui::banner_ok(
                ctx,
                &format!("paths already passed in job {}, skipping", hit.run_id),
            );
            if let Some(origin) = &hit.origin_url {
                ui::key_value(ctx, "oldest ancestor", origin);
            }
            match artifact {
                ArtifactOutcome::Restored => ui::step_ok_detail(ctx, "Artifacts restored", &hit.run_id),
                ArtifactOutcome::Expired => ui::step_warn_hint(
                    ctx,
                    "Artifacts expired, nothing restored",
                    "Set FAIL_IF_ARTIFACTS_EXPIRED=true to run the job instead",
                ),
                ArtifactOutcome::Failed(reason) => {
                    ui::step_warn(ctx, &format!("Artifacts not restored: {}", reason))
                }
                ArtifactOutcome::NotKept | ArtifactOutcome::Disabled => {}
            }
        }
    }
}
