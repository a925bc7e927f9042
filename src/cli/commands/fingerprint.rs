//! Fingerprint command - print the fingerprint of the watched paths

use crate::cli::args::FingerprintArgs;
use crate::config::resolve;
use crate::error::TreeskipResult;
use crate::fingerprint::Fingerprint;
use crate::revision::GitRevisionTree;
use crate::ui::{self, UiContext};

/// Execute the fingerprint command
pub fn execute(args: FingerprintArgs) -> TreeskipResult<()> {
    let ctx = UiContext::detect();
    let project_dir = resolve::project_root(&args.tree)?;
    let watch_set = resolve::watch_set(&args.tree)?;

    let tree = GitRevisionTree::open(&project_dir)?;
    let commit = tree.commit_id(&args.tree.revision)?;
    let fingerprint = Fingerprint::compute(&tree, &commit, &watch_set)?;

    print!("{}", fingerprint.canonical());
    println!();
    ui::key_value(&ctx, "commit", &commit);
    ui::key_value(&ctx, "digest", &fingerprint.digest());
    Ok(())
}
