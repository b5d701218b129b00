//! Merge a feature branch into main, push, and optionally clean up.

use tracing::{debug, warn};

use crate::error::MergeError;
use crate::git::{MAIN_BRANCH, ORIGIN, Vcs};
use crate::prompt::Prompter;
use crate::push::RetryingPusher;

/// How a successful merge ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    MergedPushedCleanedUp,
    MergedPushedNotCleanedUp,
    /// No `origin` remote and the operator declined to add one.
    MergedPushSkipped,
}

pub struct MergeAutomation<'a> {
    vcs: &'a dyn Vcs,
    prompter: &'a dyn Prompter,
}

impl<'a> MergeAutomation<'a> {
    pub fn new(vcs: &'a dyn Vcs, prompter: &'a dyn Prompter) -> Self {
        Self { vcs, prompter }
    }

    /// Merge `feature_branch` into main and push main.
    ///
    /// Pulling main and deleting the remote branch are best effort. A merge
    /// failure aborts and leaves conflict resolution to the operator.
    pub fn merge_to_main_and_push(&self, feature_branch: &str) -> Result<MergeOutcome, MergeError> {
        self.vcs
            .switch_branch(MAIN_BRANCH)
            .map_err(MergeError::Checkout)?;
        println!("  [DONE] Switched to {MAIN_BRANCH}");

        // A new repository has no main on the remote yet
        match self.vcs.pull(ORIGIN, MAIN_BRANCH) {
            Ok(()) => println!("  [DONE] Pulled {ORIGIN}/{MAIN_BRANCH}"),
            Err(e) => warn!("Could not pull {ORIGIN}/{MAIN_BRANCH}, continuing: {e}"),
        }

        self.vcs
            .merge(feature_branch)
            .map_err(|source| MergeError::Conflict {
                branch: feature_branch.to_string(),
                source,
            })?;
        println!("  [DONE] Merged {feature_branch} into {MAIN_BRANCH}");

        if !self.ensure_origin()? {
            warn!("No '{ORIGIN}' remote configured, skipping push");
            println!("  [SKIP] Push of {MAIN_BRANCH}");
            return Ok(MergeOutcome::MergedPushSkipped);
        }

        RetryingPusher::new(self.vcs)
            .push(MAIN_BRANCH)
            .map_err(MergeError::Push)?;

        let delete = self
            .prompter
            .confirm(&format!("Delete branch '{feature_branch}'?"), true)?;
        if !delete {
            return Ok(MergeOutcome::MergedPushedNotCleanedUp);
        }

        self.vcs
            .delete_branch(feature_branch)
            .map_err(|source| MergeError::DeleteBranch {
                branch: feature_branch.to_string(),
                source,
            })?;
        println!("  [DONE] Deleted local branch {feature_branch}");

        match self.vcs.delete_remote_branch(ORIGIN, feature_branch) {
            Ok(()) => println!("  [DONE] Deleted {ORIGIN}/{feature_branch}"),
            Err(e) => warn!("Could not delete remote branch '{feature_branch}': {e}"),
        }

        Ok(MergeOutcome::MergedPushedCleanedUp)
    }

    /// Make sure `origin` exists, offering to add it. `false` if declined.
    fn ensure_origin(&self) -> Result<bool, MergeError> {
        if self.vcs.has_remote(ORIGIN) {
            return Ok(true);
        }

        if !self
            .prompter
            .confirm(&format!("No '{ORIGIN}' remote. Add one now?"), true)?
        {
            return Ok(false);
        }

        let url = self.prompter.input("Remote URL", "")?;
        let url = url.trim();
        if url.is_empty() {
            debug!("Empty remote URL entered");
            return Ok(false);
        }

        self.vcs
            .add_remote(ORIGIN, url)
            .map_err(MergeError::AddRemote)?;
        println!("  [DONE] Added remote {ORIGIN} -> {url}");
        Ok(true)
    }
}
