//! The workflow state machine.
//!
//! Start → RepoEnsured → RemoteEnsured → CommitHistoryChecked → BranchDecided
//! → Staged → MessageGenerated → Committed → PushDecided → Done.
//!
//! Every step runs to completion before the next begins. Nothing is rolled
//! back on failure: a created branch survives a later failed push.

use tracing::{debug, warn};

use super::{BranchDecision, ChangeRequest, CommitPlan, PushChoice, WorkflowState};
use crate::ai::{ManualFallback, SuggestionGenerator, SuggestionKind, SuggestionRequest};
use crate::commit::{CommitType, classify};
use crate::error::WorkflowError;
use crate::git::{MAIN_BRANCH, ORIGIN, RepositorySnapshot, Vcs};
use crate::merge::MergeAutomation;
use crate::prompt::Prompter;
use crate::push::RetryingPusher;

/// Collaborators for one run.
pub struct RunContext<'a> {
    pub vcs: &'a dyn Vcs,
    pub prompter: &'a dyn Prompter,
    pub suggestions: &'a SuggestionGenerator,
}

pub struct WorkflowOrchestrator<'a> {
    ctx: RunContext<'a>,
    state: WorkflowState,
}

impl<'a> WorkflowOrchestrator<'a> {
    pub fn new(ctx: RunContext<'a>) -> Self {
        Self {
            ctx,
            state: WorkflowState::Start,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    fn transition(&mut self, next: WorkflowState) {
        debug!(from = %self.state, to = %next, "Workflow transition");
        self.state = next;
    }

    /// Run the whole workflow for `request`.
    pub async fn run(&mut self, request: &ChangeRequest) -> Result<CommitPlan, WorkflowError> {
        self.ensure_repository()?;
        self.transition(WorkflowState::RepoEnsured);

        if let Some(url) = request.remote_url.as_deref() {
            self.ensure_remote(url);
        }
        self.transition(WorkflowState::RemoteEnsured);

        let snapshot = RepositorySnapshot::read(self.ctx.vcs)?;
        self.transition(WorkflowState::CommitHistoryChecked);

        let branch_decision = self.decide_branch(request, &snapshot).await?;
        self.apply_branch_decision(&branch_decision)?;
        self.transition(WorkflowState::BranchDecided);

        let diff = self.stage()?;
        self.transition(WorkflowState::Staged);

        let commit_type = resolve_commit_type(request, &diff);
        let manual = ManualFallback::today(commit_type, request.scope(), &request.description);
        let suggestion =
            SuggestionRequest::new(SuggestionKind::CommitMessage, &diff, &request.description);
        let commit_message = self.ctx.suggestions.suggest(&suggestion, &manual).await;
        self.transition(WorkflowState::MessageGenerated);

        self.ctx.vcs.commit(&commit_message)?;
        println!("  [DONE] Committed: {commit_message}");
        self.transition(WorkflowState::Committed);

        let push_choice = self.dispatch_push(request, &diff, &manual).await?;
        self.transition(WorkflowState::PushDecided);

        self.transition(WorkflowState::Done);
        Ok(CommitPlan {
            branch_decision,
            commit_message,
            push_choice,
        })
    }

    fn ensure_repository(&self) -> Result<(), WorkflowError> {
        if self.ctx.vcs.is_repository() {
            return Ok(());
        }
        self.ctx.vcs.init().map_err(WorkflowError::RepositoryInit)?;
        println!("  [DONE] Initialized git repository");
        Ok(())
    }

    fn ensure_remote(&self, url: &str) {
        match self.ctx.vcs.add_remote(ORIGIN, url) {
            Ok(()) => println!("  [DONE] Added remote {ORIGIN} -> {url}"),
            Err(e) => warn!("Could not add remote '{ORIGIN}': {e}"),
        }
    }

    async fn decide_branch(
        &self,
        request: &ChangeRequest,
        snapshot: &RepositorySnapshot,
    ) -> Result<BranchDecision, WorkflowError> {
        if request.skip_branch_prompt {
            return Ok(BranchDecision::CommitToMain);
        }
        if !snapshot.has_commits {
            println!("  [SKIP] Branch selection: no commits yet, committing to {MAIN_BRANCH}");
            return Ok(BranchDecision::CommitToMain);
        }

        let current = snapshot.current_branch.clone();
        let items = vec![
            format!("Current branch ({current})"),
            "New branch".to_string(),
        ];
        let choice = self
            .ctx
            .prompter
            .select("Where should this commit go?", &items, 0)?;
        if choice == 0 {
            return Ok(BranchDecision::CommitToCurrent(current));
        }

        let suggested = self.propose_branch_name(request).await?;
        loop {
            let name = self.ctx.prompter.input("Branch name", &suggested)?;
            let name = name.trim();
            if !name.is_empty() {
                return Ok(BranchDecision::CommitToNewBranch(name.to_string()));
            }
            println!("  [WARN] Branch name cannot be empty");
        }
    }

    /// Suggested name for a new branch, before operator edits.
    async fn propose_branch_name(&self, request: &ChangeRequest) -> Result<String, WorkflowError> {
        let branch_type = request.commit_type.unwrap_or_default();
        let manual = ManualFallback::today(branch_type, request.scope(), &request.description);
        let diff = self.diff_for_suggestion();

        if !request.open_source {
            let suggestion =
                SuggestionRequest::new(SuggestionKind::BranchName, diff, &request.description);
            return Ok(self.ctx.suggestions.suggest(&suggestion, &manual).await);
        }

        let issue = loop {
            let issue = self.ctx.prompter.input("Issue number", "")?;
            let issue = issue.trim().trim_start_matches('#');
            if !issue.is_empty() && issue.chars().all(|c| c.is_ascii_digit()) {
                break issue.to_string();
            }
            println!("  [WARN] Issue number must be numeric");
        };

        let suggestion =
            SuggestionRequest::new(SuggestionKind::ShortTitle, diff, &request.description);
        let short_title = self.ctx.suggestions.suggest(&suggestion, &manual).await;
        Ok(format!("{branch_type}/#{issue}-{short_title}"))
    }

    /// Pending changes for AI prompts. Empty when AI is off.
    fn diff_for_suggestion(&self) -> String {
        if !self.ctx.suggestions.uses_ai() {
            return String::new();
        }
        self.ctx.vcs.working_diff().unwrap_or_else(|e| {
            warn!("Could not read working tree diff: {e}");
            String::new()
        })
    }

    fn apply_branch_decision(&self, decision: &BranchDecision) -> Result<(), WorkflowError> {
        match decision {
            BranchDecision::CommitToMain => {
                self.ctx.vcs.force_checkout(MAIN_BRANCH)?;
                println!("  [DONE] On {MAIN_BRANCH}");
            }
            BranchDecision::CommitToCurrent(name) => {
                debug!("Committing to current branch '{name}'");
            }
            BranchDecision::CommitToNewBranch(name) => {
                self.ctx
                    .vcs
                    .create_branch(name)
                    .map_err(|source| WorkflowError::BranchCreation {
                        name: name.clone(),
                        source,
                    })?;
                println!("  [DONE] Created branch {name}");
            }
        }
        Ok(())
    }

    /// Staged diff, staging everything first when the index is clean.
    fn stage(&self) -> Result<String, WorkflowError> {
        let diff = self.ctx.vcs.staged_diff()?;
        if !diff.trim().is_empty() {
            return Ok(diff);
        }

        debug!("Nothing staged, staging all changes");
        self.ctx.vcs.stage_all()?;
        let diff = self.ctx.vcs.staged_diff()?;
        if diff.trim().is_empty() {
            return Err(WorkflowError::NothingToCommit);
        }
        println!("  [DONE] Staged all changes");
        Ok(diff)
    }

    async fn dispatch_push(
        &self,
        request: &ChangeRequest,
        diff: &str,
        manual: &ManualFallback,
    ) -> Result<PushChoice, WorkflowError> {
        let current = self.ctx.vcs.current_branch()?;
        let pusher = RetryingPusher::new(self.ctx.vcs);
        let merger = MergeAutomation::new(self.ctx.vcs, self.ctx.prompter);

        if request.auto_push_to_main {
            if current == MAIN_BRANCH {
                pusher.push(MAIN_BRANCH)?;
                return Ok(PushChoice::PushOnly);
            }
            merger.merge_to_main_and_push(&current)?;
            return Ok(PushChoice::PushAndMergeToMain);
        }

        if !self
            .ctx
            .prompter
            .confirm(&format!("Push '{current}' to {ORIGIN}?"), true)?
        {
            println!("  [SKIP] Push");
            return Ok(PushChoice::No);
        }
        pusher.push(&current)?;

        if current == MAIN_BRANCH {
            return Ok(PushChoice::PushOnly);
        }

        if self
            .ctx
            .prompter
            .confirm(&format!("Merge '{current}' into {MAIN_BRANCH}?"), false)?
        {
            merger.merge_to_main_and_push(&current)?;
            return Ok(PushChoice::PushAndMergeToMain);
        }

        let suggestion =
            SuggestionRequest::new(SuggestionKind::PrTitle, diff, &request.description);
        let title = self.ctx.suggestions.suggest(&suggestion, manual).await;
        println!("  Suggested PR title: {title}");
        Ok(PushChoice::PushOnly)
    }
}

/// Explicit type, else the classifier when AI is off, else `feat`.
fn resolve_commit_type(request: &ChangeRequest, diff: &str) -> CommitType {
    match request.commit_type {
        Some(commit_type) => commit_type,
        None if !request.use_ai => classify(diff),
        None => CommitType::default(),
    }
}
