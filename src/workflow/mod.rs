//! The commit workflow: from a change description to a pushed commit.

pub mod orchestrator;

use std::fmt;

use crate::commit::CommitType;
use crate::error::WorkflowError;

pub use orchestrator::{RunContext, WorkflowOrchestrator};

/// What the operator asked for. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeRequest {
    pub description: String,
    pub commit_type: Option<CommitType>,
    pub scope: Option<String>,
    pub use_ai: bool,
    pub open_source: bool,
    pub skip_branch_prompt: bool,
    pub auto_push_to_main: bool,
    pub remote_url: Option<String>,
}

impl ChangeRequest {
    /// Request with a trimmed, non-empty description and default options.
    pub fn new(description: &str) -> Result<Self, WorkflowError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(WorkflowError::EmptyDescription);
        }
        Ok(Self {
            description: description.to_string(),
            ..Self::default()
        })
    }

    /// Scope with blank values treated as absent.
    pub fn scope(&self) -> Option<String> {
        self.scope
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Where the commit lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchDecision {
    CommitToMain,
    CommitToCurrent(String),
    CommitToNewBranch(String),
}

/// What happens after committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushChoice {
    No,
    PushOnly,
    PushAndMergeToMain,
}

/// The finished plan of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPlan {
    pub branch_decision: BranchDecision,
    pub commit_message: String,
    pub push_choice: PushChoice,
}

/// States of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkflowState {
    Start,
    RepoEnsured,
    RemoteEnsured,
    CommitHistoryChecked,
    BranchDecided,
    Staged,
    MessageGenerated,
    Committed,
    PushDecided,
    Done,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Start => "start",
            WorkflowState::RepoEnsured => "repo-ensured",
            WorkflowState::RemoteEnsured => "remote-ensured",
            WorkflowState::CommitHistoryChecked => "commit-history-checked",
            WorkflowState::BranchDecided => "branch-decided",
            WorkflowState::Staged => "staged",
            WorkflowState::MessageGenerated => "message-generated",
            WorkflowState::Committed => "committed",
            WorkflowState::PushDecided => "push-decided",
            WorkflowState::Done => "done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_blank_description() {
        assert!(matches!(
            ChangeRequest::new("   "),
            Err(WorkflowError::EmptyDescription)
        ));
    }

    #[test]
    fn test_request_trims_description() {
        let request = ChangeRequest::new("  fix login bug ").unwrap();
        assert_eq!(request.description, "fix login bug");
        assert!(!request.use_ai);
        assert!(request.commit_type.is_none());
    }

    #[test]
    fn test_blank_scope_is_absent() {
        let mut request = ChangeRequest::new("x").unwrap();
        request.scope = Some(" ".to_string());
        assert_eq!(request.scope(), None);
        request.scope = Some(" auth ".to_string());
        assert_eq!(request.scope().as_deref(), Some("auth"));
    }
}
