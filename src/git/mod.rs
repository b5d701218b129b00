//! Version-control collaborator.
//!
//! Queries go through git2; mutations shell out to the system `git` binary so
//! they inherit the user's git config, SSH agent and credential helpers.

pub mod diff;
pub mod executor;

use std::path::Path;

use crate::error::GitError;

pub use executor::GitCli;

/// Name of the integration branch.
pub const MAIN_BRANCH: &str = "main";

/// Name of the default remote.
pub const ORIGIN: &str = "origin";

/// Repository facts read at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySnapshot {
    pub is_repository: bool,
    pub has_commits: bool,
    pub current_branch: String,
}

impl RepositorySnapshot {
    /// Read all facts. The branch is empty outside a repository.
    pub fn read(vcs: &dyn Vcs) -> Result<Self, GitError> {
        if !vcs.is_repository() {
            return Ok(Self {
                is_repository: false,
                has_commits: false,
                current_branch: String::new(),
            });
        }
        Ok(Self {
            is_repository: true,
            has_commits: vcs.has_commits(),
            current_branch: vcs.current_branch()?,
        })
    }
}

/// Repository queries and mutations used by the workflow.
#[cfg_attr(test, mockall::automock)]
pub trait Vcs: Send + Sync {
    fn is_repository(&self) -> bool;

    /// Whether HEAD resolves to a commit.
    fn has_commits(&self) -> bool;

    /// Short name of the checked-out branch, including unborn branches.
    fn current_branch(&self) -> Result<String, GitError>;

    fn has_remote(&self, name: &str) -> bool;

    /// Unified diff of the index against HEAD.
    fn staged_diff(&self) -> Result<String, GitError>;

    /// Unified diff of staged, unstaged and untracked changes.
    fn working_diff(&self) -> Result<String, GitError>;

    fn init(&self) -> Result<(), GitError>;
    fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError>;

    /// Create or reset `branch` and check it out.
    fn force_checkout(&self, branch: &str) -> Result<(), GitError>;

    /// Create `branch` from HEAD and check it out.
    fn create_branch(&self, branch: &str) -> Result<(), GitError>;

    fn switch_branch(&self, branch: &str) -> Result<(), GitError>;
    fn stage_all(&self) -> Result<(), GitError>;
    fn commit(&self, message: &str) -> Result<(), GitError>;
    fn push(&self, remote: &str, branch: &str) -> Result<(), GitError>;
    fn pull(&self, remote: &str, branch: &str) -> Result<(), GitError>;
    fn merge(&self, branch: &str) -> Result<(), GitError>;
    fn delete_branch(&self, branch: &str) -> Result<(), GitError>;
    fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<(), GitError>;
    fn add_worktree<'b>(&self, path: &Path, branch: Option<&'b str>) -> Result<(), GitError>;
    fn clone_repo<'b>(&self, url: &str, dir: Option<&'b Path>) -> Result<(), GitError>;
}
