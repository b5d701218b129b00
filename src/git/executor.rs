//! The default [`Vcs`] backed by git2 and the system `git` binary.

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{ErrorCode, Repository};
use tracing::debug;

use super::{Vcs, diff};
use crate::error::GitError;

/// Git access rooted at a working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Git access for the process working directory.
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    fn open(&self) -> Result<Repository, GitError> {
        Repository::discover(&self.workdir).map_err(GitError::OpenRepository)
    }

    /// Run a git command in the working directory and return its stdout.
    fn run_git(&self, args: &[&str], operation: &str) -> Result<String, GitError> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.workdir)
            .args(args)
            .output()
            .map_err(|source| GitError::SpawnFailed {
                operation: operation.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::CommandFailed {
                operation: operation.to_string(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Vcs for GitCli {
    fn is_repository(&self) -> bool {
        self.open().is_ok()
    }

    fn has_commits(&self) -> bool {
        let Ok(repo) = self.open() else {
            return false;
        };
        repo.head().and_then(|h| h.peel_to_commit()).is_ok()
    }

    fn current_branch(&self) -> Result<String, GitError> {
        let repo = self.open()?;
        let name = match repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().map(str::to_string),
            // Detached HEAD, same as `git rev-parse --abbrev-ref HEAD`
            Ok(_) => Some("HEAD".to_string()),
            Err(e) if e.code() == ErrorCode::UnbornBranch => repo
                .find_reference("HEAD")
                .ok()
                .and_then(|r| r.symbolic_target().map(str::to_string))
                .map(|target| {
                    target
                        .strip_prefix("refs/heads/")
                        .unwrap_or(&target)
                        .to_string()
                }),
            Err(e) => return Err(GitError::CurrentBranch(e.message().to_string())),
        };

        name.ok_or_else(|| GitError::CurrentBranch("HEAD is not valid UTF-8".to_string()))
    }

    fn has_remote(&self, name: &str) -> bool {
        self.open()
            .map(|repo| repo.find_remote(name).is_ok())
            .unwrap_or(false)
    }

    fn staged_diff(&self) -> Result<String, GitError> {
        diff::staged(&self.open()?)
    }

    fn working_diff(&self) -> Result<String, GitError> {
        diff::working(&self.open()?)
    }

    fn init(&self) -> Result<(), GitError> {
        self.run_git(&["init"], "init").map(|_| ())
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.run_git(&["remote", "add", name, url], "remote add")
            .map(|_| ())
    }

    fn force_checkout(&self, branch: &str) -> Result<(), GitError> {
        self.run_git(&["checkout", "-B", branch], "checkout -B")
            .map(|_| ())
    }

    fn create_branch(&self, branch: &str) -> Result<(), GitError> {
        self.run_git(&["checkout", "-b", branch], "checkout -b")
            .map(|_| ())
    }

    fn switch_branch(&self, branch: &str) -> Result<(), GitError> {
        self.run_git(&["checkout", branch], "checkout").map(|_| ())
    }

    fn stage_all(&self) -> Result<(), GitError> {
        self.run_git(&["add", "-A"], "add").map(|_| ())
    }

    fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run_git(&["commit", "-m", message], "commit").map(|_| ())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run_git(&["push", "-u", remote, branch], "push")
            .map(|_| ())
    }

    fn pull(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run_git(&["pull", "--no-rebase", remote, branch], "pull")
            .map(|_| ())
    }

    fn merge(&self, branch: &str) -> Result<(), GitError> {
        self.run_git(&["merge", "--no-edit", branch], "merge")
            .map(|_| ())
    }

    fn delete_branch(&self, branch: &str) -> Result<(), GitError> {
        self.run_git(&["branch", "-d", branch], "branch -d")
            .map(|_| ())
    }

    fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run_git(&["push", remote, "--delete", branch], "push --delete")
            .map(|_| ())
    }

    fn add_worktree<'b>(&self, path: &Path, branch: Option<&'b str>) -> Result<(), GitError> {
        let path = path.to_string_lossy();
        let mut args = vec!["worktree", "add"];
        if let Some(branch) = branch {
            args.extend(["-b", branch]);
        }
        args.push(&*path);
        self.run_git(&args, "worktree add").map(|_| ())
    }

    fn clone_repo<'b>(&self, url: &str, dir: Option<&'b Path>) -> Result<(), GitError> {
        let dir = dir.map(|d| d.to_string_lossy());
        let mut args = vec!["clone", url];
        if let Some(dir) = dir.as_deref() {
            args.push(dir);
        }
        self.run_git(&args, "clone").map(|_| ())
    }
}
