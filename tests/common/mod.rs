//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use async_trait::async_trait;
use git2::{Repository, RepositoryInitOptions};

use gitpilot::ai::CompletionClient;
use gitpilot::error::{AiError, PromptError};
use gitpilot::git::GitCli;
use gitpilot::prompt::Prompter;

/// Run git in `dir`, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A test git repository on `main`, optionally with a bare `origin`.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
    origin: Option<tempfile::TempDir>,
}

impl TestRepo {
    /// Create an empty repository whose unborn branch is `main`.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).expect("Failed to init git repo");
        git(dir.path(), &["config", "user.name", "Test User"]);
        git(dir.path(), &["config", "user.email", "test@example.com"]);
        Self {
            dir,
            repo,
            origin: None,
        }
    }

    /// Repository with one commit on `main`.
    pub fn with_initial_commit() -> Self {
        let repo = Self::new();
        repo.write("README.md", "# demo\n");
        git(repo.path(), &["add", "-A"]);
        git(repo.path(), &["commit", "-m", "chore: initial commit"]);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn vcs(&self) -> GitCli {
        GitCli::new(self.path())
    }

    /// Write a file relative to the working tree.
    pub fn write(&self, name: &str, content: &str) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(path, content).expect("Failed to write test file");
    }

    /// Add a bare repository as `origin` and push `main` to it.
    pub fn with_origin(mut self) -> Self {
        let origin = tempfile::tempdir().expect("Failed to create temp directory");
        git(origin.path(), &["init", "--bare", "--initial-branch=main"]);
        let url = origin.path().to_string_lossy().to_string();
        git(self.path(), &["remote", "add", "origin", &url]);
        git(self.path(), &["push", "-u", "origin", "main"]);
        self.origin = Some(origin);
        self
    }

    pub fn origin_path(&self) -> Option<PathBuf> {
        self.origin.as_ref().map(|o| o.path().to_path_buf())
    }

    pub fn head_message(&self) -> String {
        git(self.path(), &["log", "-1", "--format=%s"])
    }

    pub fn current_branch(&self) -> String {
        git(self.path(), &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn commit_count(&self) -> usize {
        git(self.path(), &["rev-list", "--count", "HEAD"])
            .parse()
            .expect("Failed to parse commit count")
    }

    /// Subject of the latest commit on `branch` in the bare origin.
    pub fn origin_head_message(&self, branch: &str) -> Option<String> {
        let origin = self.origin.as_ref()?;
        Some(git(origin.path(), &["log", "-1", "--format=%s", branch]))
    }

    pub fn has_local_branch(&self, branch: &str) -> bool {
        self.repo
            .find_branch(branch, git2::BranchType::Local)
            .is_ok()
    }
}

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Answer {
    Select(usize),
    Input(String),
    Confirm(bool),
}

/// A prompter that replays answers in order and records the prompts.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn next(&self, prompt: &str) -> Answer {
        self.asked.lock().unwrap().push(prompt.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("Unexpected prompt: {prompt}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn select(
        &self,
        prompt: &str,
        items: &[String],
        _default: usize,
    ) -> Result<usize, PromptError> {
        match self.next(prompt) {
            Answer::Select(i) if i < items.len() => Ok(i),
            other => panic!("Expected a select answer for {prompt:?}, got {other:?}"),
        }
    }

    fn input(&self, prompt: &str, initial: &str) -> Result<String, PromptError> {
        match self.next(prompt) {
            // An empty scripted answer accepts the pre-filled text
            Answer::Input(text) if text.is_empty() => Ok(initial.to_string()),
            Answer::Input(text) => Ok(text),
            other => panic!("Expected an input answer for {prompt:?}, got {other:?}"),
        }
    }

    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool, PromptError> {
        match self.next(prompt) {
            Answer::Confirm(yes) => Ok(yes),
            other => panic!("Expected a confirm answer for {prompt:?}, got {other:?}"),
        }
    }
}

/// A completion client with canned replies. `None` replies fail.
pub struct CannedCompletion {
    replies: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl CannedCompletion {
    pub fn new(replies: Vec<Option<&str>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for CannedCompletion {
    async fn complete(&self, _api_key: &str, prompt: &str) -> Result<String, AiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(AiError::EmptyResponse),
            None => Err(AiError::InvalidResponse("no canned reply left".to_string())),
        }
    }
}
