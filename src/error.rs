//! Error types for gitpilot modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the credential vault.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("API key cannot be empty")]
    EmptySecret,

    #[error("Encrypted credential is corrupted: {0}")]
    CorruptedData(String),

    #[error("Failed to decrypt credential: wrong encryption key or tampered data")]
    WrongKey,

    #[error("Failed to encrypt credential")]
    EncryptionFailed,

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Credential store command failed: {0}")]
    StoreFailed(String),

    #[error("Could not determine the configuration directory")]
    NoConfigDir,

    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid vault file {path}: {source}")]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to run git {operation}: {source}")]
    SpawnFailed {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {operation} failed: {stderr}")]
    CommandFailed { operation: String, stderr: String },

    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Could not determine the current branch: {0}")]
    CurrentBranch(String),

    #[error("Failed to collect diff: {0}")]
    DiffFailed(#[source] git2::Error),
}

/// Errors from the AI completion collaborator.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("No API key configured. Run `gitpilot config <key>` or set GITPILOT_API_KEY")]
    MissingKey,

    #[error("Completion request failed: {0}")]
    RequestFailed(#[source] reqwest::Error),

    #[error("Completion API returned {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Completion API returned an unreadable response: {0}")]
    InvalidResponse(String),

    #[error("Completion API returned no text")]
    EmptyResponse,

    #[error("Rejected AI suggestion '{value}': {reason}")]
    Rejected { value: String, reason: String },
}

/// Errors from interactive prompts.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Prompt interrupted by the operator")]
    Interrupted,

    #[error("Prompt failed: {0}")]
    Io(String),
}

/// Errors from pushing to the remote.
#[derive(Error, Debug)]
pub enum PushError {
    #[error("Push of '{branch}' failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        branch: String,
        attempts: u32,
        #[source]
        source: GitError,
    },
}

/// Errors from merging a feature branch into main.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Failed to switch to main: {0}")]
    Checkout(#[source] GitError),

    #[error(
        "Merging '{branch}' into main failed: {source}\n\n\
         Resolve the conflicts, then run:\n  \
         git add -A && git commit && git push origin main"
    )]
    Conflict {
        branch: String,
        #[source]
        source: GitError,
    },

    #[error("Failed to add remote 'origin': {0}")]
    AddRemote(#[source] GitError),

    #[error("Failed to push main: {0}")]
    Push(#[source] PushError),

    #[error("Failed to delete local branch '{branch}': {source}")]
    DeleteBranch {
        branch: String,
        #[source]
        source: GitError,
    },

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Errors that abort a workflow run.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(
        "Could not initialize a git repository: {0}\n\n\
         Check directory permissions, or run `git init` manually."
    )]
    RepositoryInit(#[source] GitError),

    #[error(
        "No changes to commit (working tree is clean)\n\n\
         Make some changes first, then check them with `git status`."
    )]
    NothingToCommit,

    #[error("Failed to create branch '{name}': {source}")]
    BranchCreation {
        name: String,
        #[source]
        source: GitError,
    },

    #[error("Commit description cannot be empty")]
    EmptyDescription,

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Push(#[from] PushError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}
