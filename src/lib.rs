//! gitpilot - automates the commit, branch and push cycle.
//!
//! # Overview
//!
//! gitpilot stages the working tree, writes a conventional commit message
//! (with an AI completion API or from a heuristic formula), optionally moves
//! the work onto a new branch, then pushes and merges into main on request.
//! The API key lives in an environment variable, the system credential store
//! or an AES-GCM encrypted file in the per-user config directory.

pub mod ai;
pub mod cli;
pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod menu;
pub mod merge;
pub mod prompt;
pub mod push;
pub mod vault;
pub mod workflow;

// Re-export commonly used types
pub use commit::CommitType;
pub use error::{AiError, GitError, MergeError, PromptError, PushError, VaultError, WorkflowError};
pub use vault::{CredentialVault, KeySource};
pub use workflow::{BranchDecision, ChangeRequest, CommitPlan, PushChoice, WorkflowOrchestrator};
