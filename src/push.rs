//! Push with bounded retry.

use tracing::warn;

use crate::error::{GitError, PushError};
use crate::git::{ORIGIN, Vcs};

/// Total push attempts, including the first.
pub const MAX_PUSH_ATTEMPTS: u32 = 3;

/// Pushes branches to `origin`, retrying immediately on failure.
pub struct RetryingPusher<'a> {
    vcs: &'a dyn Vcs,
    max_attempts: u32,
}

impl<'a> RetryingPusher<'a> {
    pub fn new(vcs: &'a dyn Vcs) -> Self {
        Self {
            vcs,
            max_attempts: MAX_PUSH_ATTEMPTS,
        }
    }

    /// Push `branch`, stopping at the first successful attempt.
    pub fn push(&self, branch: &str) -> Result<(), PushError> {
        let mut last_error: Option<GitError> = None;

        for attempt in 1..=self.max_attempts {
            match self.vcs.push(ORIGIN, branch) {
                Ok(()) => {
                    println!("  [DONE] Pushed {branch} to {ORIGIN}");
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_attempts {
                        warn!(
                            "Push of '{}' failed (attempt {}/{}), retrying: {}",
                            branch, attempt, self.max_attempts, e
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(PushError::RetriesExhausted {
            branch: branch.to_string(),
            attempts: self.max_attempts,
            source: last_error.unwrap_or_else(|| GitError::CommandFailed {
                operation: "push".to_string(),
                stderr: "no attempts made".to_string(),
            }),
        })
    }
}
