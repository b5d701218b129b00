//! Operator prompts.

use std::io::ErrorKind;

use dialoguer::{Confirm, Input, Select};

use crate::error::PromptError;

/// Trait for asking the operator a question.
///
/// This abstraction allows scripting the answers in tests.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter: Send + Sync {
    /// Pick one of `items`, returning its index.
    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, PromptError>;

    /// Free text, pre-filled with `initial`. May return an empty string.
    fn input(&self, prompt: &str, initial: &str) -> Result<String, PromptError>;

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PromptError>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

fn map_err(e: dialoguer::Error) -> PromptError {
    match e {
        dialoguer::Error::IO(io) if io.kind() == ErrorKind::Interrupted => {
            PromptError::Interrupted
        }
        other => PromptError::Io(other.to_string()),
    }
}

impl Prompter for TerminalPrompter {
    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, PromptError> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .map_err(map_err)
    }

    fn input(&self, prompt: &str, initial: &str) -> Result<String, PromptError> {
        Input::<String>::new()
            .with_prompt(prompt)
            .with_initial_text(initial)
            .allow_empty(true)
            .interact_text()
            .map_err(map_err)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PromptError> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(map_err)
    }
}
