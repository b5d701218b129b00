//! Interactive menu shown when gitpilot runs without arguments.

use std::path::PathBuf;

use crate::cli::Invocation;
use crate::commit::CommitType;
use crate::error::PromptError;
use crate::prompt::Prompter;
use crate::workflow::ChangeRequest;

/// Entries of the top-level menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Commit,
    SetApiKey,
    ShowApiKey,
    CreateBranch,
    SwitchBranch,
    AddWorktree,
    Clone,
    Quit,
}

impl MenuAction {
    pub const ALL: [MenuAction; 8] = [
        MenuAction::Commit,
        MenuAction::SetApiKey,
        MenuAction::ShowApiKey,
        MenuAction::CreateBranch,
        MenuAction::SwitchBranch,
        MenuAction::AddWorktree,
        MenuAction::Clone,
        MenuAction::Quit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::Commit => "Commit changes",
            MenuAction::SetApiKey => "Set AI API key",
            MenuAction::ShowApiKey => "Show API key source",
            MenuAction::CreateBranch => "Create a branch",
            MenuAction::SwitchBranch => "Switch branch",
            MenuAction::AddWorktree => "Add a worktree",
            MenuAction::Clone => "Clone a repository",
            MenuAction::Quit => "Quit",
        }
    }
}

/// Ask what to do and collect its parameters. `None` means quit.
pub fn choose(prompter: &dyn Prompter) -> Result<Option<Invocation>, PromptError> {
    let labels: Vec<String> = MenuAction::ALL.iter().map(|a| a.label().to_string()).collect();
    let index = prompter.select("What do you want to do?", &labels, 0)?;
    let action = MenuAction::ALL
        .get(index)
        .copied()
        .unwrap_or(MenuAction::Quit);
    build_invocation(action, prompter)
}

/// Collect the parameters `action` needs.
pub fn build_invocation(
    action: MenuAction,
    prompter: &dyn Prompter,
) -> Result<Option<Invocation>, PromptError> {
    let invocation = match action {
        MenuAction::Commit => Invocation::Commit(ask_change_request(prompter)?),
        MenuAction::SetApiKey => Invocation::SetKey {
            key: ask_required(prompter, "API key")?,
        },
        MenuAction::ShowApiKey => Invocation::ShowKey,
        MenuAction::CreateBranch => Invocation::CreateBranch {
            name: ask_required(prompter, "New branch name")?,
        },
        MenuAction::SwitchBranch => Invocation::SwitchBranch {
            name: ask_required(prompter, "Branch to switch to")?,
        },
        MenuAction::AddWorktree => Invocation::AddWorktree {
            path: PathBuf::from(ask_required(prompter, "Worktree path")?),
            branch: ask_optional(prompter, "New branch for the worktree (empty for none)")?,
        },
        MenuAction::Clone => Invocation::Clone {
            url: ask_required(prompter, "Repository URL")?,
            dir: ask_optional(prompter, "Target directory (empty for default)")?.map(PathBuf::from),
        },
        MenuAction::Quit => return Ok(None),
    };
    Ok(Some(invocation))
}

fn ask_change_request(prompter: &dyn Prompter) -> Result<ChangeRequest, PromptError> {
    let description = ask_required(prompter, "Describe the change")?;

    let mut types = vec!["auto".to_string()];
    types.extend(CommitType::ALL.iter().map(|t| t.to_string()));
    let type_index = prompter.select("Commit type", &types, 0)?;

    let mut request = ChangeRequest {
        description,
        ..ChangeRequest::default()
    };
    request.commit_type = type_index
        .checked_sub(1)
        .and_then(|i| CommitType::ALL.get(i).copied());
    request.scope = ask_optional(prompter, "Scope (empty for none)")?;
    request.use_ai = prompter.confirm("Generate messages with AI?", false)?;
    request.open_source = prompter.confirm("Name branches after an issue number?", false)?;
    request.skip_branch_prompt = prompter.confirm("Commit straight to main?", false)?;
    request.auto_push_to_main = prompter.confirm("Push to main when done?", false)?;
    request.remote_url = ask_optional(prompter, "Remote URL to add (empty to skip)")?;
    Ok(request)
}

/// Re-ask until the answer is non-blank.
fn ask_required(prompter: &dyn Prompter, prompt: &str) -> Result<String, PromptError> {
    loop {
        let answer = prompter.input(prompt, "")?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
        println!("  A value is required.");
    }
}

fn ask_optional(prompter: &dyn Prompter, prompt: &str) -> Result<Option<String>, PromptError> {
    let answer = prompter.input(prompt, "")?;
    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}
