//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commit::CommitType;
use crate::error::WorkflowError;
use crate::workflow::ChangeRequest;

/// Commit, branch and push with AI-written messages.
#[derive(Parser, Debug)]
#[command(name = "gitpilot")]
#[command(about = "Commit, branch and push with AI-written messages")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub commit: CommitArgs,

    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Args, Debug, Default, Clone)]
pub struct CommitArgs {
    /// Description of the change
    pub description: Option<String>,

    /// Conventional commit type (feat, fix, docs, ...)
    #[arg(short = 't', long = "type")]
    pub commit_type: Option<CommitType>,

    /// Conventional commit scope
    #[arg(short, long)]
    pub scope: Option<String>,

    /// Generate messages and names with AI
    #[arg(long)]
    pub ai: bool,

    /// Name new branches after an issue number
    #[arg(long)]
    pub open_source: bool,

    /// Commit straight to main without asking about branches
    #[arg(long)]
    pub skip_branch: bool,

    /// Push to main after committing, merging if on another branch
    #[arg(long)]
    pub push_main: bool,

    /// Add this URL as the `origin` remote first
    #[arg(short = 'r', long = "remote")]
    pub remote: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Store the AI API key, or show where it comes from
    Config {
        /// API key to store
        #[arg(required_unless_present = "show")]
        key: Option<String>,

        /// Report which source currently provides the key
        #[arg(long, conflicts_with = "key")]
        show: bool,
    },
    /// Create a branch and switch to it
    Branch {
        name: String,
    },
    /// Switch to an existing branch
    Switch {
        name: String,
    },
    /// Add a worktree
    Worktree {
        path: PathBuf,

        /// Create this branch in the new worktree
        #[arg(short, long)]
        branch: Option<String>,
    },
    /// Clone a repository
    Clone {
        url: String,
        dir: Option<PathBuf>,
    },
}

/// A fully specified action, from arguments or the interactive menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Commit(ChangeRequest),
    SetKey { key: String },
    ShowKey,
    CreateBranch { name: String },
    SwitchBranch { name: String },
    AddWorktree { path: PathBuf, branch: Option<String> },
    Clone { url: String, dir: Option<PathBuf> },
    /// No arguments: ask what to do.
    Menu,
}

impl Cli {
    pub fn into_invocation(self) -> Result<Invocation, WorkflowError> {
        let invocation = match self.command {
            Some(Commands::Config { show: true, .. }) => Invocation::ShowKey,
            Some(Commands::Config { key, .. }) => Invocation::SetKey {
                key: key.unwrap_or_default(),
            },
            Some(Commands::Branch { name }) => Invocation::CreateBranch { name },
            Some(Commands::Switch { name }) => Invocation::SwitchBranch { name },
            Some(Commands::Worktree { path, branch }) => Invocation::AddWorktree { path, branch },
            Some(Commands::Clone { url, dir }) => Invocation::Clone { url, dir },
            None => match self.commit.description.as_deref() {
                Some(description) => {
                    let args = self.commit.clone();
                    let mut request = ChangeRequest::new(description)?;
                    request.commit_type = args.commit_type;
                    request.scope = args.scope;
                    request.use_ai = args.ai;
                    request.open_source = args.open_source;
                    request.skip_branch_prompt = args.skip_branch;
                    request.auto_push_to_main = args.push_main;
                    request.remote_url = args.remote;
                    Invocation::Commit(request)
                }
                None => Invocation::Menu,
            },
        };
        Ok(invocation)
    }
}

impl Invocation {
    /// The equivalent command line, with the API key masked.
    pub fn to_command_line(&self) -> String {
        let mut parts = vec!["gitpilot".to_string()];
        match self {
            Invocation::Commit(request) => {
                parts.push(quote(&request.description));
                if let Some(commit_type) = request.commit_type {
                    parts.extend(["-t".to_string(), commit_type.to_string()]);
                }
                if let Some(scope) = request.scope() {
                    parts.extend(["-s".to_string(), quote(&scope)]);
                }
                let flags = [
                    (request.use_ai, "--ai"),
                    (request.open_source, "--open-source"),
                    (request.skip_branch_prompt, "--skip-branch"),
                    (request.auto_push_to_main, "--push-main"),
                ];
                parts.extend(flags.iter().filter(|(on, _)| *on).map(|(_, f)| f.to_string()));
                if let Some(url) = &request.remote_url {
                    parts.extend(["-r".to_string(), quote(url)]);
                }
            }
            Invocation::SetKey { key } => {
                parts.extend(["config".to_string(), mask_key(key)]);
            }
            Invocation::ShowKey => parts.extend(["config".to_string(), "--show".to_string()]),
            Invocation::CreateBranch { name } => {
                parts.extend(["branch".to_string(), quote(name)]);
            }
            Invocation::SwitchBranch { name } => {
                parts.extend(["switch".to_string(), quote(name)]);
            }
            Invocation::AddWorktree { path, branch } => {
                parts.extend([
                    "worktree".to_string(),
                    quote(&path.to_string_lossy()),
                ]);
                if let Some(branch) = branch {
                    parts.extend(["-b".to_string(), quote(branch)]);
                }
            }
            Invocation::Clone { url, dir } => {
                parts.extend(["clone".to_string(), quote(url)]);
                if let Some(dir) = dir {
                    parts.push(quote(&dir.to_string_lossy()));
                }
            }
            Invocation::Menu => {}
        }
        parts.join(" ")
    }
}

/// Show the last four characters of a key at most.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

fn quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@#=+,".contains(c))
    {
        arg.to_string()
    } else {
        format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
    }
}
