//! gitpilot - CLI entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use gitpilot::ai::{GeminiClient, SuggestionGenerator};
use gitpilot::cli::{Cli, Invocation};
use gitpilot::config::{API_KEY_ENV_VAR, AppConfig, LOG_ENV_VAR};
use gitpilot::git::{GitCli, Vcs};
use gitpilot::menu;
use gitpilot::prompt::TerminalPrompter;
use gitpilot::vault::{CredentialVault, KeyOrigin, KeySource};
use gitpilot::workflow::{ChangeRequest, RunContext, WorkflowOrchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::from_env();
    let prompter = TerminalPrompter::new();

    let invocation = match cli.into_invocation()? {
        Invocation::Menu => match menu::choose(&prompter).context("Menu cancelled")? {
            Some(invocation) => {
                println!("Running: {}", invocation.to_command_line());
                invocation
            }
            None => return Ok(()),
        },
        invocation => invocation,
    };

    let vcs = GitCli::current_dir();
    match invocation {
        Invocation::Commit(request) => run_workflow(&config, &vcs, &prompter, &request).await,
        Invocation::SetKey { key } => set_key(&config, &key),
        Invocation::ShowKey => {
            show_key(&config);
            Ok(())
        }
        Invocation::CreateBranch { name } => {
            vcs.create_branch(&name)
                .with_context(|| format!("Failed to create branch '{name}'"))?;
            println!("  [DONE] Created and switched to {name}");
            Ok(())
        }
        Invocation::SwitchBranch { name } => {
            vcs.switch_branch(&name)
                .with_context(|| format!("Failed to switch to '{name}'"))?;
            println!("  [DONE] Switched to {name}");
            Ok(())
        }
        Invocation::AddWorktree { path, branch } => {
            vcs.add_worktree(&path, branch.as_deref())
                .with_context(|| format!("Failed to add worktree at {}", path.display()))?;
            println!("  [DONE] Added worktree at {}", path.display());
            Ok(())
        }
        Invocation::Clone { url, dir } => {
            vcs.clone_repo(&url, dir.as_deref())
                .with_context(|| format!("Failed to clone {url}"))?;
            println!("  [DONE] Cloned {url}");
            Ok(())
        }
        Invocation::Menu => Ok(()),
    }
}

/// Log to stderr without timestamps.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(format!("gitpilot={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

async fn run_workflow(
    config: &AppConfig,
    vcs: &GitCli,
    prompter: &TerminalPrompter,
    request: &ChangeRequest,
) -> Result<()> {
    let api_key = if request.use_ai {
        let key = CredentialVault::new(config).resolve_key();
        if key.is_none() {
            warn!(
                "No API key configured, using manual messages. \
                 Run `gitpilot config <key>` to set one."
            );
        }
        key
    } else {
        None
    };

    let client = GeminiClient::new(config).context("Failed to create the completion client")?;
    let suggestions = SuggestionGenerator::new(Arc::new(client), api_key, request.use_ai);

    let mut orchestrator = WorkflowOrchestrator::new(RunContext {
        vcs,
        prompter,
        suggestions: &suggestions,
    });
    let plan = orchestrator
        .run(request)
        .await
        .with_context(|| format!("Workflow stopped at {}", orchestrator.state()))?;

    println!();
    println!("Committed: {}", plan.commit_message);
    Ok(())
}

fn set_key(config: &AppConfig, key: &str) -> Result<()> {
    let outcome = CredentialVault::new(config)
        .persist_key(key)
        .context("Failed to save the API key")?;

    println!("  [DONE] API key saved to {}", outcome.source.as_str());
    if outcome.key_origin == Some(KeyOrigin::MachineDerived) {
        println!("  [WARN] The file is encrypted with a machine-derived key");
    }
    Ok(())
}

fn show_key(config: &AppConfig) {
    match CredentialVault::new(config).status() {
        Some(KeySource::Environment) => {
            println!("API key: set via the {API_KEY_ENV_VAR} environment variable")
        }
        Some(source) => println!("API key: stored in the {}", source.as_str()),
        None => println!("API key: not configured. Run `gitpilot config <key>` to set one."),
    }
}
