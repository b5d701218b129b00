//! Suggestion pipeline: one AI attempt, else the manual formula.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::client::CompletionClient;
use super::prompt::build_prompt;
use super::{SuggestionKind, SuggestionRequest};
use crate::commit::CommitType;
use crate::error::AiError;
use crate::vault::Secret;

/// Inputs of the deterministic manual formulas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualFallback {
    pub commit_type: CommitType,
    pub scope: Option<String>,
    pub description: String,
    pub date: NaiveDate,
}

impl ManualFallback {
    /// Fallback dated today in local time.
    pub fn today(commit_type: CommitType, scope: Option<String>, description: &str) -> Self {
        Self {
            commit_type,
            scope,
            description: description.trim().to_string(),
            date: chrono::Local::now().date_naive(),
        }
    }

    /// `type(scope): description`, scope omitted when empty.
    pub fn commit_message(&self) -> String {
        match self.scope.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(scope) => format!("{}({}): {}", self.commit_type, scope, self.description),
            None => format!("{}: {}", self.commit_type, self.description),
        }
    }

    /// `type/slug-YYYY-MM-DD`.
    pub fn branch_name(&self) -> String {
        format!(
            "{}/{}-{}",
            self.commit_type,
            slugify(&self.description),
            self.date.format("%Y-%m-%d")
        )
    }

    pub fn pr_title(&self) -> String {
        self.commit_message()
    }

    /// Lowercased, hyphen-joined description with other symbols stripped.
    pub fn short_title(&self) -> String {
        slugify(&self.description)
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect()
    }

    pub fn render(&self, kind: SuggestionKind) -> String {
        match kind {
            SuggestionKind::CommitMessage => self.commit_message(),
            SuggestionKind::BranchName => self.branch_name(),
            SuggestionKind::PrTitle => self.pr_title(),
            SuggestionKind::ShortTitle => self.short_title(),
        }
    }
}

/// Lowercase and replace each whitespace run with a single hyphen.
pub fn slugify(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Produces suggestions for one run.
///
/// The API key is resolved once by the caller and held here for the run.
pub struct SuggestionGenerator {
    client: Arc<dyn CompletionClient>,
    api_key: Option<Secret>,
    use_ai: bool,
}

impl SuggestionGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, api_key: Option<Secret>, use_ai: bool) -> Self {
        Self {
            client,
            api_key,
            use_ai,
        }
    }

    /// Generator that always uses the manual formulas.
    pub fn manual_only(client: Arc<dyn CompletionClient>) -> Self {
        Self::new(client, None, false)
    }

    pub fn uses_ai(&self) -> bool {
        self.use_ai
    }

    /// Suggest a value. Never fails: any AI problem yields the manual formula.
    pub async fn suggest(&self, request: &SuggestionRequest, manual: &ManualFallback) -> String {
        if !self.use_ai {
            return manual.render(request.kind);
        }

        match self.attempt_ai(request).await {
            Ok(value) => {
                debug!(kind = request.kind.label(), %value, "Using AI suggestion");
                value
            }
            Err(e) => {
                warn!("AI {} unavailable, using manual fallback: {e}", request.kind.label());
                manual.render(request.kind)
            }
        }
    }

    async fn attempt_ai(&self, request: &SuggestionRequest) -> Result<String, AiError> {
        let api_key = self.api_key.as_ref().ok_or(AiError::MissingKey)?;
        let raw = self.client.complete(api_key, &build_prompt(request)).await?;

        if !request.kind.enforces_constraints() {
            let value = clean_text(&raw);
            if value.is_empty() {
                return Err(AiError::EmptyResponse);
            }
            return Ok(value);
        }

        let value = clean_line(&raw, request.constraints.lowercase);
        request
            .constraints
            .validate(&value)
            .map_err(|reason| AiError::Rejected {
                value: value.clone(),
                reason,
            })?;
        Ok(value)
    }
}

/// The whole response without code fences or wrapping quotes.
fn clean_text(raw: &str) -> String {
    let text = raw
        .lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");
    strip_wrapping(text.trim()).to_string()
}

/// First non-empty line without wrapping quotes or backticks.
fn clean_line(raw: &str, lowercase: bool) -> String {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("```"))
        .unwrap_or("");

    let value = strip_wrapping(line);
    if lowercase {
        value.to_lowercase()
    } else {
        value.to_string()
    }
}

fn strip_wrapping(mut value: &str) -> &str {
    loop {
        let stripped = ['"', '\'', '`']
            .iter()
            .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)));
        match stripped {
            Some(inner) => value = inner.trim(),
            None => return value,
        }
    }
}
