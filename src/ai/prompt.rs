//! Prompt construction for suggestions.

use std::sync::LazyLock;

use regex_lite::Regex;

use super::{SuggestionKind, SuggestionRequest};

/// Maximum length for sanitized diff text.
pub const MAX_DIFF_SANITIZED_LENGTH: usize = 30_000;

static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").unwrap());

static INJECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        concat!(
            r"(?i)(ignore|disregard|forget)\s+(all\s+)?(the\s+)?(previous|prior|above)\s+",
            r"(instructions|prompts?|rules)|you\s+are\s+now\s+|new\s+system\s+prompt|</?system>",
        ),
    )
    .unwrap()
});

static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{4,}").unwrap());

/// Build the completion prompt for one suggestion.
///
/// Embeds a role preamble, the formatting rules, the operator's description
/// and the sanitized diff, and asks for the bare value only.
pub fn build_prompt(request: &SuggestionRequest) -> String {
    let (role, task) = match request.kind {
        SuggestionKind::CommitMessage => (
            "You write Git commit messages following the Conventional Commits specification.",
            "Write a single-line commit subject in the form `type(scope): description`. \
             Type is one of feat, fix, docs, style, refactor, perf, test, build, ci, chore. \
             Use the imperative mood and no trailing period.",
        ),
        SuggestionKind::BranchName => (
            "You name Git branches.",
            "Write a branch name in the form `type/short-description` using a conventional \
             commit type as the prefix.",
        ),
        SuggestionKind::PrTitle => (
            "You write pull request titles.",
            "Write a pull request title in the form `type(scope): description` that \
             summarises the change for reviewers.",
        ),
        SuggestionKind::ShortTitle => (
            "You write short slugs for issue branches.",
            "Write a short hyphen-separated slug of two to five words describing the change.",
        ),
    };

    let rules = request
        .constraints
        .describe()
        .into_iter()
        .map(|r| format!("- {r}"))
        .collect::<Vec<_>>()
        .join("\n");

    let description = sanitize_diff(&request.description, 500);
    let diff = sanitize_diff(&request.diff_text, MAX_DIFF_SANITIZED_LENGTH);
    let diff_section = if diff.trim().is_empty() {
        "(no diff available)".to_string()
    } else {
        diff
    };

    format!(
        r#"{role}

## Task
{task}

## Rules (STRICT)
{rules}

## Change Description
{description}

## Diff
```
{diff_section}
```

## Output Format
Respond with ONLY the {label}. No quotes, no markdown, no explanation."#,
        label = request.kind.label(),
    )
}

/// Sanitize diff text for inclusion in a prompt.
///
/// Removes control characters (except newlines and tabs) and ANSI escape
/// sequences, filters known prompt injection phrases, collapses long runs of
/// blank lines and truncates on a char boundary.
pub fn sanitize_diff(text: &str, max_len: usize) -> String {
    let without_ansi = ANSI_RE.replace_all(text, "");
    let without_control: String = without_ansi
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect();
    let filtered = INJECTION_RE.replace_all(&without_control, "[filtered]");
    let mut result = BLANK_LINES_RE.replace_all(&filtered, "\n\n\n").into_owned();

    if result.len() > max_len {
        let mut end = max_len;
        while end > 0 && !result.is_char_boundary(end) {
            end -= 1;
        }
        result.truncate(end);
    }

    result
}
