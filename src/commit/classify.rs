//! Heuristic commit type from a staged diff.
//!
//! A fixed priority list, first match wins:
//! file patterns (docs, chore, test, style), then keywords in the diff body
//! (fix, feat), then `feat`.

use std::sync::LazyLock;

use regex_lite::Regex;

use super::CommitType;

static FILE_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^diff --git a/.* b/(.+)$").unwrap());

const FIX_KEYWORDS: &[&str] = &[
    "fix", "bug", "error", "issue", "resolve", "patch", "repair", "correct", "crash",
];

const FEAT_KEYWORDS: &[&str] = &["add", "new", "create", "implement", "feature", "introduce"];

const LOCK_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "cargo.lock",
    "gemfile.lock",
    "poetry.lock",
    "composer.lock",
    "go.sum",
];

const CONFIG_FILES: &[&str] = &[
    "package.json",
    "cargo.toml",
    ".gitignore",
    ".npmrc",
    ".nvmrc",
    ".editorconfig",
    ".dockerignore",
];

const STYLE_EXTENSIONS: &[&str] = &[".css", ".scss", ".sass", ".less", ".styl"];

/// Classify a staged diff into a conventional commit type.
///
/// Pure function of the diff text. Matching is case-insensitive.
pub fn classify(diff: &str) -> CommitType {
    if diff.trim().is_empty() {
        return CommitType::Feat;
    }

    let paths = changed_paths(diff);
    let rules: [(fn(&str) -> bool, CommitType); 4] = [
        (is_docs_file, CommitType::Docs),
        (is_chore_file, CommitType::Chore),
        (is_test_file, CommitType::Test),
        (is_style_file, CommitType::Style),
    ];
    for (is_match, commit_type) in rules {
        if paths.iter().any(|p| is_match(p)) {
            return commit_type;
        }
    }

    let text = diff.to_lowercase();
    if FIX_KEYWORDS.iter().any(|k| text.contains(k)) {
        return CommitType::Fix;
    }
    if FEAT_KEYWORDS.iter().any(|k| text.contains(k)) {
        return CommitType::Feat;
    }

    CommitType::Feat
}

/// Lowercased destination paths from the per-file diff headers.
fn changed_paths(diff: &str) -> Vec<String> {
    FILE_HEADER_RE
        .captures_iter(diff)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('\r').to_lowercase())
        .collect()
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn has_dir(path: &str, dir: &str) -> bool {
    path.split('/').rev().skip(1).any(|component| component == dir)
}

fn is_docs_file(path: &str) -> bool {
    let name = file_name(path);
    [".md", ".mdx", ".rst", ".adoc"]
        .iter()
        .any(|ext| name.ends_with(ext))
        || has_dir(path, "docs")
        || ["readme", "changelog", "license", "contributing"]
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

fn is_chore_file(path: &str) -> bool {
    let name = file_name(path);
    LOCK_FILES.contains(&name)
        || CONFIG_FILES.contains(&name)
        || name == ".env"
        || name.starts_with(".env.")
        || name.starts_with(".eslintrc")
        || name.starts_with(".prettierrc")
        || (name.starts_with("tsconfig") && name.ends_with(".json"))
        || name.contains(".config.")
}

fn is_test_file(path: &str) -> bool {
    let name = file_name(path);
    name.contains(".test.")
        || name.contains(".spec.")
        || name.contains("_test.")
        || name.starts_with("test_")
        || ["test", "tests", "__tests__", "spec"]
            .iter()
            .any(|dir| has_dir(path, dir))
}

fn is_style_file(path: &str) -> bool {
    let name = file_name(path);
    STYLE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}
