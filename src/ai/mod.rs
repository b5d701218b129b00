//! AI-generated commit messages, branch names and PR titles with manual
//! fallback.

pub mod client;
pub mod prompt;
pub mod suggest;

pub use client::{CompletionClient, GeminiClient};
pub use prompt::{build_prompt, sanitize_diff};
pub use suggest::{ManualFallback, SuggestionGenerator};

/// What is being suggested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    CommitMessage,
    BranchName,
    PrTitle,
    /// Short slug used in issue branch names.
    ShortTitle,
}

impl SuggestionKind {
    pub fn label(&self) -> &'static str {
        match self {
            SuggestionKind::CommitMessage => "commit message",
            SuggestionKind::BranchName => "branch name",
            SuggestionKind::PrTitle => "pull request title",
            SuggestionKind::ShortTitle => "short title",
        }
    }

    /// Whether AI output must pass [`Constraints::validate`]. Commit messages
    /// and PR titles are free text whose limits only guide the prompt.
    pub fn enforces_constraints(&self) -> bool {
        matches!(self, SuggestionKind::BranchName | SuggestionKind::ShortTitle)
    }

    /// Format rules for this kind.
    pub fn constraints(&self) -> Constraints {
        match self {
            SuggestionKind::CommitMessage | SuggestionKind::PrTitle => Constraints {
                max_len: 72,
                lowercase: false,
                charset: Charset::Any,
                separator: None,
            },
            SuggestionKind::BranchName => Constraints {
                max_len: 50,
                lowercase: true,
                charset: Charset::BranchName,
                separator: Some('/'),
            },
            SuggestionKind::ShortTitle => Constraints {
                max_len: 30,
                lowercase: true,
                charset: Charset::Slug,
                separator: None,
            },
        }
    }
}

/// Characters a suggestion may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Any single line of printable text.
    Any,
    /// `[a-z0-9/#-]`
    BranchName,
    /// `[a-z0-9-]`
    Slug,
}

impl Charset {
    pub fn allows(&self, c: char) -> bool {
        match self {
            Charset::Any => !c.is_control(),
            Charset::BranchName => {
                c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '/' | '#' | '-')
            }
            Charset::Slug => c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-',
        }
    }

    fn describe(&self) -> Option<&'static str> {
        match self {
            Charset::Any => None,
            Charset::BranchName => Some("only a-z, 0-9, '/', '#' and '-'"),
            Charset::Slug => Some("only a-z, 0-9 and '-'"),
        }
    }
}

/// Format rules a suggestion must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    pub max_len: usize,
    pub lowercase: bool,
    pub charset: Charset,
    /// A character that must appear at least once.
    pub separator: Option<char>,
}

impl Constraints {
    /// Check a cleaned suggestion, returning the reason it is unusable.
    pub fn validate(&self, value: &str) -> Result<(), String> {
        if value.is_empty() {
            return Err("empty".to_string());
        }
        let len = value.chars().count();
        if len > self.max_len {
            return Err(format!("{len} characters exceeds {}", self.max_len));
        }
        if let Some(c) = value.chars().find(|c| !self.charset.allows(*c)) {
            return Err(format!("invalid character '{c}'"));
        }
        if let Some(sep) = self.separator.filter(|sep| !value.contains(*sep)) {
            return Err(format!("missing '{sep}' separator"));
        }
        if self.lowercase && value.chars().any(|c| c.is_uppercase()) {
            return Err("must be lowercase".to_string());
        }
        Ok(())
    }

    /// Rule lines embedded in prompts.
    pub fn describe(&self) -> Vec<String> {
        let mut rules = vec![format!("At most {} characters", self.max_len)];
        if self.lowercase {
            rules.push("Lowercase only".to_string());
        }
        if let Some(charset) = self.charset.describe() {
            rules.push(format!("Use {charset}"));
        }
        if let Some(sep) = self.separator {
            rules.push(format!("Must contain '{sep}'"));
        }
        rules
    }
}

/// One request for a suggestion. Built per call and never persisted.
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub diff_text: String,
    pub kind: SuggestionKind,
    pub constraints: Constraints,
    /// The operator's own description of the change.
    pub description: String,
}

impl SuggestionRequest {
    pub fn new(kind: SuggestionKind, diff_text: impl Into<String>, description: &str) -> Self {
        Self {
            diff_text: diff_text.into(),
            kind,
            constraints: kind.constraints(),
            description: description.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_name_requires_separator() {
        let rules = SuggestionKind::BranchName.constraints();
        assert!(rules.validate("feat/add-login").is_ok());
        assert!(rules.validate("fix/#42-login").is_ok());
        assert!(rules.validate("add-login").is_err());
    }

    #[test]
    fn test_branch_name_rejects_long_or_invalid() {
        let rules = SuggestionKind::BranchName.constraints();
        assert!(rules.validate(&format!("feat/{}", "a".repeat(60))).is_err());
        assert!(rules.validate("feat/add login").is_err());
        assert!(rules.validate("Feat/login").is_err());
        assert!(rules.validate("").is_err());
    }

    #[test]
    fn test_short_title_charset() {
        let rules = SuggestionKind::ShortTitle.constraints();
        assert!(rules.validate("fix-login-bug").is_ok());
        assert!(rules.validate("fix/login").is_err());
    }

    #[test]
    fn test_only_names_are_enforced() {
        assert!(SuggestionKind::BranchName.enforces_constraints());
        assert!(SuggestionKind::ShortTitle.enforces_constraints());
        assert!(!SuggestionKind::CommitMessage.enforces_constraints());
        assert!(!SuggestionKind::PrTitle.enforces_constraints());
    }

    #[test]
    fn test_describe_lists_every_rule() {
        let rules = SuggestionKind::BranchName.constraints().describe();
        assert_eq!(rules.len(), 4);
        assert!(rules[0].contains("50"));
    }
}
