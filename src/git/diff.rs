//! Unified diff text collection using git2.

use git2::{Diff, DiffFormat, DiffOptions, ErrorCode, Repository, Tree};

use crate::error::GitError;

/// Resolve the HEAD tree, distinguishing an unborn branch from real failures.
///
/// Returns `Ok(None)` for repos with no commits so the index is diffed
/// against the empty tree.
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, GitError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(GitError::DiffFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(GitError::DiffFailed)?;
    Ok(Some(tree))
}

/// Diff of the index against HEAD.
pub fn staged(repo: &Repository) -> Result<String, GitError> {
    let head_tree = resolve_head_tree(repo)?;
    let diff = repo
        .diff_tree_to_index(head_tree.as_ref(), None, None)
        .map_err(GitError::DiffFailed)?;

    let mut text = String::new();
    append_patch(&diff, &mut text)?;
    Ok(text)
}

/// Diff of everything not yet committed: staged, unstaged and untracked.
pub fn working(repo: &Repository) -> Result<String, GitError> {
    let mut text = staged(repo)?;

    let mut opts = DiffOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .show_untracked_content(true);
    let unstaged = repo
        .diff_index_to_workdir(None, Some(&mut opts))
        .map_err(GitError::DiffFailed)?;

    append_patch(&unstaged, &mut text)?;
    Ok(text)
}

/// Append patch text, keeping the `diff --git` file headers.
fn append_patch(diff: &Diff<'_>, text: &mut String) -> Result<(), GitError> {
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let origin = line.origin();
        if matches!(origin, '+' | '-' | ' ') {
            text.push(origin);
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .map_err(GitError::DiffFailed)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn init_with_commit(dir: &Path) -> Repository {
        let repo = Repository::init(dir).unwrap();
        let sig = git2::Signature::now("Test", "test@test.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        {
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
                .unwrap();
        }
        repo
    }

    fn stage(repo: &Repository, path: &str) {
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(path)).unwrap();
        index.write().unwrap();
    }

    #[test]
    fn test_staged_diff_empty_on_clean_repo() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_with_commit(dir.path());
        assert!(staged(&repo).unwrap().is_empty());
    }

    #[test]
    fn test_staged_diff_has_file_header() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_with_commit(dir.path());
        std::fs::write(dir.path().join("auth.js"), "resolve()\n").unwrap();
        stage(&repo, "auth.js");

        let text = staged(&repo).unwrap();
        assert!(text.contains("diff --git a/auth.js b/auth.js"));
        assert!(text.contains("+resolve()"));
    }

    #[test]
    fn test_staged_diff_ignores_unstaged_changes() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_with_commit(dir.path());
        std::fs::write(dir.path().join("notes.txt"), "draft\n").unwrap();

        assert!(staged(&repo).unwrap().is_empty());
        assert!(working(&repo).unwrap().contains("notes.txt"));
    }

    #[test]
    fn test_staged_diff_on_unborn_branch() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("README.md"), "# hi\n").unwrap();
        stage(&repo, "README.md");

        assert!(staged(&repo).unwrap().contains("b/README.md"));
    }

    #[test]
    fn test_corrupt_head_propagates_error() {
        let dir = tempfile::tempdir().unwrap();
        init_with_commit(dir.path());
        std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/\0invalid").unwrap();

        let repo = Repository::open(dir.path()).unwrap();
        assert!(matches!(staged(&repo), Err(GitError::DiffFailed(_))));
    }
}
