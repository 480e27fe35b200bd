//! Working-tree materialization for pinned source revisions.
//!
//! Clones shallowly (full history is too slow for a build bot that only
//! needs the recent past) and force-checks-out the requested revision.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use crate::error::FetchError;

/// History entries retained by the shallow clone. Enough for tooling
/// that inspects recent commits, far cheaper than full history.
pub const DEFAULT_CLONE_DEPTH: u32 = 100;

/// Branch cloned before the pinned revision is checked out.
pub const DEFAULT_BRANCH: &str = "master";

/// A checked-out source revision on disk.
///
/// Exists only between a successful [`SourceFetcher::fetch`] and pipeline
/// teardown, and is exclusively owned by the pipeline invocation that
/// created it.
#[derive(Debug, Clone)]
pub struct WorkingTree {
    root: PathBuf,
    revision: String,
    origin: String,
}

impl WorkingTree {
    /// Root directory of the checkout.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The revision (commit, branch, or tag) this tree was pinned to.
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// The repository location this tree was cloned from.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// Materializes working trees through the git CLI.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    git: String,
    branch: String,
    depth: u32,
}

impl Default for SourceFetcher {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            depth: DEFAULT_CLONE_DEPTH,
        }
    }
}

impl SourceFetcher {
    /// Creates a fetcher with the default git binary, branch, and depth.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the git program to invoke.
    pub fn with_git(mut self, git: impl Into<String>) -> Self {
        self.git = git.into();
        self
    }

    /// Overrides the branch cloned before checkout.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Overrides the shallow-clone depth.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Clones `repo` shallowly into `dest` and force-checks-out `revision`.
    ///
    /// Both steps must succeed. A non-zero exit from either surfaces the
    /// step's combined stdout/stderr in the error; the caller decides
    /// whether to retry the whole fetch.
    pub async fn fetch(
        &self,
        repo: &str,
        revision: &str,
        dest: &Path,
    ) -> Result<WorkingTree, FetchError> {
        debug!(repo = repo, revision = revision, dest = %dest.display(), "Fetching source");

        let output = Command::new(&self.git)
            .args([
                "clone",
                &format!("--depth={}", self.depth),
                "--recursive",
                &format!("--branch={}", self.branch),
                repo,
            ])
            .arg(dest)
            .output()
            .await?;
        if !output.status.success() {
            return Err(FetchError::CloneFailed {
                output: combined(&output),
            });
        }

        // -q suppresses advisory output, -f discards local modifications
        let output = Command::new(&self.git)
            .args(["checkout", "-qf", revision])
            .current_dir(dest)
            .output()
            .await?;
        if !output.status.success() {
            return Err(FetchError::CheckoutFailed {
                revision: revision.to_string(),
                output: combined(&output),
            });
        }

        Ok(WorkingTree {
            root: dest.to_path_buf(),
            revision: revision.to_string(),
            origin: repo.to_string(),
        })
    }

    /// Reports the commit the tree currently has checked out.
    pub async fn head_revision(&self, tree: &WorkingTree) -> Result<String, FetchError> {
        let output = Command::new(&self.git)
            .args(["rev-parse", "HEAD"])
            .current_dir(tree.root())
            .output()
            .await?;
        if !output.status.success() {
            return Err(FetchError::RevParseFailed {
                output: combined(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn combined(output: &std::process::Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_defaults() {
        let fetcher = SourceFetcher::new();
        assert_eq!(fetcher.git, "git");
        assert_eq!(fetcher.branch, "master");
        assert_eq!(fetcher.depth, 100);
    }

    #[test]
    fn test_fetcher_builder() {
        let fetcher = SourceFetcher::new()
            .with_git("/usr/local/bin/git")
            .with_branch("main")
            .with_depth(1);
        assert_eq!(fetcher.git, "/usr/local/bin/git");
        assert_eq!(fetcher.branch, "main");
        assert_eq!(fetcher.depth, 1);
    }

    #[tokio::test]
    async fn test_fetch_surfaces_clone_output() {
        let tmp = tempfile::tempdir().unwrap();
        // "false" ignores its arguments and exits 1 with no output
        let fetcher = SourceFetcher::new().with_git("false");
        let err = fetcher
            .fetch("https://example.invalid/repo.git", "abc123", tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::CloneFailed { .. }));
    }

    #[tokio::test]
    async fn test_fetch_missing_git_is_io() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = SourceFetcher::new().with_git("binforge-no-such-git");
        let err = fetcher
            .fetch("https://example.invalid/repo.git", "abc123", tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
    }
}
