//! Facade over `git`

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ToolError;
use crate::tool::{ToolInvocation, ToolOutput, ToolRunner};

/// Runs git commands against working trees
#[derive(Clone)]
pub struct Git {
    runner: Arc<dyn ToolRunner>,
    executable: String,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("executable", &self.executable)
            .finish()
    }
}

impl Git {
    pub fn new(runner: Arc<dyn ToolRunner>, executable: impl Into<String>) -> Self {
        Self {
            runner,
            executable: executable.into(),
        }
    }

    fn invocation(&self, repo: &Path, args: &[&str]) -> ToolInvocation {
        ToolInvocation::new(&self.executable)
            .cwd(repo)
            .args(args.iter().copied())
    }

    /// Run a git command with output on the terminal
    pub fn command(&self, repo: &Path, args: &[&str]) -> Result<(), ToolError> {
        self.runner
            .run_checked(&self.invocation(repo, args))
            .map(|_| ())
    }

    /// Run a git command and return its stdout
    pub fn output(&self, repo: &Path, args: &[&str]) -> Result<String, ToolError> {
        let output = self
            .runner
            .run_checked(&self.invocation(repo, args).capture())?;
        Ok(output.stdout)
    }

    fn capture_raw(&self, repo: &Path, args: &[&str]) -> Result<ToolOutput, ToolError> {
        self.runner.run(&self.invocation(repo, args).capture())
    }

    /// Commit id of `HEAD`
    pub fn tip(&self, repo: &Path) -> Result<String, ToolError> {
        let tip = self.output(repo, &["rev-parse", "HEAD"])?.trim().to_string();
        debug!(repo = %repo.display(), tip, "resolved tip");
        Ok(tip)
    }

    pub fn pull(&self, repo: &Path) -> Result<(), ToolError> {
        info!(repo = %repo.display(), "pulling");
        self.command(repo, &["pull"])
    }

    /// Check out `rev` in `repo`
    pub fn update(&self, repo: &Path, rev: &str) -> Result<(), ToolError> {
        info!(repo = %repo.display(), rev, "updating");
        self.command(repo, &["checkout", "--quiet", rev])
    }

    /// Name of the checked-out branch, `None` when detached
    pub fn active_branch(&self, repo: &Path) -> Result<Option<String>, ToolError> {
        let output = self.capture_raw(repo, &["symbolic-ref", "--short", "-q", "HEAD"])?;
        let branch = output.stdout.trim();
        if output.succeeded() && !branch.is_empty() {
            Ok(Some(branch.to_string()))
        } else {
            Ok(None)
        }
    }

    /// Whether the tree has uncommitted changes or untracked files
    pub fn is_dirty(&self, repo: &Path) -> Result<bool, ToolError> {
        let status = self.output(repo, &["status", "--porcelain"])?;
        Ok(!status.trim().is_empty())
    }

    /// Every tracked path at `HEAD`
    pub fn ls_tree_names(&self, repo: &Path) -> Result<Vec<String>, ToolError> {
        let listing = self.output(repo, &["ls-tree", "-r", "HEAD", "--name-only"])?;
        Ok(listing
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Parent commits of `HEAD`; empty for a root commit
    pub fn parents(&self, repo: &Path) -> Result<Vec<String>, ToolError> {
        let parents = self.output(repo, &["show", "--pretty=format:%P", "-s", "HEAD"])?;
        Ok(parents.split_whitespace().map(str::to_string).collect())
    }

    pub fn checkout(&self, repo: &Path, branch: &str) -> Result<(), ToolError> {
        self.command(repo, &["checkout", branch])
    }

    /// Remove all untracked and ignored files
    pub fn clean_all(&self, repo: &Path) -> Result<(), ToolError> {
        self.command(repo, &["clean", "-fdx"])
    }

    pub fn add_all(&self, repo: &Path) -> Result<(), ToolError> {
        self.command(repo, &["add", "."])
    }

    pub fn commit(&self, repo: &Path, message: &str) -> Result<(), ToolError> {
        info!(repo = %repo.display(), "committing");
        self.command(repo, &["commit", "-m", message])
    }

    pub fn push(&self, repo: &Path, remote: &str, refspec: &str) -> Result<(), ToolError> {
        self.command(repo, &["push", remote, refspec])
    }

    pub fn merge(&self, repo: &Path, branch: &str) -> Result<(), ToolError> {
        self.command(repo, &["merge", branch])
    }
}
