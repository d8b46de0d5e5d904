//! Branch and remote operations for SystemGit

use super::system_git::SystemGit;
use crate::core::error::{GitError, PromoteError, PromoteResult, ResultExt};
use tracing::debug;

const HEAD_BRANCH_PREFIX: &str = "HEAD branch:";

impl SystemGit<'_> {
  /// Create and checkout a branch
  pub fn create_and_checkout_branch(&self, branch_name: &str) -> PromoteResult<()> {
    self
      .command(&["checkout", "-b", branch_name])
      .with_context(|| format!("failed to create git branch {} in {}", branch_name, self.work_tree.display()))?;
    Ok(())
  }

  /// Checkout a local branch tracking `remote/branch`
  pub fn checkout_tracking(&self, remote: &str, branch: &str) -> PromoteResult<()> {
    let tracked = format!("{}/{}", remote, branch);
    self
      .command(&["checkout", "--track", &tracked])
      .with_context(|| format!("failed to checkout existing PR branch {}", tracked))?;
    Ok(())
  }

  /// Add a remote repository (an existing remote of the same name is kept)
  pub fn add_remote(&self, name: &str, url: &str) -> PromoteResult<()> {
    match self.command(&["remote", "add", name, url]) {
      Ok(_) => Ok(()),
      Err(PromoteError::Git(GitError::CommandFailed { stderr, .. })) if stderr.contains("already exists") => Ok(()),
      Err(e) => Err(e.context(format!("failed to add remote {}", name))),
    }
  }

  /// Fetch from remote
  pub fn fetch_from_remote(&self, remote: &str) -> PromoteResult<()> {
    self
      .command(&["fetch", remote])
      .with_context(|| format!("failed to fetch remote {}", remote))?;
    Ok(())
  }

  /// Rebase the current branch onto `upstream_ref`
  pub fn rebase(&self, upstream_ref: &str) -> PromoteResult<()> {
    self
      .command(&["rebase", upstream_ref])
      .with_context(|| format!("failed to rebase {} onto {}", self.work_tree.display(), upstream_ref))?;
    Ok(())
  }

  /// Force push `local_ref` to `branch` on `remote`
  pub fn force_push_branch(&self, remote: &str, local_ref: &str, branch: &str) -> PromoteResult<()> {
    let refspec = format!("{}:{}", local_ref, branch);
    match self.command(&["push", "--force", remote, &refspec]) {
      Ok(_) => Ok(()),
      Err(PromoteError::Git(GitError::CommandFailed { stderr, .. })) => Err(PromoteError::Git(GitError::PushFailed {
        remote: remote.to_string(),
        branch: branch.to_string(),
        reason: stderr,
      })),
      Err(e) => Err(e),
    }
  }

  /// Resolve the default branch of `remote`
  ///
  /// Tries `rev-parse --abbrev-ref <remote>/HEAD`, then the `HEAD branch:` line
  /// of `remote show <remote>`, then the current local branch.
  pub fn remote_default_branch(&self, remote: &str) -> PromoteResult<String> {
    let head_ref = format!("{}/HEAD", remote);
    if let Ok(text) = self.command(&["rev-parse", "--abbrev-ref", &head_ref]) {
      let branch = strip_remote_prefix(&text, remote);
      if !branch.is_empty() && branch != head_ref {
        return Ok(branch);
      }
    }

    match self.command(&["remote", "show", remote]) {
      Ok(text) => {
        if let Some(branch) = parse_head_branch(&text) {
          return Ok(branch);
        }
        debug!(remote, "output of git remote show has no {} line", HEAD_BRANCH_PREFIX);
      }
      Err(e) => debug!(remote, error = %e, "git remote show failed"),
    }

    self.current_branch()
  }
}

/// `origin/main` -> `main`
fn strip_remote_prefix(text: &str, remote: &str) -> String {
  let text = text.trim();
  let text = text.strip_prefix(remote).unwrap_or(text);
  text.strip_prefix('/').unwrap_or(text).to_string()
}

/// Find the first non-empty `HEAD branch:` value in `git remote show` output
fn parse_head_branch(text: &str) -> Option<String> {
  text
    .lines()
    .map(str::trim)
    .filter_map(|line| line.strip_prefix(HEAD_BRANCH_PREFIX))
    .map(str::trim)
    // "(unknown)" is what git prints for an empty remote
    .find(|branch| !branch.is_empty() && *branch != "(unknown)")
    .map(String::from)
}
