//! System git backend
//!
//! Every operation is a plain git subcommand run through a [`CommandRunner`],
//! with safe configuration overrides applied to each invocation.

use crate::core::error::{PromoteResult, ResultExt};
use crate::core::runner::CommandRunner;
use std::path::{Path, PathBuf};

/// Author identity used for promotion commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitIdentity {
  pub name: String,
  pub email: String,
}

/// Git backend using system git
pub struct SystemGit<'r> {
  runner: &'r dyn CommandRunner,

  /// Working tree root
  pub(crate) work_tree: PathBuf,

  /// Identity applied to commits; falls back to the user's git config
  identity: Option<GitIdentity>,
}

impl<'r> SystemGit<'r> {
  /// Use an existing working tree
  pub fn open(runner: &'r dyn CommandRunner, work_tree: &Path) -> Self {
    Self {
      runner,
      work_tree: work_tree.to_path_buf(),
      identity: None,
    }
  }

  /// Clone `url` into `dir` (which must be empty or absent), naming the
  /// remote `remote`
  ///
  /// `url` may embed credentials; they never reach the logs because the runner
  /// redacts every command line it prints.
  pub fn clone_to_dir(runner: &'r dyn CommandRunner, url: &str, remote: &str, dir: &Path) -> PromoteResult<Self> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create clone directory {}", dir.display()))?;
    let git = Self::open(runner, dir);
    git.command(&["clone", "--origin", remote, url, "."])?;
    Ok(git)
  }

  pub fn with_identity(mut self, identity: Option<GitIdentity>) -> Self {
    self.identity = identity;
    self
  }

  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Run a git subcommand in the working tree and return trimmed stdout
  pub fn command(&self, args: &[&str]) -> PromoteResult<String> {
    let mut full: Vec<String> = Vec::with_capacity(args.len() + 6);

    // Force safe behavior (override user config)
    full.extend(["-c", "protocol.version=2"].map(String::from));
    full.extend(["-c", "advice.detachedHead=false"].map(String::from));
    full.extend(["-c", "core.quotePath=false"].map(String::from));
    if let Some(identity) = &self.identity {
      full.push("-c".to_string());
      full.push(format!("user.name={}", identity.name));
      full.push("-c".to_string());
      full.push(format!("user.email={}", identity.email));
    }
    full.extend(args.iter().map(|a| a.to_string()));

    self.runner.run(&self.work_tree, "git", &full)
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> PromoteResult<String> {
    self
      .command(&["rev-parse", "HEAD"])
      .with_context(|| format!("could not get latest commit sha in {}", self.work_tree.display()))
  }

  /// Get current branch name
  pub fn current_branch(&self) -> PromoteResult<String> {
    self
      .command(&["rev-parse", "--abbrev-ref", "HEAD"])
      .with_context(|| format!("failed to find branch in dir {}", self.work_tree.display()))
  }

  /// Whether the working tree has uncommitted (or untracked) changes
  pub fn has_changes(&self) -> PromoteResult<bool> {
    let status = self
      .command(&["status", "-s"])
      .with_context(|| format!("failed to detect changes in dir {}", self.work_tree.display()))?;
    Ok(!status.is_empty())
  }

  /// Stage everything and commit if anything is staged
  ///
  /// Returns `false` without committing when the tree is clean.
  pub fn add_and_commit(&self, message: &str) -> PromoteResult<bool> {
    self
      .command(&["add", "--all"])
      .with_context(|| format!("failed to add files in {}", self.work_tree.display()))?;
    if !self.has_changes()? {
      return Ok(false);
    }
    self
      .command(&["commit", "-m", message])
      .with_context(|| format!("failed to commit changes in dir {}", self.work_tree.display()))?;
    Ok(true)
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use super::*;
  use crate::core::runner::SystemRunner;
  use std::process::Command;

  /// Identity used by every test repository
  pub fn test_identity() -> GitIdentity {
    GitIdentity {
      name: "Test User".to_string(),
      email: "test@example.com".to_string(),
    }
  }

  /// Run git directly in a test fixture
  pub fn git(cwd: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
      .current_dir(cwd)
      .args(["-c", "user.name=Test User", "-c", "user.email=test@example.com"])
      .args(args)
      .output()
      .expect("failed to run git");
    assert!(
      output.status.success(),
      "git {} failed: {}",
      args.join(" "),
      String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
  }

  /// Create a bare "remote" with one commit on `main` and return its path
  pub fn bare_remote(root: &Path, files: &[(&str, &str)]) -> PathBuf {
    let seed = root.join("seed");
    std::fs::create_dir_all(&seed).unwrap();
    git(&seed, &["init", "--initial-branch=main"]);
    for (name, content) in files {
      let path = seed.join(name);
      if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
      }
      std::fs::write(path, content).unwrap();
    }
    std::fs::write(seed.join("README.md"), "# environment\n").unwrap();
    git(&seed, &["add", "."]);
    git(&seed, &["commit", "-m", "Initial environment"]);

    let remote = root.join("acme").join("env.git");
    std::fs::create_dir_all(remote.parent().unwrap()).unwrap();
    git(
      root,
      &["clone", "--bare", seed.to_str().unwrap(), remote.to_str().unwrap()],
    );
    remote
  }

  pub fn runner() -> SystemRunner {
    SystemRunner::new()
  }
}

#[cfg(test)]
mod tests {
  use super::testing::*;
  use super::*;

  #[test]
  fn test_clone_and_inspect() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = bare_remote(tmp.path(), &[]);
    let runner = runner();

    let clone = tmp.path().join("clone");
    let git = SystemGit::clone_to_dir(&runner, remote.to_str().unwrap(), "origin", &clone).unwrap();

    assert_eq!(git.current_branch().unwrap(), "main");
    assert_eq!(git.head_commit().unwrap().len(), 40);
    assert!(!git.has_changes().unwrap());
  }

  #[test]
  fn test_add_and_commit_skips_clean_tree() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = bare_remote(tmp.path(), &[]);
    let runner = runner();
    let clone = tmp.path().join("clone");
    let git = SystemGit::clone_to_dir(&runner, remote.to_str().unwrap(), "origin", &clone)
      .unwrap()
      .with_identity(Some(test_identity()));

    let before = git.head_commit().unwrap();
    assert!(!git.add_and_commit("nothing").unwrap());
    assert_eq!(git.head_commit().unwrap(), before);

    std::fs::write(clone.join("releases.toml"), "").unwrap();
    assert!(git.has_changes().unwrap());
    assert!(git.add_and_commit("add releases").unwrap());
    assert_ne!(git.head_commit().unwrap(), before);
  }
}
