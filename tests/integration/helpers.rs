//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A checkout of an environment repository
pub struct TestEnvironment {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestEnvironment {
  /// Create an empty environment checkout
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    Ok(Self { _root: root, path })
  }

  /// Create an environment whose root `releases.toml` has the given content
  pub fn with_releases(content: &str) -> Result<Self> {
    let env = Self::new()?;
    env.write_file("releases.toml", content)?;
    Ok(env)
  }

  /// Write a file, creating parent directories
  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    let file = self.path.join(path);
    if let Some(parent) = file.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file, content)?;
    Ok(())
  }

  /// Check if a file exists
  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  /// Read a file
  pub fn read_file(&self, path: &str) -> Result<String> {
    std::fs::read_to_string(self.path.join(path)).with_context(|| format!("Failed to read {}", path))
  }
}

fn env_promote(cwd: &Path, args: &[&str]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_env-promote");

  Command::new(bin)
    .current_dir(cwd)
    .args(args)
    .env("ENV_PROMOTE_LOG", "warn")
    .env_remove("GITHUB_TOKEN")
    .output()
    .context("Failed to run env-promote")
}

/// Run env-promote, failing the test if the command fails
pub fn run_env_promote(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = env_promote(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "env-promote command failed: env-promote {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Run env-promote, failing the test if the command succeeds
pub fn run_env_promote_expecting_failure(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = env_promote(cwd, args)?;

  if output.status.success() {
    anyhow::bail!(
      "env-promote command unexpectedly succeeded: env-promote {}\nstdout: {}",
      args.join(" "),
      String::from_utf8_lossy(&output.stdout)
    );
  }

  Ok(output)
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}
