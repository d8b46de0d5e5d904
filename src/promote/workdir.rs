//! Working directory for one promotion attempt

use crate::core::error::{PromoteError, PromoteResult, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Where the environment repository is cloned
///
/// An owned directory is removed when dropped, on every exit path. A
/// caller-supplied directory stays with the caller.
#[derive(Debug)]
pub enum WorkDir {
  Owned(TempDir),
  Borrowed(PathBuf),
}

impl WorkDir {
  /// Use `dir` if given (it must be missing or empty), else create a temporary directory
  pub fn new(dir: Option<&Path>) -> PromoteResult<Self> {
    match dir {
      Some(dir) => {
        if dir.is_dir() && fs::read_dir(dir)?.next().is_some() {
          return Err(PromoteError::with_help(
            format!("clone directory {} is not empty", dir.display()),
            "Pass an empty --dir, or omit it to clone into a temporary directory.",
          ));
        }
        Ok(WorkDir::Borrowed(dir.to_path_buf()))
      }
      None => tempfile::Builder::new()
        .prefix("env-promote-")
        .tempdir()
        .map(WorkDir::Owned)
        .context("failed to create temporary directory for the clone"),
    }
  }

  pub fn path(&self) -> &Path {
    match self {
      WorkDir::Owned(dir) => dir.path(),
      WorkDir::Borrowed(dir) => dir,
    }
  }
}
