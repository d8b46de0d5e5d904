//! Error types for env-promote with contextual messages and exit codes
//!
//! Every failure carries the operation and the key identifier involved (app,
//! directory, URL, PR number) so an operator can diagnose it from a single run.
//! "Not found" and "nothing changed" are not errors: they are modeled as
//! `Option` results by the callers.

use crate::core::redact::redact;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for env-promote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, SCM, I/O)
  System = 2,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for env-promote
#[derive(Debug)]
pub enum PromoteError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Remote SCM errors
  Scm(ScmError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl PromoteError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    PromoteError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    PromoteError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  ///
  /// Typed errors are folded into a `Message` so the chain stays readable; the
  /// not-found marker survives because callers check it before adding context.
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      PromoteError::Message { message, context, help } => PromoteError::Message {
        message: ctx_str,
        context: Some(context.map(|c| format!("{}\n{}", message, c)).unwrap_or(message)),
        help,
      },
      other => {
        let help = other.help_message();
        PromoteError::Message {
          message: ctx_str,
          context: Some(other.to_string()),
          help,
        }
      }
    }
  }

  /// Whether this is the remote's distinguishable "not found" condition
  pub fn is_not_found(&self) -> bool {
    matches!(self, PromoteError::Scm(ScmError::NotFound { .. }))
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      PromoteError::Config(_) => ExitCode::User,
      PromoteError::Git(_) => ExitCode::System,
      PromoteError::Scm(_) => ExitCode::System,
      PromoteError::Io(_) => ExitCode::System,
      PromoteError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      PromoteError::Config(e) => e.help_message(),
      PromoteError::Git(e) => e.help_message(),
      PromoteError::Scm(e) => e.help_message(),
      PromoteError::Message { help, .. } => help.clone(),
      PromoteError::Io(_) => None,
    }
  }
}

impl fmt::Display for PromoteError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PromoteError::Config(e) => write!(f, "{}", e),
      PromoteError::Git(e) => write!(f, "{}", e),
      PromoteError::Scm(e) => write!(f, "{}", e),
      PromoteError::Io(e) => write!(f, "I/O error: {}", e),
      PromoteError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n  caused by: {}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for PromoteError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      PromoteError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for PromoteError {
  fn from(err: io::Error) -> Self {
    PromoteError::Io(err)
  }
}

impl From<String> for PromoteError {
  fn from(msg: String) -> Self {
    PromoteError::message(msg)
  }
}

impl From<&str> for PromoteError {
  fn from(msg: &str) -> Self {
    PromoteError::message(msg)
  }
}

impl From<toml_edit::TomlError> for PromoteError {
  fn from(err: toml_edit::TomlError) -> Self {
    PromoteError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for PromoteError {
  fn from(err: toml_edit::de::Error) -> Self {
    PromoteError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for PromoteError {
  fn from(err: serde_json::Error) -> Self {
    PromoteError::message(format!("JSON error: {}", err))
  }
}

impl From<glob::PatternError> for PromoteError {
  fn from(err: glob::PatternError) -> Self {
    PromoteError::message(format!("Invalid path pattern: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for PromoteError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    PromoteError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<ConfigError> for PromoteError {
  fn from(err: ConfigError) -> Self {
    PromoteError::Config(err)
  }
}

impl From<GitError> for PromoteError {
  fn from(err: GitError) -> Self {
    PromoteError::Git(err)
  }
}

impl From<ScmError> for PromoteError {
  fn from(err: ScmError) -> Self {
    PromoteError::Scm(err)
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Config file not found where one was required
  NotFound { dir: PathBuf },

  /// Missing required field or argument
  MissingField { field: String },

  /// The pull request flow was started without a change function
  MissingChangeFunction,

  /// No SCM client implementation for this kind of git server
  UnsupportedGitKind { kind: String, server: String },

  /// Invalid value in the config file
  Invalid { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => Some("Create a promote.toml or pass the settings as flags.".to_string()),
      ConfigError::UnsupportedGitKind { .. } => {
        Some("Set `[scm] kind = \"github\"` if the server speaks the GitHub API.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { dir } => {
        write!(f, "No env-promote configuration found in {}", dir.display())
      }
      ConfigError::MissingField { field } => write!(f, "Missing required setting: {}", field),
      ConfigError::MissingChangeFunction => write!(f, "No change function configured"),
      ConfigError::UnsupportedGitKind { kind, server } => {
        write!(f, "Unsupported git kind '{}' for server {}", kind, server)
      }
      ConfigError::Invalid { field, reason } => write!(f, "Invalid value for {}: {}", field, reason),
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// External command (git, gh, kpt) exited non-zero
  CommandFailed { command: String, stderr: String },

  /// Push failed
  PushFailed {
    remote: String,
    branch: String,
    reason: String,
  },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("permission denied") || reason.contains("403") {
          Some("Check the git token has write access to the repository.".to_string())
        } else {
          None
        }
      }
      GitError::CommandFailed { stderr, .. } if stderr.contains("could not apply") => {
        Some("The fork diverged from upstream; sync it manually and retry.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Command failed: {}\n{}", redact(command), redact(stderr.trim()))
      }
      GitError::PushFailed { remote, branch, reason } => {
        write!(f, "Push to {}/{} failed: {}", redact(remote), branch, redact(reason.trim()))
      }
    }
  }
}

/// Remote SCM errors
#[derive(Debug)]
pub enum ScmError {
  /// The remote reported that the resource does not exist
  NotFound { resource: String },

  /// Any other failure talking to the remote
  Request { operation: String, reason: String },
}

impl ScmError {
  fn help_message(&self) -> Option<String> {
    match self {
      ScmError::Request { reason, .. } if reason.contains("401") || reason.contains("auth") => {
        Some("Export a token in the variable named by `[scm] token_env`.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ScmError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ScmError::NotFound { resource } => write!(f, "Not found: {}", resource),
      ScmError::Request { operation, reason } => {
        write!(f, "SCM request '{}' failed: {}", operation, redact(reason.trim()))
      }
    }
  }
}

/// Result type alias for env-promote
pub type PromoteResult<T> = Result<T, PromoteError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> PromoteResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> PromoteResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<PromoteError>,
{
  fn context(self, ctx: impl Into<String>) -> PromoteResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> PromoteResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &PromoteError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
