//! Remote source-control (pull request) operations
//!
//! - **giturl**: parse repository URLs into host / owner / name
//! - **labels**: ordered label sets with union and difference
//! - **github**: [`ScmClient`] backed by the `gh api` command

pub mod giturl;
pub mod github;
pub mod labels;

pub use giturl::GitUrl;
pub use github::GithubCli;
pub use labels::LabelSet;

use crate::core::config::ScmConfig;
use crate::core::error::{ConfigError, PromoteError, PromoteResult};
use crate::core::runner::CommandRunner;
use std::collections::HashMap;
use std::rc::Rc;

/// A pull request as last seen on the remote
///
/// Always treat a cached copy as stale after a write to the remote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequest {
  pub number: u64,
  pub link: String,
  /// Branch the changes live on
  pub source_branch: String,
  /// `owner/name` of the repository holding `source_branch`
  pub source_repo: String,
  /// Branch the PR merges into
  pub base_branch: String,
  pub title: String,
  pub body: String,
  pub labels: LabelSet,
  pub closed: bool,
  pub merged: bool,
}

/// Fields sent when creating or updating a pull request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestInput {
  pub title: String,
  pub body: String,
  /// `[owner:]branch`; ignored on update
  pub head: String,
  /// Ignored on update
  pub base: String,
}

/// Remote SCM operations
///
/// Implementations must return `ScmError::NotFound` for missing resources so
/// callers can tell "nothing there" apart from a failed request.
pub trait ScmClient {
  /// Open pull requests of `repo`, optionally narrowed to `labels`
  fn list_open_pull_requests(&self, repo: &str, labels: &LabelSet) -> PromoteResult<Vec<PullRequest>>;

  fn find_pull_request(&self, repo: &str, number: u64) -> PromoteResult<PullRequest>;

  fn create_pull_request(&self, repo: &str, input: &PullRequestInput) -> PromoteResult<PullRequest>;

  fn update_pull_request(&self, repo: &str, number: u64, input: &PullRequestInput) -> PromoteResult<PullRequest>;

  fn add_label(&self, repo: &str, number: u64, label: &str) -> PromoteResult<()>;

  /// Login of the authenticated user
  fn current_user(&self) -> PromoteResult<String>;

  /// Make sure the authenticated user has a fork of `repo`; returns its clone URL
  fn ensure_fork(&self, repo: &str) -> PromoteResult<String>;
}

/// SCM clients keyed by server URL
///
/// Built on first use and reused for the rest of the invocation.
#[derive(Default)]
pub struct ScmClientCache {
  clients: HashMap<String, Rc<dyn ScmClient>>,
}

impl ScmClientCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a client for a server (used for pre-built or test clients)
  pub fn insert(&mut self, server_url: impl Into<String>, client: Rc<dyn ScmClient>) {
    self.clients.insert(server_url.into(), client);
  }

  /// Get the client for `git_url`'s server, creating it if needed
  pub fn client_for(
    &mut self,
    git_url: &GitUrl,
    config: &ScmConfig,
    runner: Rc<dyn CommandRunner>,
  ) -> PromoteResult<Rc<dyn ScmClient>> {
    let server = git_url.host_url();
    if let Some(client) = self.clients.get(&server) {
      return Ok(Rc::clone(client));
    }

    let kind = match &config.kind {
      Some(kind) => kind.clone(),
      None => discover_git_kind(&git_url.host),
    };
    let client: Rc<dyn ScmClient> = match kind.as_str() {
      "github" => Rc::new(GithubCli::new(runner, &git_url.host)),
      _ => {
        return Err(PromoteError::Config(ConfigError::UnsupportedGitKind { kind, server }));
      }
    };
    self.clients.insert(server, Rc::clone(&client));
    Ok(client)
  }
}

/// Guess the server kind from its host name
fn discover_git_kind(host: &str) -> String {
  let host = host.to_ascii_lowercase();
  if host.contains("gitlab") {
    "gitlab".to_string()
  } else if host.contains("bitbucket") {
    "bitbucket".to_string()
  } else if host.contains("gitea") {
    "gitea".to_string()
  } else {
    // GitHub and GitHub Enterprise hosts have no reliable naming pattern
    "github".to_string()
  }
}
