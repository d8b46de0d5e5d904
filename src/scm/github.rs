//! GitHub pull request operations via the gh CLI
//!
//! Uses `gh api` for every call so authentication, enterprise hosts and proxies
//! are handled by gh's own configuration (`GH_TOKEN`, `gh auth login`).

use super::{LabelSet, PullRequest, PullRequestInput, ScmClient};
use crate::core::error::{GitError, PromoteError, PromoteResult, ScmError};
use crate::core::runner::CommandRunner;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct GhPull {
  number: u64,
  html_url: String,
  #[serde(default)]
  title: Option<String>,
  #[serde(default)]
  body: Option<String>,
  state: String,
  #[serde(default)]
  merged_at: Option<String>,
  head: GhRef,
  base: GhRef,
  #[serde(default)]
  labels: Vec<GhLabel>,
}

#[derive(Debug, Deserialize)]
struct GhRef {
  #[serde(rename = "ref")]
  name: String,
  #[serde(default)]
  repo: Option<GhRepo>,
}

#[derive(Debug, Deserialize)]
struct GhRepo {
  full_name: String,
  #[serde(default)]
  clone_url: Option<String>,
  #[serde(default)]
  fork: bool,
}

#[derive(Debug, Deserialize)]
struct GhLabel {
  name: String,
}

#[derive(Debug, Deserialize)]
struct GhUser {
  login: String,
}

impl From<GhPull> for PullRequest {
  fn from(p: GhPull) -> Self {
    PullRequest {
      number: p.number,
      link: p.html_url,
      source_branch: p.head.name,
      source_repo: p.head.repo.map(|r| r.full_name).unwrap_or_default(),
      base_branch: p.base.name,
      title: p.title.unwrap_or_default(),
      body: p.body.unwrap_or_default(),
      labels: p.labels.into_iter().map(|l| l.name).collect(),
      closed: p.state == "closed",
      merged: p.merged_at.is_some(),
    }
  }
}

/// [`ScmClient`] for GitHub and GitHub Enterprise
pub struct GithubCli {
  runner: Rc<dyn CommandRunner>,
  host: String,
  workdir: PathBuf,
}

impl GithubCli {
  pub fn new(runner: Rc<dyn CommandRunner>, host: &str) -> Self {
    Self {
      runner,
      host: host.to_string(),
      workdir: std::env::temp_dir(),
    }
  }

  /// Run `gh api` and decode the JSON response
  fn api<T: DeserializeOwned>(&self, operation: &str, method: &str, path: &str, fields: &[(&str, &str)]) -> PromoteResult<T> {
    let text = self.api_raw(operation, method, path, fields)?;
    serde_json::from_str(&text).map_err(|e| {
      PromoteError::Scm(ScmError::Request {
        operation: operation.to_string(),
        reason: format!("unexpected response from {}: {}", path, e),
      })
    })
  }

  fn api_raw(&self, operation: &str, method: &str, path: &str, fields: &[(&str, &str)]) -> PromoteResult<String> {
    let mut args = vec![
      "api".to_string(),
      "--hostname".to_string(),
      self.host.clone(),
      "-X".to_string(),
      method.to_string(),
      path.to_string(),
    ];
    for (key, value) in fields {
      args.push("-f".to_string());
      args.push(format!("{}={}", key, value));
    }
    debug!(operation, method, path, "gh api");

    self.runner.run(&self.workdir, "gh", &args).map_err(|e| match e {
      PromoteError::Git(GitError::CommandFailed { stderr, .. }) if is_not_found(&stderr) => {
        PromoteError::Scm(ScmError::NotFound {
          resource: path.to_string(),
        })
      }
      PromoteError::Git(GitError::CommandFailed { stderr, .. }) => PromoteError::Scm(ScmError::Request {
        operation: operation.to_string(),
        reason: stderr,
      }),
      other => other,
    })
  }
}

fn is_not_found(stderr: &str) -> bool {
  stderr.contains("HTTP 404") || stderr.contains("Not Found")
}

impl ScmClient for GithubCli {
  /// GitHub's pulls endpoint cannot filter by label, so `labels` is applied
  /// by the caller
  fn list_open_pull_requests(&self, repo: &str, _labels: &LabelSet) -> PromoteResult<Vec<PullRequest>> {
    let path = format!("repos/{}/pulls?state=open&per_page=100", repo);
    let pulls: Vec<GhPull> = self.api("list pull requests", "GET", &path, &[])?;
    Ok(pulls.into_iter().map(PullRequest::from).collect())
  }

  fn find_pull_request(&self, repo: &str, number: u64) -> PromoteResult<PullRequest> {
    let path = format!("repos/{}/pulls/{}", repo, number);
    let pull: GhPull = self.api("find pull request", "GET", &path, &[])?;
    Ok(pull.into())
  }

  fn create_pull_request(&self, repo: &str, input: &PullRequestInput) -> PromoteResult<PullRequest> {
    let path = format!("repos/{}/pulls", repo);
    let fields = [
      ("title", input.title.as_str()),
      ("head", input.head.as_str()),
      ("base", input.base.as_str()),
      ("body", input.body.as_str()),
    ];
    let pull: GhPull = self.api("create pull request", "POST", &path, &fields)?;
    Ok(pull.into())
  }

  fn update_pull_request(&self, repo: &str, number: u64, input: &PullRequestInput) -> PromoteResult<PullRequest> {
    let path = format!("repos/{}/pulls/{}", repo, number);
    let fields = [("title", input.title.as_str()), ("body", input.body.as_str())];
    let pull: GhPull = self.api("update pull request", "PATCH", &path, &fields)?;
    Ok(pull.into())
  }

  fn add_label(&self, repo: &str, number: u64, label: &str) -> PromoteResult<()> {
    let path = format!("repos/{}/issues/{}/labels", repo, number);
    self.api_raw("add label", "POST", &path, &[("labels[]", label)])?;
    Ok(())
  }

  fn current_user(&self) -> PromoteResult<String> {
    let user: GhUser = self.api("find current user", "GET", "user", &[])?;
    Ok(user.login)
  }

  fn ensure_fork(&self, repo: &str) -> PromoteResult<String> {
    let user = self.current_user()?;
    let name = repo.rsplit('/').next().unwrap_or(repo);
    let fork_path = format!("repos/{}/{}", user, name);

    let existing: PromoteResult<GhRepo> = self.api("find fork", "GET", &fork_path, &[]);
    let fork = match existing {
      Ok(found) if found.fork => found,
      Ok(found) => {
        return Err(PromoteError::Scm(ScmError::Request {
          operation: "ensure fork".to_string(),
          reason: format!("{} exists but is not a fork of {}", found.full_name, repo),
        }));
      }
      Err(e) if e.is_not_found() => {
        debug!(repo, user = %user, "creating fork");
        self.api("create fork", "POST", &format!("repos/{}/forks", repo), &[])?
      }
      Err(e) => return Err(e),
    };

    fork.clone_url.ok_or_else(|| {
      PromoteError::Scm(ScmError::Request {
        operation: "ensure fork".to_string(),
        reason: format!("fork {} has no clone URL", fork.full_name),
      })
    })
  }
}
