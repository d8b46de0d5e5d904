//! One promotion attempt, from clone to submitted pull request

use super::Credentials;
use super::backoff::Clock;
use super::existing::find_existing_pull_request;
use super::labels::LabelReconciler;
use super::workdir::WorkDir;
use crate::core::config::PullRequestConfig;
use crate::core::error::{ConfigError, PromoteError, PromoteResult, ResultExt};
use crate::core::redact::redact;
use crate::core::runner::CommandRunner;
use crate::core::vcs::{GitIdentity, SystemGit};
use crate::scm::{GitUrl, LabelSet, PullRequest, PullRequestInput, ScmClient};
use std::path::Path;
use tracing::{debug, info, warn};

/// Remote name the upstream repository gets in a fork clone
const UPSTREAM_REMOTE: &str = "upstream";

/// Edits the checked-out environment repository
///
/// Receives the clone directory and the PR being updated, if any. It may leave
/// changes uncommitted or commit them itself.
pub type ChangeFn<'a> = dyn FnMut(&Path, Option<&PullRequest>) -> PromoteResult<()> + 'a;

/// Collaborators and settings shared by every attempt
pub struct PromoteContext<'a> {
  pub runner: &'a dyn CommandRunner,
  pub scm: &'a dyn ScmClient,
  pub clock: &'a dyn Clock,
  pub config: &'a PullRequestConfig,
  pub identity: Option<GitIdentity>,
  pub credentials: Option<Credentials>,
}

/// What the pull request says and how it is submitted
#[derive(Debug, Clone, Default)]
pub struct PullRequestDetails {
  /// Application being promoted; heads a fresh changelog section
  pub app_name: String,
  pub version: String,
  pub title: String,
  pub message: String,
  /// Appended below the changelog separator
  pub changelog: String,
  pub labels: LabelSet,
  /// Add the configured auto-merge label
  pub auto_merge: bool,
  /// Push to a fork of the repository instead of the repository itself
  pub fork: bool,
  /// Branch for a new PR; generated when unset
  pub branch_name: Option<String>,
}

impl PullRequestDetails {
  /// Labels the submitted PR must carry
  pub fn desired_labels(&self, config: &PullRequestConfig) -> LabelSet {
    let mut labels = LabelSet::new();
    if self.auto_merge {
      labels.insert(config.auto_merge_label.as_str());
    }
    labels.union(&self.labels)
  }
}

/// PR body: the message, then the changelog section
///
/// When updating a PR whose body already has a changelog section, that
/// section is kept and the new changelog goes after it.
pub fn compose_body(details: &PullRequestDetails, existing_body: Option<&str>, separator: &str) -> String {
  let mut changelog_prefix = format!("\n# {}\n", details.app_name);
  let mut existing_changelog = false;
  if let Some(body) = existing_body
    && let Some((_, previous)) = body.split_once(separator)
  {
    changelog_prefix = previous.to_string();
    existing_changelog = true;
  }

  let mut body = details.message.clone();
  if existing_changelog || !details.changelog.is_empty() {
    body.push('\n');
    body.push_str(separator);
    body.push_str(&changelog_prefix);
    body.push('\n');
    body.push_str(&details.changelog);
  }
  body
}

/// Where the new commits go and what the PR merges into
struct BranchPlan {
  branch: String,
  base: String,
}

/// Clone `git_url`, apply `change` and submit the result as a pull request
///
/// Returns `None` when the change left the repository untouched, even if an
/// open PR exists. With no `dir` the clone lives in a temporary
/// directory removed before returning.
pub fn create_or_update(
  ctx: &PromoteContext<'_>,
  git_url: &str,
  dir: Option<&Path>,
  details: &PullRequestDetails,
  change: Option<&mut ChangeFn<'_>>,
) -> PromoteResult<Option<PullRequest>> {
  let Some(change) = change else {
    return Err(PromoteError::Config(ConfigError::MissingChangeFunction));
  };

  let target = GitUrl::parse(git_url).with_context(|| format!("failed to parse git URL {}", redact(git_url)))?;
  let repo = target.full_name();
  let remote = ctx.config.remote.as_str();

  let (clone_url, source_repo) = if details.fork {
    let fork_url = ctx
      .scm
      .ensure_fork(&repo)
      .with_context(|| format!("failed to ensure repository is forked {}", redact(git_url)))?;
    let fork = GitUrl::parse(&fork_url).with_context(|| format!("failed to parse fork URL {}", redact(&fork_url)))?;
    let source_repo = fork.full_name();
    (fork, source_repo)
  } else {
    (target.clone(), repo.clone())
  };

  let filter: LabelSet = ctx.config.labels.iter().map(String::as_str).collect();
  let mut existing = find_existing_pull_request(ctx.scm, &repo, &source_repo, &filter)
    .with_context(|| format!("failed to find existing PullRequest on {}", repo))?;

  let workdir = WorkDir::new(dir)?;
  let dir = workdir.path();
  let git = SystemGit::clone_to_dir(ctx.runner, &authenticated(ctx, &clone_url), remote, dir)
    .with_context(|| format!("failed to clone git URL {}", redact(&clone_url.url)))?
    .with_identity(ctx.identity.clone());
  debug!(url = %redact(&clone_url.url), dir = %dir.display(), "cloned repository");

  if details.fork {
    rebase_fork(&git, &authenticated(ctx, &target), remote).context("failed to rebase forked repository")?;
  }

  if let Some(pr) = &existing
    && pr.source_branch.is_empty()
  {
    warn!(link = %pr.link, "PullRequest has no source branch so it cannot be reused");
    existing = None;
  }

  let plan = match &existing {
    Some(pr) => {
      info!(link = %pr.link, "rebasing existing Pull Request");
      git.checkout_tracking(remote, &pr.source_branch)?;
      BranchPlan {
        branch: pr.source_branch.clone(),
        base: pr.base_branch.clone(),
      }
    }
    None => {
      let base = git
        .remote_default_branch(remote)
        .with_context(|| format!("failed to get the remote branch name for {}", remote))?;
      let branch = match &details.branch_name {
        Some(name) if !name.is_empty() => name.clone(),
        _ => super::branch_name(&details.app_name, &details.version, &chrono::Utc::now().to_rfc3339()),
      };
      git
        .create_and_checkout_branch(&branch)
        .with_context(|| format!("failed to create git branch in {}", dir.display()))?;
      debug!(base = %base, branch = %branch, "creating Pull Request from base branch");
      BranchPlan { branch, base }
    }
  };

  let before = git.head_commit().context("could not get current commit sha")?;
  change(dir, existing.as_ref()).with_context(|| format!("failed to invoke change function in dir {}", dir.display()))?;
  let after = git.head_commit().context("could not get current latest commit sha")?;

  let done_commit = before != after;
  let has_changes = git.has_changes()?;
  if !done_commit && !has_changes {
    info!(url = %redact(&target.url), "no changes detected so not creating a Pull Request");
    return Ok(None);
  }

  let title = details.title.trim().to_string();
  let body = compose_body(
    details,
    existing.as_ref().map(|pr| pr.body.as_str()),
    &ctx.config.changelog_separator,
  );

  let message = format!("{}\n\n{}", title, body);
  git
    .add_and_commit(message.trim())
    .with_context(|| format!("failed to commit changes in dir {}", dir.display()))?;
  git
    .force_push_branch(remote, "HEAD", &plan.branch)
    .with_context(|| format!("failed to push to branch {} from dir {}", plan.branch, dir.display()))?;

  let mut pr = match &existing {
    Some(existing) => {
      let input = PullRequestInput {
        title,
        body,
        ..Default::default()
      };
      let pr = ctx
        .scm
        .update_pull_request(&repo, existing.number, &input)
        .with_context(|| format!("failed to update PullRequest #{} on {}", existing.number, repo))?;
      info!(link = %pr.link, "updated Pull Request");
      pr
    }
    None => {
      let head = if details.fork {
        let user = ctx.scm.current_user().context("failed to find current SCM user")?;
        format!("{}:{}", user, plan.branch)
      } else {
        plan.branch.clone()
      };
      let input = PullRequestInput {
        title,
        body,
        head,
        base: plan.base,
      };
      ctx
        .scm
        .create_pull_request(&repo, &input)
        .with_context(|| format!("failed to create PullRequest on {}", redact(&target.url)))?
    }
  };

  if let Some(link) = pr.link.strip_suffix(".diff") {
    pr.link = link.to_string();
  }
  if existing.is_none() {
    info!(link = %pr.link, "created Pull Request");
  }

  let desired = details.desired_labels(ctx.config);
  LabelReconciler::new(ctx.scm, ctx.clock)
    .reconcile(&repo, pr, &desired)
    .map(Some)
}

fn authenticated(ctx: &PromoteContext<'_>, url: &GitUrl) -> String {
  match &ctx.credentials {
    Some(creds) => url.authenticated_url(&creds.username, &creds.token),
    None => url.url.clone(),
  }
}

/// Bring the fork's default branch up to date with the upstream repository
fn rebase_fork(git: &SystemGit<'_>, upstream_url: &str, remote: &str) -> PromoteResult<()> {
  git.add_remote(UPSTREAM_REMOTE, upstream_url)?;
  git.fetch_from_remote(UPSTREAM_REMOTE)?;
  let branch = git.remote_default_branch(remote)?;
  git.rebase(&format!("{}/{}", UPSTREAM_REMOTE, branch))?;
  git.force_push_branch(remote, &branch, &branch)?;
  debug!(branch = %branch, "rebased fork onto upstream");
  Ok(())
}
