use std::env;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::core::config::PromoteConfig;
use crate::core::error::{PromoteResult, ResultExt};
use crate::core::redact::redact;
use crate::core::runner::{CommandRunner, SystemRunner};
use crate::promote::backoff::SystemClock;
use crate::promote::{Credentials, PromoteContext, PullRequestDetails, create_or_update};
use crate::rules::chart::DefaultChartResolver;
use crate::rules::document::TomlDocumentStore;
use crate::rules::{PromoteRequest, RuleContext, apply_promotion};
use crate::scm::{GitUrl, LabelSet, PullRequest, ScmClientCache};
use tracing::{debug, info};

/// How the promotion pull request is submitted
#[derive(Debug, Clone, Default)]
pub struct PromoteOptions {
  pub git_url: String,
  /// Clone here instead of a temporary directory
  pub dir: Option<PathBuf>,
  pub fork: bool,
  pub labels: Vec<String>,
  pub auto_merge: bool,
  pub title: Option<String>,
  pub message: Option<String>,
  pub changelog: Option<String>,
}

/// Run the promote command: open or update a pull request on the environment repository
pub fn run_promote(request: PromoteRequest, options: PromoteOptions) -> PromoteResult<()> {
  let current_dir = env::current_dir()?;
  let mut config = PromoteConfig::discover(&current_dir)?;
  if options.fork {
    config.pull_request.fork = true;
  }

  let target = GitUrl::parse(&options.git_url)
    .with_context(|| format!("failed to parse git URL {}", redact(&options.git_url)))?;

  let token = env::var(&config.scm.token_env).ok().filter(|t| !t.is_empty());
  let mut runner = SystemRunner::new();
  if let Some(token) = &token {
    runner = runner.with_env("GH_TOKEN", token.as_str());
  } else {
    debug!(variable = %config.scm.token_env, "no token set; relying on existing git and gh credentials");
  }
  let runner: Rc<dyn CommandRunner> = Rc::new(runner);

  let mut clients = ScmClientCache::new();
  let scm = clients
    .client_for(&target, &config.scm, Rc::clone(&runner))
    .with_context(|| format!("failed to create SCM client for {}", redact(&options.git_url)))?;

  let credentials = token.map(|token| Credentials {
    username: config.scm.username.clone().unwrap_or_default(),
    token,
  });

  let details = PullRequestDetails {
    app_name: request.app_name.clone(),
    version: request.version.clone(),
    title: options
      .title
      .unwrap_or_else(|| format!("chore: promote {} to version {}", request.app_name, request.version)),
    message: options
      .message
      .unwrap_or_else(|| format!("Promote {} to version {}", request.app_name, request.version)),
    changelog: options.changelog.unwrap_or_default(),
    labels: options.labels.iter().map(String::as_str).collect::<LabelSet>(),
    auto_merge: options.auto_merge,
    fork: config.pull_request.fork,
    branch_name: None,
  };

  let clock = SystemClock::new();
  let ctx = PromoteContext {
    runner: runner.as_ref(),
    scm: scm.as_ref(),
    clock: &clock,
    config: &config.pull_request,
    identity: config.git.identity(),
    credentials,
  };

  let rules = RuleContext {
    runner: runner.as_ref(),
    store: &TomlDocumentStore,
    resolver: &DefaultChartResolver,
  };
  let mut change = |dir: &Path, existing: Option<&PullRequest>| -> PromoteResult<()> {
    if let Some(pr) = existing {
      debug!(pr = pr.number, "promoting onto existing Pull Request");
    }
    let outcome = apply_promotion(&rules, dir, &request)?;
    info!(?outcome, app = %request.app_name, "applied promotion rule");
    Ok(())
  };

  match create_or_update(&ctx, &options.git_url, options.dir.as_deref(), &details, Some(&mut change))? {
    Some(pr) => {
      println!("✅ Pull Request: {}", pr.link);
      println!("   Title:  {}", pr.title);
      if !pr.labels.is_empty() {
        println!("   Labels: {}", pr.labels);
      }
    }
    None => println!(
      "⚠️  No changes to promote {} {} to {}",
      request.app_name,
      request.version,
      redact(&target.url)
    ),
  }
  Ok(())
}
