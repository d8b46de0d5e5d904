//! Promotion rules: how a promotion edits an environment repository
//!
//! - **releases**: update or append a release in a declaration document
//! - **kpt**: upgrade or fetch a kpt package
//!
//! The rule is chosen by the environment repository's own `promote.toml`, so
//! it is resolved against the checked-out directory, not the caller's.

pub mod chart;
pub mod document;
pub mod kpt;
pub mod matcher;
pub mod prefix;
pub mod releases;

use crate::core::config::{PromoteConfig, RuleKind};
use crate::core::error::{PromoteResult, ResultExt};
use crate::core::runner::CommandRunner;
use chart::ChartResolver;
use document::ConfigDocumentStore;
use std::collections::BTreeSet;
use std::path::Path;

/// What to promote and where
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromoteRequest {
  pub app_name: String,
  pub version: String,
  /// Explicit release name; defaults to the chart's local name
  pub release_name: Option<String>,
  pub namespace: Option<String>,
  /// Always append a new versioned release
  pub keep_old_releases: bool,
  /// Apps (or chart names) whose old releases are kept
  pub keep_old_versions_for: BTreeSet<String>,
  /// Source repository of the app (kpt packages are fetched from it)
  pub app_git_url: Option<String>,
}

impl PromoteRequest {
  pub fn new(app_name: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      app_name: app_name.into(),
      version: version.into(),
      ..Default::default()
    }
  }

  /// Merge keep-old settings from a rule
  pub fn with_keep_old(mut self, keep_old_releases: bool, keep_old_versions: &[String]) -> Self {
    self.keep_old_releases |= keep_old_releases;
    self.keep_old_versions_for.extend(keep_old_versions.iter().cloned());
    self
  }

  /// Whether old releases of this app (published as `chart_name`) are kept
  pub fn keeps_old_releases(&self, chart_name: &str) -> bool {
    self.keep_old_releases
      || self.keep_old_versions_for.contains(&self.app_name)
      || self.keep_old_versions_for.contains(chart_name)
  }
}

/// What a rule changed, for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
  Releases(releases::ReleaseChange),
  Kpt(kpt::KptChange),
}

/// Collaborators shared by every rule
pub struct RuleContext<'a> {
  pub runner: &'a dyn CommandRunner,
  pub store: &'a dyn ConfigDocumentStore,
  pub resolver: &'a dyn ChartResolver,
}

/// Run the environment repository's promotion rule in `dir`
pub fn apply_promotion(ctx: &RuleContext<'_>, dir: &Path, request: &PromoteRequest) -> PromoteResult<RuleOutcome> {
  let config = PromoteConfig::discover(dir)?;
  match config.rules.kind()? {
    RuleKind::Releases(rule) => releases::ReleasesRule {
      config: &rule,
      environment: &config.environment,
      store: ctx.store,
      resolver: ctx.resolver,
    }
    .apply(dir, request)
    .map(RuleOutcome::Releases)
    .with_context(|| format!("failed to modify chart files in dir {}", dir.display())),
    RuleKind::Kpt(rule) => kpt::apply(ctx.runner, &rule, dir, request).map(RuleOutcome::Kpt),
  }
}
