use crate::core::error::{ConfigError, PromoteError, PromoteResult, ResultExt};
use crate::core::vcs::GitIdentity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for env-promote
///
/// Searched in order: promote.toml, .promote.toml, .config/promote.toml, .jx/promote.toml.
/// Every section is optional; a missing file means all defaults.
///
/// # Example
///
/// ```toml
/// [rules.releases]
/// path = "namespaces/staging/releases.toml"
/// keep_old_versions = ["legacy-api"]
///
/// [environment]
/// chart_repository = "https://charts.acme.dev"
///
/// [pull_request]
/// labels = ["env/staging"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromoteConfig {
  #[serde(default)]
  pub rules: RulesConfig,
  #[serde(default)]
  pub environment: EnvironmentConfig,
  #[serde(default)]
  pub pull_request: PullRequestConfig,
  #[serde(default)]
  pub scm: ScmConfig,
  #[serde(default)]
  pub git: GitConfig,
}

/// How a promotion edits the environment repository; at most one rule is set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
  #[serde(default)]
  pub releases: Option<ReleasesRuleConfig>,
  #[serde(default)]
  pub kpt: Option<KptRuleConfig>,
}

/// Update a release declaration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasesRuleConfig {
  /// Document path relative to the repository root; a directory component
  /// makes it a nested document linked from the root `releases.toml`
  #[serde(default = "default_releases_path")]
  pub path: String,

  /// Namespace to promote into (overrides the request's namespace)
  #[serde(default)]
  pub namespace: Option<String>,

  /// Append a new versioned release instead of updating in place
  #[serde(default)]
  pub keep_old_releases: bool,

  /// Apps (or chart names) for which old releases are kept
  #[serde(default)]
  pub keep_old_versions: Vec<String>,
}

fn default_releases_path() -> String {
  "releases.toml".to_string()
}

impl Default for ReleasesRuleConfig {
  fn default() -> Self {
    Self {
      path: default_releases_path(),
      namespace: None,
      keep_old_releases: false,
      keep_old_versions: Vec::new(),
    }
  }
}

/// Upgrade a kpt package checked into the repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KptRuleConfig {
  /// Directory holding one package directory per app
  #[serde(default)]
  pub path: Option<String>,
}

/// The rule to run, after defaulting
#[derive(Debug, Clone)]
pub enum RuleKind {
  Releases(ReleasesRuleConfig),
  Kpt(KptRuleConfig),
}

/// Chart repository kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
  #[default]
  Http,
  Oci,
}

/// Properties of the target environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
  /// Releases in a remote cluster match regardless of namespace
  #[serde(default)]
  pub remote_cluster: bool,

  #[serde(default = "default_chart_repository")]
  pub chart_repository: String,

  #[serde(default)]
  pub chart_kind: ChartKind,

  #[serde(default = "default_namespace")]
  pub default_namespace: String,
}

fn default_chart_repository() -> String {
  "http://chartmuseum:8080".to_string()
}

fn default_namespace() -> String {
  "jx".to_string()
}

impl Default for EnvironmentConfig {
  fn default() -> Self {
    Self {
      remote_cluster: false,
      chart_repository: default_chart_repository(),
      chart_kind: ChartKind::default(),
      default_namespace: default_namespace(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestConfig {
  /// Labels identifying a reusable open PR; empty disables the lookup
  #[serde(default)]
  pub labels: Vec<String>,

  #[serde(default = "default_changelog_separator")]
  pub changelog_separator: String,

  #[serde(default = "default_remote")]
  pub remote: String,

  /// Push to a fork of the environment repository
  #[serde(default)]
  pub fork: bool,

  /// Label added when the PR should be merged automatically
  #[serde(default = "default_auto_merge_label")]
  pub auto_merge_label: String,
}

fn default_changelog_separator() -> String {
  "-----".to_string()
}

fn default_remote() -> String {
  "origin".to_string()
}

fn default_auto_merge_label() -> String {
  "updatebot".to_string()
}

impl Default for PullRequestConfig {
  fn default() -> Self {
    Self {
      labels: Vec::new(),
      changelog_separator: default_changelog_separator(),
      remote: default_remote(),
      fork: false,
      auto_merge_label: default_auto_merge_label(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScmConfig {
  /// Git server kind; discovered from the host name when empty
  #[serde(default)]
  pub kind: Option<String>,

  /// Environment variable holding the API and push token
  #[serde(default = "default_token_env")]
  pub token_env: String,

  /// User name embedded in authenticated clone URLs
  #[serde(default)]
  pub username: Option<String>,
}

fn default_token_env() -> String {
  "GITHUB_TOKEN".to_string()
}

impl Default for ScmConfig {
  fn default() -> Self {
    Self {
      kind: None,
      token_env: default_token_env(),
      username: None,
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitConfig {
  #[serde(default)]
  pub user_name: Option<String>,
  #[serde(default)]
  pub user_email: Option<String>,
}

impl GitConfig {
  pub fn identity(&self) -> Option<GitIdentity> {
    match (&self.user_name, &self.user_email) {
      (Some(name), Some(email)) => Some(GitIdentity {
        name: name.clone(),
        email: email.clone(),
      }),
      _ => None,
    }
  }
}

impl RulesConfig {
  /// The configured rule, defaulting to a root `releases.toml`
  pub fn kind(&self) -> PromoteResult<RuleKind> {
    match (&self.releases, &self.kpt) {
      (Some(_), Some(_)) => Err(PromoteError::Config(ConfigError::Invalid {
        field: "rules".to_string(),
        reason: "only one of [rules.releases] and [rules.kpt] may be set".to_string(),
      })),
      (Some(releases), None) => Ok(RuleKind::Releases(releases.clone())),
      (None, Some(kpt)) => Ok(RuleKind::Kpt(kpt.clone())),
      (None, None) => Ok(RuleKind::Releases(ReleasesRuleConfig::default())),
    }
  }
}

impl PromoteConfig {
  /// Find config file in search order
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("promote.toml"),
      path.join(".promote.toml"),
      path.join(".config").join("promote.toml"),
      path.join(".jx").join("promote.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from `path`, or defaults when there is no config file
  pub fn discover(path: &Path) -> PromoteResult<Self> {
    match Self::find_config_path(path) {
      Some(config_path) => Self::load_file(&config_path),
      None => Ok(Self::default()),
    }
  }

  /// Load and validate a specific config file
  pub fn load_file(config_path: &Path) -> PromoteResult<Self> {
    let content = fs::read_to_string(config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: PromoteConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config
      .validate()
      .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    Ok(config)
  }

  pub fn validate(&self) -> PromoteResult<()> {
    let rule = self.rules.kind()?;
    if let RuleKind::Releases(releases) = rule
      && releases.path.trim().is_empty()
    {
      return Err(PromoteError::Config(ConfigError::MissingField {
        field: "rules.releases.path".to_string(),
      }));
    }

    if self.environment.chart_repository.trim().is_empty() {
      return Err(PromoteError::Config(ConfigError::MissingField {
        field: "environment.chart_repository".to_string(),
      }));
    }

    if self.pull_request.changelog_separator.is_empty() {
      return Err(PromoteError::Config(ConfigError::Invalid {
        field: "pull_request.changelog_separator".to_string(),
        reason: "must not be empty".to_string(),
      }));
    }

    Ok(())
  }
}
