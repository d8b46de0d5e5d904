//! Promotion of kpt packages
//!
//! Each app lives in its own package directory; an existing package is
//! upgraded in place, a missing one is fetched from the app's repository.

use super::PromoteRequest;
use crate::core::config::KptRuleConfig;
use crate::core::error::{ConfigError, PromoteError, PromoteResult, ResultExt};
use crate::core::runner::CommandRunner;
use std::path::Path;
use tracing::info;

/// What the kpt rule did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KptChange {
  Updated { app: String, version: String },
  Fetched { app: String, version: String },
}

/// `1.2.3` -> `v1.2.3`; no version tracks `master`
fn package_version(version: &str) -> String {
  if version.is_empty() {
    "master".to_string()
  } else if version.starts_with('v') {
    version.to_string()
  } else {
    format!("v{}", version)
  }
}

/// Package source inside the app repository
fn package_source(git_url: &str, app: &str) -> String {
  let mut url = git_url.trim_end_matches('/').to_string();
  if !url.ends_with(".git") {
    url.push_str(".git");
  }
  format!("{}/charts/{}/resources", url, app)
}

pub fn apply(
  runner: &dyn CommandRunner,
  config: &KptRuleConfig,
  dir: &Path,
  request: &PromoteRequest,
) -> PromoteResult<KptChange> {
  let app = request.app_name.as_str();
  if app.is_empty() {
    return Err(PromoteError::Config(ConfigError::MissingField {
      field: "app name (required to promote via kpt)".to_string(),
    }));
  }
  let git_url = request.app_git_url.as_deref().unwrap_or_default();
  if git_url.is_empty() {
    return Err(PromoteError::Config(ConfigError::MissingField {
      field: format!("git URL of app {} (required to promote via kpt)", app),
    }));
  }

  let namespace_dir = match config.path.as_deref() {
    Some(path) if !path.is_empty() => dir.join(path),
    _ => dir.to_path_buf(),
  };
  let version = package_version(&request.version);

  if namespace_dir.join(app).is_dir() {
    let args = vec![
      "pkg".to_string(),
      "update".to_string(),
      format!("{}@{}", app, version),
      "--strategy=alpha-git-patch".to_string(),
    ];
    info!(app, version = %version, "updating kpt package");
    runner
      .run(&namespace_dir, "kpt", &args)
      .with_context(|| format!("failed to update kpt app {}", app))?;
    return Ok(KptChange::Updated {
      app: app.to_string(),
      version,
    });
  }

  std::fs::create_dir_all(&namespace_dir)
    .with_context(|| format!("failed to create kpt directory {}", namespace_dir.display()))?;
  let args = vec![
    "pkg".to_string(),
    "get".to_string(),
    format!("{}@{}", package_source(git_url, app), version),
    app.to_string(),
  ];
  info!(app, version = %version, "fetching kpt package");
  runner
    .run(&namespace_dir, "kpt", &args)
    .with_context(|| format!("failed to get the app {} via kpt", app))?;
  Ok(KptChange::Fetched {
    app: app.to_string(),
    version,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::runner::testing::RecordingRunner;

  fn request(version: &str) -> PromoteRequest {
    PromoteRequest {
      app_name: "foo".to_string(),
      version: version.to_string(),
      app_git_url: Some("https://github.com/acme/foo/".to_string()),
      ..Default::default()
    }
  }

  #[test]
  fn test_package_version() {
    assert_eq!(package_version("1.2.3"), "v1.2.3");
    assert_eq!(package_version("v1.2.3"), "v1.2.3");
    assert_eq!(package_version(""), "master");
  }

  #[test]
  fn test_fetches_missing_package() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    let config = KptRuleConfig {
      path: Some("apps".to_string()),
    };

    let change = apply(&runner, &config, dir.path(), &request("1.0.0")).unwrap();
    assert!(matches!(change, KptChange::Fetched { .. }));
    assert_eq!(
      runner.command_lines(),
      vec!["kpt pkg get https://github.com/acme/foo.git/charts/foo/resources@v1.0.0 foo"]
    );
    assert_eq!(runner.calls.borrow()[0].0, dir.path().join("apps"));
  }

  #[test]
  fn test_updates_existing_package() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("foo")).unwrap();
    let runner = RecordingRunner::default();

    let change = apply(&runner, &KptRuleConfig::default(), dir.path(), &request("2.0.0")).unwrap();
    assert_eq!(
      change,
      KptChange::Updated {
        app: "foo".to_string(),
        version: "v2.0.0".to_string()
      }
    );
    assert_eq!(
      runner.command_lines(),
      vec!["kpt pkg update foo@v2.0.0 --strategy=alpha-git-patch"]
    );
  }

  #[test]
  fn test_requires_git_url() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    let req = PromoteRequest {
      app_git_url: None,
      ..request("1.0.0")
    };
    let err = apply(&runner, &KptRuleConfig::default(), dir.path(), &req).unwrap_err();
    assert!(matches!(err, PromoteError::Config(ConfigError::MissingField { .. })));
    assert!(runner.calls.borrow().is_empty());
  }
}
