//! Promotion into release declaration documents
//!
//! Updates the version of a matching release in place or appends a new
//! release. Documents under a sub-directory are "nested": they share an
//! override namespace and must be linked from the root `releases.toml`.

use super::chart::{ChartDetails, ChartResolver};
use super::document::{ConfigDocumentStore, DeclarationDocument, ReleaseDeclaration};
use super::matcher::{MatchQuery, MatchScope, find_release};
use super::prefix::assign_repository_prefix;
use super::PromoteRequest;
use crate::core::config::{ChartKind, EnvironmentConfig, ReleasesRuleConfig};
use crate::core::error::{PromoteResult, ResultExt};
use crate::utils::path_to_git_format;
use std::path::Path;
use tracing::{debug, info};

/// Root document every nested document is linked from
pub const ROOT_DOCUMENT: &str = "releases.toml";

/// Alias given to the first chart repository registered in a document
const DEFAULT_PREFIX: &str = "dev";

/// What a promotion did to a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseChange {
  Updated { index: usize, name: String },
  Appended { name: String },
}

/// Everything the mutation needs besides the document itself
#[derive(Debug, Clone)]
pub struct ReleaseTarget<'a> {
  pub request: &'a PromoteRequest,
  pub chart: &'a ChartDetails,
  /// Namespace after rule/request/default fallback
  pub namespace: &'a str,
  pub keep_old_releases: bool,
}

impl ReleaseTarget<'_> {
  fn query(&self) -> MatchQuery<'_> {
    MatchQuery {
      app_name: &self.request.app_name,
      release_name: self.request.release_name.as_deref().unwrap_or_default(),
      keep_old_releases: self.keep_old_releases,
    }
  }

  /// Explicit release name, else the chart's local name, made unique per
  /// version when old releases are kept
  fn new_release_name(&self) -> String {
    let base = match self.request.release_name.as_deref() {
      Some(name) if !name.is_empty() => name.to_string(),
      _ => self.chart.local_name.clone(),
    };
    if self.keep_old_releases {
      format!("{}-{}", base, self.request.version.replace('.', "-"))
    } else {
      base
    }
  }
}

/// Promote into a root (flat) document
pub fn promote_flat(
  doc: &mut DeclarationDocument,
  target: &ReleaseTarget<'_>,
  remote_environment: bool,
) -> PromoteResult<ReleaseChange> {
  let scope = MatchScope::Flat {
    namespace: target.namespace,
    remote_environment,
  };
  apply_change(doc, target, scope, target.namespace.to_string())
}

/// Promote into a nested document sharing an override namespace
pub fn promote_nested(doc: &mut DeclarationDocument, target: &ReleaseTarget<'_>) -> PromoteResult<ReleaseChange> {
  // the first release establishes the namespace later releases inherit
  if doc.releases().is_empty() && !target.namespace.is_empty() && doc.override_namespace().is_empty() {
    doc.set_override_namespace(target.namespace);
  }

  let namespace = if target.namespace == doc.override_namespace() {
    String::new()
  } else {
    target.namespace.to_string()
  };
  apply_change(doc, target, MatchScope::Nested, namespace)
}

fn apply_change(
  doc: &mut DeclarationDocument,
  target: &ReleaseTarget<'_>,
  scope: MatchScope<'_>,
  new_namespace: String,
) -> PromoteResult<ReleaseChange> {
  let releases = doc.releases();
  if let Some(index) = find_release(&releases, &target.query(), scope) {
    doc.set_release_version(index, &target.request.version)?;
    return Ok(ReleaseChange::Updated {
      index,
      name: releases[index].name.clone(),
    });
  }

  let release = ReleaseDeclaration {
    name: target.new_release_name(),
    chart: target.chart.chart_name.clone(),
    version: target.request.version.clone(),
    namespace: new_namespace,
  };
  doc.push_release(&release)?;
  Ok(ReleaseChange::Appended { name: release.name })
}

/// Link `nested_path` from `root` unless an existing include already matches it
///
/// Existing includes are glob patterns; they are never reordered. Returns
/// whether a link was added.
pub fn ensure_nested_link(root: &mut DeclarationDocument, nested_path: &str) -> PromoteResult<bool> {
  let already_linked = root.includes().iter().any(|pattern| {
    glob::Pattern::new(pattern)
      .map(|p| p.matches(nested_path))
      .unwrap_or(false)
  });
  if already_linked {
    return Ok(false);
  }
  root.push_include(nested_path)?;
  Ok(true)
}

/// The releases rule bound to its collaborators
pub struct ReleasesRule<'a> {
  pub config: &'a ReleasesRuleConfig,
  pub environment: &'a EnvironmentConfig,
  pub store: &'a dyn ConfigDocumentStore,
  pub resolver: &'a dyn ChartResolver,
}

impl ReleasesRule<'_> {
  /// Apply the promotion to the documents under `dir`
  pub fn apply(&self, dir: &Path, request: &PromoteRequest) -> PromoteResult<ReleaseChange> {
    let rel_path = path_to_git_format(Path::new(&self.config.path));
    let nested = Path::new(&rel_path).parent().is_some_and(|p| !p.as_os_str().is_empty());
    let file = dir.join(&rel_path);

    let mut doc = self.store.load(&file)?.unwrap_or_default();

    let mut chart = self
      .resolver
      .chart_details(&request.app_name, &self.environment.chart_repository)
      .with_context(|| {
        format!(
          "failed to get chart details for {} repo {}",
          request.app_name, self.environment.chart_repository
        )
      })?;
    let oci = self.environment.chart_kind == ChartKind::Oci;
    assign_repository_prefix(&mut doc, &mut chart, oci, DEFAULT_PREFIX)?;

    let namespace = self
      .config
      .namespace
      .clone()
      .filter(|ns| !ns.is_empty())
      .or_else(|| request.namespace.clone().filter(|ns| !ns.is_empty()))
      .unwrap_or_else(|| self.environment.default_namespace.clone());

    let request = &request
      .clone()
      .with_keep_old(self.config.keep_old_releases, &self.config.keep_old_versions);
    let keep_old_releases = request.keeps_old_releases(&chart.chart_name);

    let target = ReleaseTarget {
      request,
      chart: &chart,
      namespace: &namespace,
      keep_old_releases,
    };
    let change = if nested {
      promote_nested(&mut doc, &target)?
    } else {
      promote_flat(&mut doc, &target, self.environment.remote_cluster)?
    };
    self.store.save(&file, &doc)?;

    match &change {
      ReleaseChange::Updated { name, .. } => {
        info!(release = %name, version = %request.version, file = %rel_path, "updated release version")
      }
      ReleaseChange::Appended { name } => {
        info!(release = %name, version = %request.version, file = %rel_path, "added release")
      }
    }

    if nested {
      let root_file = dir.join(ROOT_DOCUMENT);
      let mut root = self.store.load(&root_file)?.unwrap_or_default();
      if ensure_nested_link(&mut root, &rel_path)? {
        self.store.save(&root_file, &root).with_context(|| {
          format!(
            "failed to save root declarations after adding nested document to {}",
            root_file.display()
          )
        })?;
        debug!(nested = %rel_path, "linked nested document from root");
      }
    }

    Ok(change)
  }
}
