//! Git URL parsing
//!
//! Handles https (`https://host/owner/repo.git`), scp-style ssh
//! (`git@host:owner/repo.git`), `ssh://` URLs and local paths. For local paths
//! the last two components are used as owner and repository name.

use crate::core::error::{PromoteError, PromoteResult};
use crate::utils::is_local_path;
use std::path::Path;

/// A parsed git repository URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitUrl {
  /// Original URL as given
  pub url: String,
  /// `https`, `http`, `ssh` or `file`
  pub scheme: String,
  /// Host without user info (empty for local paths)
  pub host: String,
  pub owner: String,
  pub name: String,
}

impl GitUrl {
  pub fn parse(url: &str) -> PromoteResult<Self> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
      return Err(PromoteError::message("empty git URL"));
    }

    if is_local_path(trimmed) || trimmed.starts_with("file://") {
      let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
      let path = Path::new(path);
      let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
      let owner = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
      return Self::build(url, "file", "", &owner, &name);
    }

    if let Some((scheme, rest)) = trimmed.split_once("://") {
      let (authority, path) = rest
        .split_once('/')
        .ok_or_else(|| PromoteError::message(format!("git URL has no repository path: {}", url)))?;
      let host = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
      let (owner, name) = split_owner_name(path, url)?;
      return Self::build(url, scheme, host, &owner, &name);
    }

    // scp-style: [user@]host:owner/repo.git
    if let Some((authority, path)) = trimmed.split_once(':') {
      let host = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
      let (owner, name) = split_owner_name(path, url)?;
      return Self::build(url, "ssh", host, &owner, &name);
    }

    Err(PromoteError::message(format!("unrecognised git URL: {}", url)))
  }

  fn build(url: &str, scheme: &str, host: &str, owner: &str, name: &str) -> PromoteResult<Self> {
    let name = name.strip_suffix(".git").unwrap_or(name);
    if owner.is_empty() || name.is_empty() {
      return Err(PromoteError::message(format!(
        "git URL must name an owner and a repository: {}",
        url
      )));
    }
    Ok(Self {
      url: url.to_string(),
      scheme: scheme.to_string(),
      host: host.to_string(),
      owner: owner.to_string(),
      name: name.to_string(),
    })
  }

  /// `owner/name`
  pub fn full_name(&self) -> String {
    format!("{}/{}", self.owner, self.name)
  }

  pub fn is_local(&self) -> bool {
    self.scheme == "file"
  }

  /// Server URL without user info, used as the SCM client cache key
  pub fn host_url(&self) -> String {
    match self.scheme.as_str() {
      "file" => "file://".to_string(),
      "http" => format!("http://{}", self.host),
      _ => format!("https://{}", self.host),
    }
  }

  /// Clone URL with `user:token@` embedded; only http(s) URLs are rewritten
  pub fn authenticated_url(&self, user: &str, token: &str) -> String {
    if token.is_empty() || !(self.scheme == "https" || self.scheme == "http") {
      return self.url.clone();
    }
    let user = if user.is_empty() { "git" } else { user };
    format!(
      "{}://{}:{}@{}/{}/{}.git",
      self.scheme, user, token, self.host, self.owner, self.name
    )
  }
}

/// Last two path segments as (owner, name); nested groups keep their prefix in owner
fn split_owner_name(path: &str, url: &str) -> PromoteResult<(String, String)> {
  let path = path.trim_matches('/');
  path
    .rsplit_once('/')
    .map(|(owner, name)| (owner.to_string(), name.to_string()))
    .ok_or_else(|| PromoteError::message(format!("git URL must name an owner and a repository: {}", url)))
}
