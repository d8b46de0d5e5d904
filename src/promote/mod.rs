//! Pull request reconciliation against an environment repository
//!
//! One promotion attempt clones the repository, optionally through a fork,
//! reuses an open promotion PR when one matches, runs the change function and
//! submits the result as a new or updated pull request.
//!
//! - **reconciler**: the attempt itself
//! - **existing**: lookup of a reusable open PR
//! - **labels**: add missing labels, then re-read the PR
//! - **backoff**: bounded retry used by label reconciliation
//! - **workdir**: owned or caller-supplied clone directory

pub mod backoff;
pub mod existing;
pub mod labels;
pub mod reconciler;
pub mod workdir;

pub use reconciler::{ChangeFn, PromoteContext, PullRequestDetails, create_or_update};

use sha2::{Digest, Sha256};
use std::fmt;

/// Credentials for cloning and pushing over http(s)
#[derive(Clone)]
pub struct Credentials {
  pub username: String,
  pub token: String,
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("username", &self.username)
      .field("token", &"****")
      .finish()
  }
}

/// Name of a fresh promotion branch
///
/// `promote/<app>-<version>-<hash>`, with dots in the version replaced and the
/// hash taken over app, version and `salt` so reruns get distinct branches.
pub fn branch_name(app: &str, version: &str, salt: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(app.as_bytes());
  hasher.update([0]);
  hasher.update(version.as_bytes());
  hasher.update([0]);
  hasher.update(salt.as_bytes());
  let digest = hasher.finalize();
  let hash: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();

  format!("promote/{}-{}-{}", sanitize(app), sanitize(&version.replace('.', "-")), hash)
}

/// Keep characters git accepts in a ref component
fn sanitize(text: &str) -> String {
  let cleaned: String = text
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
    .collect();
  cleaned.trim_matches('-').to_string()
}
