//! Lookup of an open pull request a promotion can reuse

use crate::core::error::{PromoteResult, ResultExt};
use crate::scm::{LabelSet, PullRequest, ScmClient};
use tracing::debug;

/// Most recent open PR from `source_repo` carrying one of `filter`'s labels
///
/// An empty filter disables reuse. A "not found" from the remote and an empty
/// listing both mean there is nothing to reuse; other failures are errors.
pub fn find_existing_pull_request(
  scm: &dyn ScmClient,
  repo: &str,
  source_repo: &str,
  filter: &LabelSet,
) -> PromoteResult<Option<PullRequest>> {
  if filter.is_empty() {
    return Ok(None);
  }

  let mut prs = match scm.list_open_pull_requests(repo, filter) {
    Ok(prs) => prs,
    Err(e) if e.is_not_found() => {
      debug!(repo, "no pull requests found");
      return Ok(None);
    }
    Err(e) => return Err(e).with_context(|| format!("failed to list open pull requests on {}", repo)),
  };

  // newest first, assuming PR numbers increase
  prs.sort_by(|a, b| b.number.cmp(&a.number));

  Ok(
    prs
      .into_iter()
      .filter(|pr| !pr.closed && !pr.merged && pr.source_repo == source_repo)
      .find(|pr| pr.labels.intersects(filter)),
  )
}
