//! Label reconciliation for pull requests

use super::backoff::{Backoff, Clock, retry};
use crate::core::error::{PromoteResult, ResultExt};
use crate::scm::{LabelSet, PullRequest, ScmClient};
use tracing::{debug, info};

/// Adds missing labels to a pull request and re-reads it afterwards
pub struct LabelReconciler<'a> {
  pub scm: &'a dyn ScmClient,
  pub clock: &'a dyn Clock,
  /// Schedule for re-reading the PR after labels were added
  pub backoff: Backoff,
}

impl<'a> LabelReconciler<'a> {
  pub fn new(scm: &'a dyn ScmClient, clock: &'a dyn Clock) -> Self {
    Self {
      scm,
      clock,
      backoff: Backoff::pull_request_refresh(),
    }
  }

  /// Make sure `pr` carries every label in `desired`
  ///
  /// Labels already on the PR are never re-applied. The first failing add
  /// aborts (labels added before it stay). When anything was added the PR is
  /// re-fetched under backoff, since the remote may not reflect the write yet.
  pub fn reconcile(&self, repo: &str, pr: PullRequest, desired: &LabelSet) -> PromoteResult<PullRequest> {
    let missing = desired.difference(&pr.labels);
    if missing.is_empty() {
      debug!(pr = pr.number, "pull request already has all labels");
      return Ok(pr);
    }

    for label in missing.iter() {
      self
        .scm
        .add_label(repo, pr.number, label)
        .with_context(|| format!("failed to add label {} to PR #{} on repo {}", label, pr.number, repo))?;
    }
    info!(pr = pr.number, labels = %missing, "added labels");

    let mut backoff = self.backoff.clone();
    let number = pr.number;
    let link = pr.link;
    let mut refreshed = retry(&mut backoff, self.clock, || {
      self
        .scm
        .find_pull_request(repo, number)
        .with_context(|| format!("failed to lookup PullRequest #{} on repo {}", number, repo))
    })?;
    // the refreshed copy may carry the raw API link
    if !link.is_empty() {
      refreshed.link = link;
    }
    Ok(refreshed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::promote::backoff::testing::ManualClock;
  use crate::scm::testing::FakeScm;

  fn pr_with_labels(labels: &[&str]) -> PullRequest {
    PullRequest {
      number: 7,
      link: "https://scm.test/acme/env/pull/7".to_string(),
      labels: labels.iter().copied().collect(),
      ..Default::default()
    }
  }

  fn scm_with(pr: &PullRequest) -> FakeScm {
    let scm = FakeScm::default();
    scm.prs.borrow_mut().push(pr.clone());
    scm
  }

  #[test]
  fn test_nothing_missing_is_noop() {
    let pr = pr_with_labels(&["updatebot", "env/staging"]);
    let scm = scm_with(&pr);
    let clock = ManualClock::default();
    let desired: LabelSet = ["updatebot"].into_iter().collect();

    let out = LabelReconciler::new(&scm, &clock).reconcile("acme/env", pr.clone(), &desired).unwrap();
    assert_eq!(out, pr);
    assert!(scm.added_labels.borrow().is_empty());
  }

  #[test]
  fn test_adds_only_missing_labels() {
    let pr = pr_with_labels(&["env/staging"]);
    let scm = scm_with(&pr);
    let clock = ManualClock::default();
    let desired: LabelSet = ["updatebot", "env/staging", "promotion"].into_iter().collect();

    let out = LabelReconciler::new(&scm, &clock).reconcile("acme/env", pr, &desired).unwrap();
    assert_eq!(
      *scm.added_labels.borrow(),
      vec![(7, "updatebot".to_string()), (7, "promotion".to_string())]
    );
    assert!(out.labels.is_superset(&desired));
  }

  #[test]
  fn test_refetch_retries_stale_reads() {
    let pr = pr_with_labels(&[]);
    let scm = scm_with(&pr);
    *scm.find_failures.borrow_mut() = 2;
    let clock = ManualClock::default();
    let desired: LabelSet = ["updatebot"].into_iter().collect();

    let out = LabelReconciler::new(&scm, &clock).reconcile("acme/env", pr, &desired).unwrap();
    assert!(out.labels.contains("updatebot"));
    assert_eq!(clock.sleeps.borrow().len(), 2);
  }

  #[test]
  fn test_refetch_gives_up_with_last_error() {
    let pr = pr_with_labels(&[]);
    let scm = scm_with(&pr);
    *scm.find_failures.borrow_mut() = 100;
    let clock = ManualClock::default();
    let desired: LabelSet = ["updatebot"].into_iter().collect();

    let err = LabelReconciler::new(&scm, &clock)
      .reconcile("acme/env", pr, &desired)
      .unwrap_err();
    assert!(err.to_string().contains("failed to lookup PullRequest #7"));
    assert!(clock.now() >= std::time::Duration::from_secs(60));
  }
}
