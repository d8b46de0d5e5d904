//! Picks the release declaration a promotion should update
//!
//! Every declaration is scored and the highest score wins; the first
//! declaration reaching the maximum keeps it on ties. A score of zero means no
//! match and the promotion appends a new declaration instead.

use super::document::ReleaseDeclaration;

/// Where the declarations live, which decides how namespaces are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope<'a> {
  /// A root document: a release must be in `namespace`, unless the
  /// environment is remote and shares one namespace
  Flat { namespace: &'a str, remote_environment: bool },
  /// A nested document: the namespace is implied by the document
  Nested,
}

/// The identity a promotion is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchQuery<'a> {
  pub app_name: &'a str,
  /// Explicit release name; empty when none was given
  pub release_name: &'a str,
  /// When set nothing matches, so every promotion appends
  pub keep_old_releases: bool,
}

/// Index of the declaration to update, or `None` to append
pub fn find_release(releases: &[ReleaseDeclaration], query: &MatchQuery<'_>, scope: MatchScope<'_>) -> Option<usize> {
  if query.keep_old_releases {
    return None;
  }

  let (best, _) = releases
    .iter()
    .enumerate()
    .fold((None, 0u32), |(best, best_score), (index, release)| {
      let score = score(release, query, scope);
      if score > best_score {
        (Some(index), score)
      } else {
        (best, best_score)
      }
    });
  best
}

fn score(release: &ReleaseDeclaration, query: &MatchQuery<'_>, scope: MatchScope<'_>) -> u32 {
  let in_scope = match scope {
    MatchScope::Flat {
      namespace,
      remote_environment,
    } => remote_environment || release.namespace == namespace,
    MatchScope::Nested => true,
  };
  if !in_scope {
    return 0;
  }

  let mut score = 0;
  if release.name == query.app_name {
    score += 1;
  }
  // a direct match on the release name outranks the app name
  if !query.release_name.is_empty() && release.name == query.release_name {
    score += 2;
  }
  score
}

#[cfg(test)]
mod tests {
  use super::*;

  fn release(name: &str, namespace: &str) -> ReleaseDeclaration {
    ReleaseDeclaration {
      name: name.to_string(),
      chart: format!("dev/{}", name),
      version: "1.0.0".to_string(),
      namespace: namespace.to_string(),
    }
  }

  fn query<'a>(app: &'a str, release_name: &'a str) -> MatchQuery<'a> {
    MatchQuery {
      app_name: app,
      release_name,
      keep_old_releases: false,
    }
  }

  const JX: MatchScope<'static> = MatchScope::Flat {
    namespace: "jx",
    remote_environment: false,
  };

  #[test]
  fn test_matches_app_in_namespace() {
    let releases = vec![release("foo", "jx")];
    assert_eq!(find_release(&releases, &query("foo", ""), JX), Some(0));
  }

  #[test]
  fn test_other_namespace_does_not_match() {
    let releases = vec![release("foo", "staging")];
    assert_eq!(find_release(&releases, &query("foo", ""), JX), None);
  }

  #[test]
  fn test_remote_environment_ignores_namespace() {
    let releases = vec![release("foo", "staging")];
    let scope = MatchScope::Flat {
      namespace: "jx",
      remote_environment: true,
    };
    assert_eq!(find_release(&releases, &query("foo", ""), scope), Some(0));
  }

  #[test]
  fn test_release_name_beats_app_name_regardless_of_order() {
    let releases = vec![release("foo", "jx"), release("foo-api", "jx")];
    assert_eq!(find_release(&releases, &query("foo", "foo-api"), JX), Some(1));

    let reversed = vec![release("foo-api", "jx"), release("foo", "jx")];
    assert_eq!(find_release(&reversed, &query("foo", "foo-api"), JX), Some(0));
  }

  #[test]
  fn test_first_of_equal_scores_wins() {
    let releases = vec![release("bar", "jx"), release("foo", "jx"), release("foo", "jx")];
    assert_eq!(find_release(&releases, &query("foo", ""), JX), Some(1));
  }

  #[test]
  fn test_keep_old_releases_forces_append() {
    let releases = vec![release("foo", "jx")];
    let q = MatchQuery {
      keep_old_releases: true,
      ..query("foo", "foo")
    };
    assert_eq!(find_release(&releases, &q, JX), None);
  }

  #[test]
  fn test_nested_scope_compares_names_only() {
    let releases = vec![release("foo", ""), release("bar", "other")];
    assert_eq!(find_release(&releases, &query("bar", ""), MatchScope::Nested), Some(1));
  }

  #[test]
  fn test_result_is_deterministic() {
    let releases = vec![release("a", "jx"), release("foo", "jx"), release("foo", "x")];
    let q = query("foo", "a");
    let first = find_release(&releases, &q, JX);
    for _ in 0..10 {
      assert_eq!(find_release(&releases, &q, JX), first);
    }
    assert_eq!(first, Some(0));
  }
}
