//! Ordered label sets
//!
//! Labels keep their first-seen order so they are applied to a pull request in
//! a stable, predictable sequence.

use std::fmt;

/// A set of label names with insertion order preserved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
  names: Vec<String>,
}

impl LabelSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a label; empty names and duplicates are ignored
  pub fn insert(&mut self, label: impl Into<String>) -> bool {
    let label = label.into();
    if label.is_empty() || self.contains(&label) {
      return false;
    }
    self.names.push(label);
    true
  }

  pub fn contains(&self, label: &str) -> bool {
    self.names.iter().any(|l| l == label)
  }

  /// Labels in `self` or `other`, `self`'s first
  pub fn union(&self, other: &LabelSet) -> LabelSet {
    let mut out = self.clone();
    for label in other.iter() {
      out.insert(label);
    }
    out
  }

  /// Labels in `self` that are not in `other`
  pub fn difference(&self, other: &LabelSet) -> LabelSet {
    self.names.iter().filter(|l| !other.contains(l)).cloned().collect()
  }

  /// Whether any label is shared
  pub fn intersects(&self, other: &LabelSet) -> bool {
    self.names.iter().any(|l| other.contains(l))
  }

  pub fn is_superset(&self, other: &LabelSet) -> bool {
    other.iter().all(|l| self.contains(l))
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    let mut set = LabelSet::new();
    for label in iter {
      set.insert(label);
    }
    set
  }
}

impl fmt::Display for LabelSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.names.join(", "))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_insert_dedupes_and_skips_empty() {
    let set: LabelSet = ["a", "", "b", "a"].into_iter().collect();
    assert_eq!(set.iter().collect::<Vec<_>>(), vec!["a", "b"]);
  }

  #[test]
  fn test_union_keeps_order() {
    let a: LabelSet = ["updatebot", "env"].into_iter().collect();
    let b: LabelSet = ["env", "promote"].into_iter().collect();
    assert_eq!(a.union(&b).iter().collect::<Vec<_>>(), vec!["updatebot", "env", "promote"]);
  }

  #[test]
  fn test_difference() {
    let desired: LabelSet = ["updatebot", "env", "promote"].into_iter().collect();
    let existing: LabelSet = ["env", "other"].into_iter().collect();
    let missing = desired.difference(&existing);
    assert_eq!(missing.iter().collect::<Vec<_>>(), vec!["updatebot", "promote"]);
    assert!(existing.union(&missing).is_superset(&desired));
  }

  #[test]
  fn test_intersects() {
    let filter: LabelSet = ["env/staging"].into_iter().collect();
    let on_pr: LabelSet = ["updatebot", "env/staging"].into_iter().collect();
    assert!(on_pr.intersects(&filter));
    assert!(!LabelSet::new().intersects(&filter));
  }
}
