//! Chart repository alias allocation
//!
//! Finds the alias a chart repository URL is known by in a document, or picks
//! a fresh one (`dev`, `dev2`, `dev3`, ...) that does not clash with any alias
//! already in use.

use super::chart::ChartDetails;
use super::document::{DeclarationDocument, RepositoryEntry};
use crate::core::error::PromoteResult;
use std::collections::HashSet;

const OCI_SCHEME: &str = "oci://";

/// Outcome of looking a URL up in the repository registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixAllocation {
  pub prefix: String,
  /// Index of the registry entry already holding the URL
  pub existing: Option<usize>,
}

/// Pick the alias for `url` against `repositories`
pub fn allocate_prefix(repositories: &[RepositoryEntry], url: &str, default_prefix: &str) -> PrefixAllocation {
  let url = strip_oci(url);
  let existing = repositories.iter().position(|r| strip_oci(&r.url) == url);

  if let Some(index) = existing
    && !repositories[index].name.is_empty()
  {
    return PrefixAllocation {
      prefix: repositories[index].name.clone(),
      existing,
    };
  }

  let taken: HashSet<&str> = repositories
    .iter()
    .map(|r| r.name.as_str())
    .filter(|n| !n.is_empty())
    .collect();
  let prefix = if !taken.contains(default_prefix) {
    default_prefix.to_string()
  } else {
    (2u32..)
      .map(|i| format!("{}{}", default_prefix, i))
      .find(|candidate| !taken.contains(candidate.as_str()))
      .unwrap_or_else(|| default_prefix.to_string())
  };

  PrefixAllocation { prefix, existing }
}

/// Make sure the chart's repository is registered in `doc` and qualify its name
///
/// A chart that already carries a prefix is left alone. The registry only
/// grows: new URLs are appended, an unnamed entry for the URL gets the alias,
/// and an entry is flagged OCI when the chart repository is OCI (never the
/// reverse).
pub fn assign_repository_prefix(
  doc: &mut DeclarationDocument,
  chart: &mut ChartDetails,
  oci: bool,
  default_prefix: &str,
) -> PromoteResult<()> {
  if !chart.prefix.is_empty() {
    chart.set_prefix(&chart.prefix.clone());
    return Ok(());
  }

  // the registry stores OCI repositories without their scheme plus an `oci` flag
  chart.repository_url = strip_oci(&chart.repository_url).to_string();

  let repositories = doc.repositories();
  let allocation = allocate_prefix(&repositories, &chart.repository_url, default_prefix);
  match allocation.existing {
    Some(index) => {
      if repositories[index].name.is_empty() {
        doc.set_repository_name(index, &allocation.prefix)?;
      }
      if oci && !repositories[index].oci {
        doc.mark_repository_oci(index)?;
      }
    }
    None => doc.push_repository(&RepositoryEntry {
      name: allocation.prefix.clone(),
      url: chart.repository_url.clone(),
      oci,
    })?,
  }

  chart.set_prefix(&allocation.prefix);
  Ok(())
}

fn strip_oci(url: &str) -> &str {
  url.strip_prefix(OCI_SCHEME).unwrap_or(url)
}
