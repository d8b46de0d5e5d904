//! Chart naming for a promoted app

use crate::core::error::{ConfigError, PromoteError, PromoteResult};

/// Chart coordinates resolved once per promotion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartDetails {
  /// Chart reference written into declarations (`prefix/local_name` once a prefix is known)
  pub chart_name: String,
  /// Chart name without repository prefix; default release name
  pub local_name: String,
  pub repository_url: String,
  /// Repository alias; empty until allocated
  pub prefix: String,
}

impl ChartDetails {
  /// Fill in the prefix (an explicit one wins) and qualify the chart name
  pub fn set_prefix(&mut self, prefix: &str) {
    if self.prefix.is_empty() {
      self.prefix = prefix.to_string();
    }
    self.chart_name = format!("{}/{}", self.prefix, self.local_name);
  }
}

/// Looks up chart coordinates for an app
pub trait ChartResolver {
  fn chart_details(&self, app: &str, repository_url: &str) -> PromoteResult<ChartDetails>;
}

/// Derives chart details from the app name alone
///
/// `app` may carry an explicit repository prefix (`myrepo/my-app`); otherwise
/// the prefix is allocated later against the document's repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultChartResolver;

impl ChartResolver for DefaultChartResolver {
  fn chart_details(&self, app: &str, repository_url: &str) -> PromoteResult<ChartDetails> {
    if app.is_empty() {
      return Err(PromoteError::Config(ConfigError::MissingField {
        field: "app name".to_string(),
      }));
    }
    let (prefix, local_name) = match app.split_once('/') {
      Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (prefix, local),
      _ => ("", app),
    };
    Ok(ChartDetails {
      chart_name: app.to_string(),
      local_name: local_name.to_string(),
      repository_url: repository_url.to_string(),
      prefix: prefix.to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_plain_app() {
    let mut d = DefaultChartResolver.chart_details("foo", "http://charts").unwrap();
    assert_eq!(d.local_name, "foo");
    assert!(d.prefix.is_empty());
    d.set_prefix("dev");
    assert_eq!(d.chart_name, "dev/foo");
  }

  #[test]
  fn test_prefixed_app_keeps_prefix() {
    let mut d = DefaultChartResolver.chart_details("stable/foo", "http://charts").unwrap();
    assert_eq!(d.prefix, "stable");
    assert_eq!(d.local_name, "foo");
    d.set_prefix("dev");
    assert_eq!(d.chart_name, "stable/foo");
  }

  #[test]
  fn test_empty_app_rejected() {
    assert!(DefaultChartResolver.chart_details("", "http://charts").is_err());
  }
}
