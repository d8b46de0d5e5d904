//! Release declaration documents
//!
//! A document is a TOML file edited losslessly with `toml_edit`: comments,
//! key order and keys this tool does not know about all survive a round trip.
//!
//! ```toml
//! override_namespace = "staging"   # nested documents only
//!
//! [[repositories]]
//! name = "dev"
//! url = "charts.acme.dev"
//! oci = true
//!
//! [[releases]]
//! name = "foo"
//! chart = "dev/foo"
//! version = "1.2.0"
//! namespace = "jx"
//!
//! [[includes]]
//! path = "namespaces/*/releases.toml"
//! ```

use crate::core::error::{PromoteError, PromoteResult, ResultExt};
use std::fs;
use std::path::Path;
use toml_edit::{ArrayOfTables, DocumentMut, Item, Table, value};

const RELEASES: &str = "releases";
const REPOSITORIES: &str = "repositories";
const INCLUDES: &str = "includes";
const OVERRIDE_NAMESPACE: &str = "override_namespace";

/// One release of a chart into a namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseDeclaration {
  pub name: String,
  pub chart: String,
  pub version: String,
  /// Empty when inherited from the document's override namespace
  pub namespace: String,
}

/// A chart repository alias
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryEntry {
  pub name: String,
  pub url: String,
  pub oci: bool,
}

/// A release declaration document
#[derive(Debug, Clone, Default)]
pub struct DeclarationDocument {
  doc: DocumentMut,
}

impl DeclarationDocument {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse a document, checking the known sections have the expected shape
  pub fn parse(text: &str) -> PromoteResult<Self> {
    let mut doc: DocumentMut = text.parse()?;
    for key in [RELEASES, REPOSITORIES, INCLUDES] {
      let Some(item) = doc.get(key) else { continue };
      if item.is_array_of_tables() {
        continue;
      }
      // `releases = []` or inline tables are accepted and normalised
      let item = doc.remove(key).unwrap_or_default();
      let empty = item.as_array().is_some_and(|a| a.is_empty());
      let converted = if empty {
        Ok(ArrayOfTables::new())
      } else {
        item.into_array_of_tables()
      };
      match converted {
        Ok(tables) => {
          doc.insert(key, Item::ArrayOfTables(tables));
        }
        Err(_) => {
          return Err(PromoteError::message(format!("`{}` must be an array of tables", key)));
        }
      }
    }
    if let Some(item) = doc.get(OVERRIDE_NAMESPACE)
      && !item.is_str()
    {
      return Err(PromoteError::message(format!("`{}` must be a string", OVERRIDE_NAMESPACE)));
    }
    Ok(Self { doc })
  }

  fn tables(&self, key: &str) -> impl Iterator<Item = &Table> {
    self
      .doc
      .get(key)
      .and_then(Item::as_array_of_tables)
      .into_iter()
      .flat_map(ArrayOfTables::iter)
  }

  fn tables_mut(&mut self, key: &str) -> PromoteResult<&mut ArrayOfTables> {
    self
      .doc
      .entry(key)
      .or_insert(Item::ArrayOfTables(ArrayOfTables::new()))
      .as_array_of_tables_mut()
      .ok_or_else(|| PromoteError::message(format!("`{}` must be an array of tables", key)))
  }

  fn table_mut(&mut self, key: &str, index: usize) -> PromoteResult<&mut Table> {
    self
      .tables_mut(key)?
      .get_mut(index)
      .ok_or_else(|| PromoteError::message(format!("no entry {} in `{}`", index, key)))
  }

  pub fn releases(&self) -> Vec<ReleaseDeclaration> {
    self
      .tables(RELEASES)
      .map(|t| ReleaseDeclaration {
        name: str_field(t, "name"),
        chart: str_field(t, "chart"),
        version: str_field(t, "version"),
        namespace: str_field(t, "namespace"),
      })
      .collect()
  }

  /// Change only the version of an existing release
  pub fn set_release_version(&mut self, index: usize, version: &str) -> PromoteResult<()> {
    self.table_mut(RELEASES, index)?.insert("version", value(version));
    Ok(())
  }

  /// Append a release; an empty namespace is left out of the file
  pub fn push_release(&mut self, release: &ReleaseDeclaration) -> PromoteResult<()> {
    let mut table = Table::new();
    table.insert("name", value(release.name.as_str()));
    table.insert("chart", value(release.chart.as_str()));
    table.insert("version", value(release.version.as_str()));
    if !release.namespace.is_empty() {
      table.insert("namespace", value(release.namespace.as_str()));
    }
    self.tables_mut(RELEASES)?.push(table);
    Ok(())
  }

  pub fn repositories(&self) -> Vec<RepositoryEntry> {
    self
      .tables(REPOSITORIES)
      .map(|t| RepositoryEntry {
        name: str_field(t, "name"),
        url: str_field(t, "url"),
        oci: t.get("oci").and_then(Item::as_bool).unwrap_or(false),
      })
      .collect()
  }

  pub fn push_repository(&mut self, repository: &RepositoryEntry) -> PromoteResult<()> {
    let mut table = Table::new();
    table.insert("name", value(repository.name.as_str()));
    table.insert("url", value(repository.url.as_str()));
    if repository.oci {
      table.insert("oci", value(true));
    }
    self.tables_mut(REPOSITORIES)?.push(table);
    Ok(())
  }

  /// Name an existing repository entry that had no alias
  pub fn set_repository_name(&mut self, index: usize, name: &str) -> PromoteResult<()> {
    self.table_mut(REPOSITORIES, index)?.insert("name", value(name));
    Ok(())
  }

  pub fn mark_repository_oci(&mut self, index: usize) -> PromoteResult<()> {
    self.table_mut(REPOSITORIES, index)?.insert("oci", value(true));
    Ok(())
  }

  /// Namespace inherited by releases that declare none (empty when unset)
  pub fn override_namespace(&self) -> String {
    self
      .doc
      .get(OVERRIDE_NAMESPACE)
      .and_then(Item::as_str)
      .unwrap_or_default()
      .to_string()
  }

  pub fn set_override_namespace(&mut self, namespace: &str) {
    self.doc.insert(OVERRIDE_NAMESPACE, value(namespace));
  }

  /// Paths (or glob patterns) of linked nested documents
  pub fn includes(&self) -> Vec<String> {
    self.tables(INCLUDES).map(|t| str_field(t, "path")).collect()
  }

  pub fn push_include(&mut self, path: &str) -> PromoteResult<()> {
    let mut table = Table::new();
    table.insert("path", value(path));
    self.tables_mut(INCLUDES)?.push(table);
    Ok(())
  }

  pub fn render(&self) -> String {
    self.doc.to_string()
  }
}

fn str_field(table: &Table, key: &str) -> String {
  table.get(key).and_then(Item::as_str).unwrap_or_default().to_string()
}

/// Loads and saves declaration documents
pub trait ConfigDocumentStore {
  /// `None` when there is no document at `path`
  fn load(&self, path: &Path) -> PromoteResult<Option<DeclarationDocument>>;

  /// Write `doc`, creating parent directories as needed
  fn save(&self, path: &Path, doc: &DeclarationDocument) -> PromoteResult<()>;
}

/// Documents stored as TOML files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlDocumentStore;

impl ConfigDocumentStore for TomlDocumentStore {
  fn load(&self, path: &Path) -> PromoteResult<Option<DeclarationDocument>> {
    if !path.exists() {
      return Ok(None);
    }
    let text = fs::read_to_string(path).with_context(|| format!("failed to load file {}", path.display()))?;
    DeclarationDocument::parse(&text)
      .with_context(|| format!("failed to parse file {}", path.display()))
      .map(Some)
  }

  fn save(&self, path: &Path, doc: &DeclarationDocument) -> PromoteResult<()> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory for declarations {}", parent.display()))?;
    }
    fs::write(path, doc.render()).with_context(|| format!("failed to save file {}", path.display()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"# staging environment
[[repositories]]
name = "dev"
url = "http://chartmuseum:8080"

[[releases]]
name = "foo"
chart = "dev/foo"
version = "1.0.0"
namespace = "jx"
values = ["values/foo.yaml"] # keep me
"#;

  #[test]
  fn test_reads_sections() {
    let doc = DeclarationDocument::parse(SAMPLE).unwrap();
    let releases = doc.releases();
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].name, "foo");
    assert_eq!(releases[0].namespace, "jx");
    assert_eq!(doc.repositories()[0].name, "dev");
    assert!(doc.override_namespace().is_empty());
    assert!(doc.includes().is_empty());
  }

  #[test]
  fn test_version_update_preserves_everything_else() {
    let mut doc = DeclarationDocument::parse(SAMPLE).unwrap();
    doc.set_release_version(0, "1.2.0").unwrap();
    let text = doc.render();
    assert!(text.contains("version = \"1.2.0\""));
    assert!(text.contains("# staging environment"));
    assert!(text.contains("values = [\"values/foo.yaml\"] # keep me"));
  }

  #[test]
  fn test_push_release_omits_empty_namespace() {
    let mut doc = DeclarationDocument::new();
    doc
      .push_release(&ReleaseDeclaration {
        name: "bar".to_string(),
        chart: "dev/bar".to_string(),
        version: "1.0.0".to_string(),
        namespace: String::new(),
      })
      .unwrap();
    doc.set_override_namespace("staging");

    let reparsed = DeclarationDocument::parse(&doc.render()).unwrap();
    assert_eq!(reparsed.override_namespace(), "staging");
    assert_eq!(reparsed.releases()[0].namespace, "");
    assert!(!doc.render().contains("namespace = \"\""));
  }

  #[test]
  fn test_empty_inline_array_is_normalised() {
    let mut doc = DeclarationDocument::parse("releases = []\n").unwrap();
    assert!(doc.releases().is_empty());
    doc
      .push_release(&ReleaseDeclaration {
        name: "foo".to_string(),
        ..Default::default()
      })
      .unwrap();
    assert_eq!(doc.releases().len(), 1);
  }

  #[test]
  fn test_wrong_shapes_rejected() {
    assert!(DeclarationDocument::parse("releases = \"foo\"\n").is_err());
    assert!(DeclarationDocument::parse("override_namespace = 3\n").is_err());
  }

  #[test]
  fn test_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("namespaces/staging/releases.toml");
    let store = TomlDocumentStore;
    assert!(store.load(&path).unwrap().is_none());

    let mut doc = DeclarationDocument::new();
    doc.push_include("namespaces/*/releases.toml").unwrap();
    store.save(&path, &doc).unwrap();

    let loaded = store.load(&path).unwrap().unwrap();
    assert_eq!(loaded.includes(), vec!["namespaces/*/releases.toml"]);
  }
}
