use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use crate::core::error::PromoteResult;
use crate::core::runner::{CommandRunner, SystemRunner, display_command};
use crate::rules::chart::DefaultChartResolver;
use crate::rules::document::{ConfigDocumentStore, DeclarationDocument, TomlDocumentStore};
use crate::rules::kpt::KptChange;
use crate::rules::releases::ReleaseChange;
use crate::rules::{PromoteRequest, RuleContext, RuleOutcome, apply_promotion};

/// Run the apply command: promote into a local checkout, no git or SCM
pub fn run_apply(request: PromoteRequest, dir: PathBuf, dry_run: bool) -> PromoteResult<()> {
  if dry_run {
    let store = DryRunStore::default();
    let runner = DryRunRunner;
    let ctx = RuleContext {
      runner: &runner,
      store: &store,
      resolver: &DefaultChartResolver,
    };
    let outcome = apply_promotion(&ctx, &dir, &request)?;

    println!("🔍 Dry-run mode (no changes applied)");
    println!();
    print_outcome(&outcome);
    let diffs = store.diffs(&dir);
    if diffs.is_empty() {
      println!("No file changes");
    }
    for diff in diffs {
      print!("{}", diff);
    }
    return Ok(());
  }

  let runner = SystemRunner::new();
  let ctx = RuleContext {
    runner: &runner,
    store: &TomlDocumentStore,
    resolver: &DefaultChartResolver,
  };
  let outcome = apply_promotion(&ctx, &dir, &request)?;
  print_outcome(&outcome);
  Ok(())
}

fn print_outcome(outcome: &RuleOutcome) {
  match outcome {
    RuleOutcome::Releases(ReleaseChange::Updated { name, .. }) => println!("✅ Updated release {}", name),
    RuleOutcome::Releases(ReleaseChange::Appended { name }) => println!("✅ Added release {}", name),
    RuleOutcome::Kpt(KptChange::Updated { app, version }) => println!("✅ Updated kpt package {} to {}", app, version),
    RuleOutcome::Kpt(KptChange::Fetched { app, version }) => println!("✅ Fetched kpt package {} at {}", app, version),
  }
}

/// Keeps saved documents in memory, reading its own writes back
#[derive(Default)]
struct DryRunStore {
  /// path -> (text on disk, text after the promotion)
  pending: RefCell<BTreeMap<PathBuf, (String, String)>>,
}

impl DryRunStore {
  /// Unified diffs of every document the promotion changed
  fn diffs(&self, dir: &Path) -> Vec<String> {
    self
      .pending
      .borrow()
      .iter()
      .filter(|(_, (before, after))| before != after)
      .map(|(path, (before, after))| {
        let name = path.strip_prefix(dir).unwrap_or(path).display().to_string();
        TextDiff::from_lines(before.as_str(), after.as_str())
          .unified_diff()
          .context_radius(3)
          .header(&format!("a/{}", name), &format!("b/{}", name))
          .to_string()
      })
      .collect()
  }
}

impl ConfigDocumentStore for DryRunStore {
  fn load(&self, path: &Path) -> PromoteResult<Option<DeclarationDocument>> {
    if let Some((_, after)) = self.pending.borrow().get(path) {
      return DeclarationDocument::parse(after).map(Some);
    }
    TomlDocumentStore.load(path)
  }

  fn save(&self, path: &Path, doc: &DeclarationDocument) -> PromoteResult<()> {
    let rendered = doc.render();
    let mut pending = self.pending.borrow_mut();
    match pending.get_mut(path) {
      Some((_, after)) => *after = rendered,
      None => {
        // a missing file diffs against empty text
        let before = fs::read_to_string(path).unwrap_or_default();
        pending.insert(path.to_path_buf(), (before, rendered));
      }
    }
    Ok(())
  }
}

/// Prints commands instead of running them
struct DryRunRunner;

impl CommandRunner for DryRunRunner {
  fn run(&self, dir: &Path, program: &str, args: &[String]) -> PromoteResult<String> {
    println!("would run in {}: {}", dir.display(), display_command(program, args));
    Ok(String::new())
  }
}
