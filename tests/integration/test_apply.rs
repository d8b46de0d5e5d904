//! Tests for the `apply` command

use crate::helpers::*;
use anyhow::Result;

const FLAT: &str = r#"# staging environment
[[repositories]]
name = "dev"
url = "http://chartmuseum:8080"

[[releases]]
name = "foo"
chart = "dev/foo"
version = "1.0.0"
namespace = "jx"
"#;

fn dir_arg(env: &TestEnvironment) -> String {
  env.path.display().to_string()
}

#[test]
fn test_apply_updates_release_in_place() -> Result<()> {
  let env = TestEnvironment::with_releases(FLAT)?;

  let output = run_env_promote(
    &env.path,
    &["apply", "--app", "foo", "--app-version", "1.2.0", "--dir", &dir_arg(&env)],
  )?;
  assert!(stdout(&output).contains("Updated release foo"));

  let releases = env.read_file("releases.toml")?;
  assert!(releases.starts_with("# staging environment"));
  assert!(releases.contains("version = \"1.2.0\""));
  assert!(!releases.contains("1.0.0"));
  assert_eq!(releases.matches("[[releases]]").count(), 1);
  assert_eq!(releases.matches("[[repositories]]").count(), 1);

  Ok(())
}

#[test]
fn test_apply_appends_new_app() -> Result<()> {
  let env = TestEnvironment::with_releases(FLAT)?;

  run_env_promote(
    &env.path,
    &["apply", "--app", "bar", "--app-version", "0.3.0", "--dir", &dir_arg(&env)],
  )?;

  let releases = env.read_file("releases.toml")?;
  assert_eq!(releases.matches("[[releases]]").count(), 2);
  assert!(releases.contains("name = \"bar\""));
  assert!(releases.contains("chart = \"dev/bar\""));
  assert!(releases.contains("version = \"1.0.0\""));

  Ok(())
}

#[test]
fn test_apply_keep_old_releases() -> Result<()> {
  let env = TestEnvironment::with_releases(FLAT)?;

  run_env_promote(
    &env.path,
    &[
      "apply",
      "--app",
      "foo",
      "--app-version",
      "2.0.0",
      "--keep-old-releases",
      "--dir",
      &dir_arg(&env),
    ],
  )?;

  let releases = env.read_file("releases.toml")?;
  assert!(releases.contains("name = \"foo\""));
  assert!(releases.contains("version = \"1.0.0\""));
  assert!(releases.contains("name = \"foo-2-0-0\""));
  assert!(releases.contains("version = \"2.0.0\""));

  Ok(())
}

#[test]
fn test_apply_nested_document() -> Result<()> {
  let env = TestEnvironment::new()?;
  env.write_file(
    "promote.toml",
    "[rules.releases]\npath = \"namespaces/staging/releases.toml\"\n",
  )?;

  run_env_promote(
    &env.path,
    &[
      "apply",
      "--app",
      "bar",
      "--app-version",
      "1.0.0",
      "--namespace",
      "staging",
      "--dir",
      &dir_arg(&env),
    ],
  )?;

  let nested = env.read_file("namespaces/staging/releases.toml")?;
  assert!(nested.contains("override_namespace = \"staging\""));
  assert!(nested.contains("name = \"bar\""));
  assert!(!nested.contains("\nnamespace ="));

  assert!(env.file_exists("releases.toml"));
  let root = env.read_file("releases.toml")?;
  assert!(root.contains("path = \"namespaces/staging/releases.toml\""));

  // promoting again neither duplicates the link nor the release
  run_env_promote(
    &env.path,
    &[
      "apply",
      "--app",
      "bar",
      "--app-version",
      "1.1.0",
      "--namespace",
      "staging",
      "--dir",
      &dir_arg(&env),
    ],
  )?;
  let root = env.read_file("releases.toml")?;
  assert_eq!(root.matches("namespaces/staging/releases.toml").count(), 1);
  let nested = env.read_file("namespaces/staging/releases.toml")?;
  assert_eq!(nested.matches("[[releases]]").count(), 1);
  assert!(nested.contains("version = \"1.1.0\""));

  Ok(())
}

#[test]
fn test_apply_dry_run_leaves_files_untouched() -> Result<()> {
  let env = TestEnvironment::with_releases(FLAT)?;

  let output = run_env_promote(
    &env.path,
    &[
      "apply",
      "--app",
      "foo",
      "--app-version",
      "1.5.0",
      "--dry-run",
      "--dir",
      &dir_arg(&env),
    ],
  )?;

  let out = stdout(&output);
  assert!(out.contains("Dry-run"));
  assert!(out.contains("-version = \"1.0.0\""));
  assert!(out.contains("+version = \"1.5.0\""));
  assert_eq!(env.read_file("releases.toml")?, FLAT);

  Ok(())
}

#[test]
fn test_apply_rejects_conflicting_rules() -> Result<()> {
  let env = TestEnvironment::with_releases(FLAT)?;
  env.write_file("promote.toml", "[rules.releases]\n\n[rules.kpt]\npath = \"apps\"\n")?;

  let output = run_env_promote_expecting_failure(
    &env.path,
    &["apply", "--app", "foo", "--app-version", "1.2.0", "--dir", &dir_arg(&env)],
  )?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("only one of"));
  assert_eq!(env.read_file("releases.toml")?, FLAT);

  Ok(())
}

#[test]
fn test_apply_kpt_requires_app_git_url() -> Result<()> {
  let env = TestEnvironment::new()?;
  env.write_file("promote.toml", "[rules.kpt]\npath = \"apps\"\n")?;

  let output = run_env_promote_expecting_failure(
    &env.path,
    &["apply", "--app", "foo", "--app-version", "1.2.0", "--dir", &dir_arg(&env)],
  )?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("git URL of app foo"));

  Ok(())
}
