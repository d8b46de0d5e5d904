//! Tests for the `promote` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_promote_rejects_unsupported_git_server() -> Result<()> {
  let env = TestEnvironment::new()?;
  env.write_file("promote.toml", "[scm]\nkind = \"gitlab\"\n")?;

  let output = run_env_promote_expecting_failure(
    &env.path,
    &[
      "promote",
      "--app",
      "foo",
      "--app-version",
      "1.2.0",
      "--git-url",
      "https://gitlab.example.com/acme/env-staging.git",
    ],
  )?;

  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("failed to create SCM client"));
  assert!(err.contains("gitlab"));

  Ok(())
}

#[test]
fn test_promote_rejects_bad_git_url() -> Result<()> {
  let env = TestEnvironment::new()?;

  let output = run_env_promote_expecting_failure(
    &env.path,
    &["promote", "--app", "foo", "--app-version", "1.2.0", "--git-url", "github.com"],
  )?;
  assert!(stderr(&output).contains("failed to parse git URL github.com"));

  Ok(())
}

#[test]
fn test_promote_requires_git_url() -> Result<()> {
  let env = TestEnvironment::new()?;

  let output = run_env_promote_expecting_failure(&env.path, &["promote", "--app", "foo", "--app-version", "1.2.0"])?;
  assert!(stderr(&output).contains("--git-url"));

  Ok(())
}
