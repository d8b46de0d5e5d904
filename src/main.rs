mod commands;
mod core;
mod promote;
mod rules;
mod scm;
mod utils;

use clap::{Args, Parser, Subcommand};
use core::error::{PromoteError, print_error};
use rules::PromoteRequest;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "ENV_PROMOTE_LOG";

/// Promote application versions into GitOps environment repositories
#[derive(Parser)]
#[command(name = "env-promote")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Log debug output (overrides ENV_PROMOTE_LOG)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Open or update a pull request promoting an app on an environment repository
  Promote {
    #[command(flatten)]
    request: RequestArgs,
    /// Git URL of the environment repository
    #[arg(long)]
    git_url: String,
    /// Clone into this (empty) directory instead of a temporary one
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Push to a fork of the environment repository
    #[arg(long)]
    fork: bool,
    /// Label to add to the pull request (repeatable)
    #[arg(long = "label")]
    labels: Vec<String>,
    /// Add the auto-merge label
    #[arg(long)]
    auto_merge: bool,
    /// Pull request and commit title
    #[arg(long)]
    title: Option<String>,
    /// Pull request and commit message
    #[arg(long)]
    message: Option<String>,
    /// Changelog appended below the changelog separator
    #[arg(long)]
    changelog: Option<String>,
  },

  /// Apply the promotion rule to a local checkout without git or SCM
  Apply {
    #[command(flatten)]
    request: RequestArgs,
    /// Environment repository checkout
    #[arg(long, default_value = ".")]
    dir: PathBuf,
    /// Print a diff instead of writing files
    #[arg(long)]
    dry_run: bool,
  },
}

/// What to promote
#[derive(Args)]
struct RequestArgs {
  /// Application (chart) name, optionally `prefix/name`
  #[arg(long)]
  app: String,
  /// Version to promote
  #[arg(long)]
  app_version: String,
  /// Release name (defaults to the chart's local name)
  #[arg(long)]
  release_name: Option<String>,
  /// Target namespace
  #[arg(long)]
  namespace: Option<String>,
  /// Keep old releases: always add a new versioned release
  #[arg(long)]
  keep_old_releases: bool,
  /// Source repository of the app (needed by the kpt rule)
  #[arg(long)]
  app_git_url: Option<String>,
}

impl From<RequestArgs> for PromoteRequest {
  fn from(args: RequestArgs) -> Self {
    PromoteRequest {
      app_name: args.app,
      version: args.app_version,
      release_name: args.release_name,
      namespace: args.namespace,
      keep_old_releases: args.keep_old_releases,
      app_git_url: args.app_git_url,
      ..Default::default()
    }
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result = match cli.command {
    Commands::Promote {
      request,
      git_url,
      dir,
      fork,
      labels,
      auto_merge,
      title,
      message,
      changelog,
    } => commands::run_promote(
      request.into(),
      commands::PromoteOptions {
        git_url,
        dir,
        fork,
        labels,
        auto_merge,
        title,
        message,
        changelog,
      },
    ),
    Commands::Apply { request, dir, dry_run } => commands::run_apply(request.into(), dir, dry_run),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: PromoteError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
