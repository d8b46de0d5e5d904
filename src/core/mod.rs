//! Building blocks shared by every env-promote operation
//!
//! - **config**: promote.toml parsing and validation
//! - **error**: error types with contextual help messages and exit codes
//! - **redact**: credential scrubbing for logs and errors
//! - **runner**: external process execution (git, gh, kpt)
//! - **vcs**: git operations on a working tree (SystemGit)

pub mod config;
pub mod error;
pub mod redact;
pub mod runner;
pub mod vcs;
