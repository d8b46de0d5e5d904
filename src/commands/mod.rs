//! CLI commands for env-promote
//!
//! - **promote**: open or update a promotion pull request on an environment repository
//! - **apply**: run the environment's promotion rule against a local checkout

pub mod apply;
pub mod promote;

pub use apply::run_apply;
pub use promote::{PromoteOptions, run_promote};
