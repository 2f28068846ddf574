//! 🪣 bkx: moves every object in a list of storage buckets from one project to another.
//!
//! 🎬 *[narrator voice]* "Two projects. Five buckets. One temp directory. No rollback."
//!
//! List the source bucket, download each object into a staging directory, upload it to
//! the same bucket and path in the destination, clean up. Failures are counted per object
//! and reported at the end, they don't stop the run.

pub mod app_config;
pub mod backends;
pub mod common;
mod lister;
pub mod progress;
mod staging;
mod supervisors;
mod transfer;

use anyhow::{Context, Result};

use crate::app_config::AppConfig;
pub use crate::supervisors::{AlwaysConfirm, Confirm, Coordinator, RunOutcome};

/// 🚀 Runs one full migration against the HTTP storage APIs named in `config`.
pub async fn run(config: AppConfig, confirm: &dyn Confirm) -> Result<RunOutcome> {
    Coordinator::new(config)
        .run(confirm)
        .await
        .context("💀 Storage migration aborted")
}
