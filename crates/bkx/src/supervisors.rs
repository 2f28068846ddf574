//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 "In a world where buckets must move..."
//! 🎬 "One coordinator dared to count them all."
//!
//! 📦 The Supervisor module: the [`Coordinator`] that walks the bucket list, and the
//! bucket migrator and workers it keeps on a short leash.
//!
//! Order of business, every run:
//! 1. 🔒 both service credentials present, or bail before anything else happens
//! 2. 🙋 ask the [`Confirm`] capability once; "no" ends the run with nothing touched
//! 3. 📁 acquire the staging area
//! 4. 🪣 migrate each bucket in the configured order, folding summaries into the total
//! 5. 🧹 release the staging area (best effort)
//!
//! ⚠️ Workers are the supervisor's private minions. Do not pub them.

mod bucket_migrator;
mod workers;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::app_config::AppConfig;
use crate::backends::{StorageApi, StoreBackend};
use crate::common::MigrationReport;
use crate::lister::Lister;
use crate::staging::StagingArea;
use crate::transfer::Transfer;
use bucket_migrator::BucketMigrator;

/// 🙋 The one question asked before anything is mutated.
///
/// The CLI asks a human on stdin; tests and `--yes` use [`AlwaysConfirm`].
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// ✅ Says yes. Every time. No questions asked, which is the whole point.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// 🏁 How a run ended, if it ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// 🙅 The operator said no. Nothing was touched.
    Cancelled,
    Completed(MigrationReport),
}

impl RunOutcome {
    /// 🚦 0 unless some object failed to migrate.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Cancelled => 0,
            RunOutcome::Completed(report) if report.total.is_clean() => 0,
            RunOutcome::Completed(_) => 1,
        }
    }
}

/// 📦 The Coordinator: owns the config, the stores, and (while running) the staging area.
#[derive(Debug)]
pub struct Coordinator {
    config: AppConfig,
    stores: Option<(StoreBackend, StoreBackend)>,
}

impl Coordinator {
    /// 🚀 A coordinator that will talk to the configured projects over HTTP.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            stores: None,
        }
    }

    /// 🔌 Swaps in explicit source and destination stores instead of the HTTP ones.
    pub fn with_stores(mut self, source: StoreBackend, destination: StoreBackend) -> Self {
        self.stores = Some((source, destination));
        self
    }

    /// 🧵 Runs the whole migration. `Err` only for precondition and setup failures;
    /// per-object trouble shows up in the report instead.
    pub async fn run(self, confirm: &dyn Confirm) -> Result<RunOutcome> {
        let credentials = self.config.credentials()?;
        if self.config.buckets.is_empty() {
            anyhow::bail!(
                "💀 No buckets to migrate. Pass them on the command line or set `buckets` in the config."
            );
        }

        let Coordinator { config, stores } = self;
        let (source, destination) = match stores {
            Some(stores) => stores,
            None => (
                StoreBackend::Http(
                    StorageApi::new(&config.source.url, credentials.source, &config.runtime)
                        .context("💀 Could not set up the source project client")?,
                ),
                StoreBackend::Http(
                    StorageApi::new(&config.destination.url, credentials.destination, &config.runtime)
                        .context("💀 Could not set up the destination project client")?,
                ),
            ),
        };

        info!("📦 Storage migration");
        info!("🚰 Source:      {}", config.source.url);
        info!("🕳️ Destination: {}", config.destination.url);
        info!("🪣 Buckets:     {}", config.buckets.join(", "));

        let prompt = format!(
            "⚠️ This will migrate ALL objects in {} bucket(s) from {} to {}. Continue?",
            config.buckets.len(),
            config.source.url,
            config.destination.url
        );
        if !confirm.confirm(&prompt)? {
            info!("🙅 Migration cancelled");
            return Ok(RunOutcome::Cancelled);
        }

        let staging = StagingArea::acquire(&config.staging.root).await?;
        let source = Arc::new(source);
        let migrator = BucketMigrator::new(
            Lister::new(source.clone(), config.listing.clone()),
            Transfer::new(source, Arc::new(destination), staging.root()),
            config.runtime.clone(),
        );

        let mut report = MigrationReport::default();
        for bucket in &config.buckets {
            let summary = migrator.migrate_bucket(bucket, &staging).await;
            report.push(bucket.as_str(), summary);
        }

        info!("🧹 Cleaning up temporary files...");
        if config.staging.retain_on_failure && !report.total.is_clean() {
            staging.retain();
        } else {
            staging.release().await;
        }

        info!(
            "🏁 Migration complete: {} total, {} migrated, {} failed",
            report.total.total, report.total.success, report.total.failed
        );
        Ok(RunOutcome::Completed(report))
    }
}
