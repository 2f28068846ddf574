//! 📦 BucketMigrator: list one bucket, push every object through the workers, add it all up.
//!
//! With the default single worker this is the plain sequential loop: listing order,
//! one object fully done before the next one starts. More workers share one bounded
//! channel; each object still lives its whole download-upload-cleanup life in one worker.
//! No rollback: what already landed stays landed.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::workers::{TransferWorker, Worker};
use crate::app_config::RuntimeConfig;
use crate::common::{BucketJob, RunSummary};
use crate::lister::Lister;
use crate::progress::{BucketProgress, format_bytes, format_number};
use crate::staging::StagingArea;
use crate::transfer::Transfer;

#[derive(Debug)]
pub(in crate::supervisors) struct BucketMigrator {
    lister: Lister,
    transfer: Transfer,
    runtime: RuntimeConfig,
}

impl BucketMigrator {
    pub(in crate::supervisors) fn new(lister: Lister, transfer: Transfer, runtime: RuntimeConfig) -> Self {
        Self {
            lister,
            transfer,
            runtime,
        }
    }

    /// 🪣 Migrates every object of `bucket`, returning its `{total, success, failed}`.
    ///
    /// Never fails as a whole: listing, staging, and transfer problems all end up as
    /// warnings or failed counts.
    pub(in crate::supervisors) async fn migrate_bucket(
        &self,
        bucket: &str,
        staging: &StagingArea,
    ) -> RunSummary {
        info!("📦 Migrating bucket '{}'", bucket);
        info!("📋 Listing objects in the source project...");
        let job = BucketJob::new(bucket, self.lister.list(bucket).await);

        if job.is_empty() {
            info!("ℹ️ No objects found in '{}'", bucket);
            return RunSummary::default();
        }

        let listed = job.objects.len();
        info!(
            "📊 Found {} objects ({}) in '{}'",
            format_number(listed as u64),
            format_bytes(job.total_bytes()),
            bucket
        );

        // -- 📁 if this fails, every object fails at its own stage step and gets counted there
        if let Err(err) = staging.ensure_bucket_dir(bucket).await {
            warn!("⚠️ {:#}", err);
        }

        let progress = Arc::new(BucketProgress::new(bucket, listed as u64, job.total_bytes()));
        let (tx, rx) = async_channel::bounded(self.runtime.queue_capacity.max(1));
        let bucket_name: Arc<str> = Arc::from(bucket);
        let workers = self.runtime.transfer_parallelism.clamp(1, listed);

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                TransferWorker::new(
                    id,
                    bucket_name.clone(),
                    listed,
                    rx.clone(),
                    self.transfer.clone(),
                    progress.clone(),
                )
                .start()
            })
            .collect();
        // -- 🔒 only the workers hold receivers now; if they all die, send() starts failing
        drop(rx);

        for (index, record) in job.objects.into_iter().enumerate() {
            if tx.send((index + 1, record)).await.is_err() {
                error!("💀 every transfer worker for '{}' is gone; stopping the feed", bucket);
                break;
            }
        }
        drop(tx);

        let mut summary = RunSummary::default();
        let mut lost_a_worker = false;
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(worker_summary) => summary += worker_summary,
                Err(err) => {
                    error!("💀 a transfer worker for '{}' died: {}", bucket, err);
                    lost_a_worker = true;
                }
            }
        }
        // -- 🧮 a dead worker's tally died with it; the shared counters still have its outcomes
        if lost_a_worker {
            summary = progress.snapshot();
        }

        // -- 💀 objects that never got an outcome still count, as failures
        let unaccounted = (listed as u64).saturating_sub(summary.total);
        if unaccounted > 0 {
            error!(
                "💀 {} objects in '{}' have no outcome; counting them as failed",
                unaccounted, bucket
            );
            summary.total += unaccounted;
            summary.failed += unaccounted;
        }

        progress.finish(&summary);
        summary
    }
}
