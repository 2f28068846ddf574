//! 🎬 *[a channel fills with object records. somewhere, a worker waits.]*
//!
//! 🚚 The TransferWorker drains a queue of `(index, ObjectRecord)` pairs and runs each one
//! through [`Transfer`] start to finish before picking up the next. Download, upload and
//! cleanup of one object never get split across workers.

use std::sync::Arc;

use async_channel::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::Worker;
use crate::common::{ObjectRecord, RunSummary};
use crate::progress::BucketProgress;
use crate::transfer::Transfer;

/// 🚚 Pulls records off the channel, transfers them, keeps its own score.
#[derive(Debug)]
pub(in crate::supervisors) struct TransferWorker {
    id: usize,
    bucket: Arc<str>,
    total: usize,
    rx: Receiver<(usize, ObjectRecord)>,
    transfer: Transfer,
    progress: Arc<BucketProgress>,
}

impl TransferWorker {
    pub(in crate::supervisors) fn new(
        id: usize,
        bucket: Arc<str>,
        total: usize,
        rx: Receiver<(usize, ObjectRecord)>,
        transfer: Transfer,
        progress: Arc<BucketProgress>,
    ) -> Self {
        Self {
            id,
            bucket,
            total,
            rx,
            transfer,
            progress,
        }
    }
}

impl Worker for TransferWorker {
    fn start(self) -> JoinHandle<RunSummary> {
        tokio::spawn(async move {
            debug!("🧵 transfer worker {} on '{}' started", self.id, self.bucket);
            let mut summary = RunSummary::default();

            // -- 🏁 Err here means the channel is empty and closed: the feeder is done
            while let Ok((index, record)) = self.rx.recv().await {
                info!(
                    "📄 [{}/{}] {}/{}",
                    index, self.total, self.bucket, record.relative_path
                );
                let outcome = self.transfer.transfer(&self.bucket, &record).await;
                summary.record(&outcome);
                self.progress.record(&outcome);
            }

            debug!(
                "🏁 transfer worker {} on '{}' done: {:?}",
                self.id, self.bucket, summary
            );
            summary
        })
    }
}
