//! 🚚 Transfer: one object, one trip. Download, stage, upload, tidy up.
//!
//! 🎬 *[an object leaves the source project. it will never be the same.]*
//!
//! Every step is attempted exactly once. No retries live here. Every failure turns into a
//! [`TransferOutcome`] instead of an error, because one broken PDF has no business stopping
//! the other nine thousand.
//!
//! | step      | fails as         | local trace afterwards        |
//! |-----------|------------------|-------------------------------|
//! | download  | `DownloadFailed` | none                          |
//! | stage     | `DownloadFailed` | none (partial file removed)   |
//! | upload    | `UploadFailed`   | staged file kept for autopsy  |
//! | success   | `Success`        | staged file removed           |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::backends::{ObjectStore, StoreBackend};
use crate::common::{ObjectRecord, TransferOutcome};
use crate::staging::staged_path;

/// 🚚 Everything one object needs to get from A to B.
///
/// Cheap to clone: the stores are behind `Arc`s, so every worker gets its own copy.
#[derive(Debug, Clone)]
pub struct Transfer {
    source: Arc<StoreBackend>,
    destination: Arc<StoreBackend>,
    staging_root: PathBuf,
}

impl Transfer {
    pub fn new(
        source: Arc<StoreBackend>,
        destination: Arc<StoreBackend>,
        staging_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            destination,
            staging_root: staging_root.into(),
        }
    }

    /// 🎯 Moves `bucket/record.relative_path` from source to destination.
    ///
    /// Rerunning on an object that already made it is a plain overwrite with the same bytes.
    pub async fn transfer(&self, bucket: &str, record: &ObjectRecord) -> TransferOutcome {
        let path = &record.relative_path;

        debug!("⬇️ downloading '{}/{}' from source", bucket, path);
        let staged = match self.download_and_stage(bucket, record).await {
            Ok(staged) => staged,
            Err(err) => {
                warn!("❌ download of '{}/{}' failed: {:#}", bucket, path, err);
                return TransferOutcome::DownloadFailed(record.clone());
            }
        };
        info!("✅ downloaded '{}/{}' ({} bytes)", bucket, path, record.size_bytes);

        debug!("⬆️ uploading '{}/{}' to destination", bucket, path);
        if let Err(err) = self.upload_staged(bucket, record, &staged).await {
            warn!(
                "❌ upload of '{}/{}' failed: {:#}. Staged copy kept at '{}'",
                bucket,
                path,
                err,
                staged.display()
            );
            return TransferOutcome::UploadFailed(record.clone());
        }
        info!("✅ uploaded '{}/{}'", bucket, path);

        // -- 🧹 best effort; a leftover file is the staging area's problem at release time
        if let Err(err) = tokio::fs::remove_file(&staged).await {
            debug!("🧹 could not remove staged '{}': {}", staged.display(), err);
        }
        TransferOutcome::Success(record.clone())
    }

    async fn download_and_stage(&self, bucket: &str, record: &ObjectRecord) -> Result<PathBuf> {
        // -- 🔒 validate the local path before spending bandwidth on it
        let staged = staged_path(&self.staging_root, bucket, &record.relative_path)?;
        let bytes = self.source.download(bucket, &record.relative_path).await?;

        if let Err(err) = write_staged(&staged, &bytes).await {
            if let Err(cleanup) = tokio::fs::remove_file(&staged).await {
                debug!("🧹 no partial file to remove at '{}': {}", staged.display(), cleanup);
            }
            return Err(err);
        }
        Ok(staged)
    }

    async fn upload_staged(&self, bucket: &str, record: &ObjectRecord, staged: &Path) -> Result<()> {
        let bytes = tokio::fs::read(staged)
            .await
            .with_context(|| format!("💀 staged file '{}' vanished before upload", staged.display()))?;
        self.destination
            .upload(bucket, &record.relative_path, bytes)
            .await
    }
}

async fn write_staged(staged: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = staged.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("💀 could not create '{}'", parent.display()))?;
    }
    tokio::fs::write(staged, bytes)
        .await
        .with_context(|| format!("💀 could not stage '{}'", staged.display()))
}
