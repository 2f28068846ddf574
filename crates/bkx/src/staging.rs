//! 📁 The staging area, where objects nap between download and upload.
//!
//! One root directory, one subdirectory per bucket, mirroring each bucket's own
//! relative paths. Acquired before any bucket runs. Released (best effort) when the
//! run is over, or on drop if the run bailed out early. A failed cleanup is a warning,
//! never an error: the objects are already where they need to be. 🦆

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// 📁 Exclusive owner of the staging tree for the lifetime of one run.
#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    released: bool,
}

impl StagingArea {
    /// 🏗️ Creates the root (and any missing parents).
    ///
    /// 🔒 An existing root must be empty. Release wipes the whole tree, so a root that
    /// already holds files we didn't write is refused.
    pub async fn acquire(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if let Ok(mut existing) = tokio::fs::read_dir(&root).await {
            let occupied = existing
                .next_entry()
                .await
                .with_context(|| format!("💀 Could not inspect staging directory '{}'", root.display()))?
                .is_some();
            if occupied {
                anyhow::bail!(
                    "💀 Staging directory '{}' already exists and is not empty. It gets deleted \
                     after the run, so point `staging.root` at a fresh path or empty it first.",
                    root.display()
                );
            }
        }
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("💀 Could not create staging directory '{}'", root.display()))?;
        debug!("📁 staging area ready at '{}'", root.display());
        Ok(Self {
            root,
            released: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 📁 `root/bucket`, created if missing. Bucket names that aren't a single path segment are refused.
    pub async fn ensure_bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        let dir = self.root.join(safe_segment(bucket)?);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("💀 Could not create staging directory '{}'", dir.display()))?;
        Ok(dir)
    }

    /// 🧹 Best-effort recursive removal. Logs, never fails.
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => info!("🧹 staging area '{}' cleaned up", self.root.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("🧹 staging area '{}' was already gone", self.root.display())
            }
            Err(err) => warn!(
                "⚠️ could not remove staging area '{}': {}. Please delete it manually.",
                self.root.display(),
                err
            ),
        }
    }

    /// 🔍 Leaves the tree on disk for an operator to inspect.
    pub fn retain(mut self) -> PathBuf {
        self.released = true;
        warn!(
            "🔍 staging area retained at '{}' for inspection; delete it when you're done",
            self.root.display()
        );
        std::mem::take(&mut self.root)
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // -- 💀 the run unwound before release(): still clean up, synchronously, still best effort
        if let Err(err) = std::fs::remove_dir_all(&self.root) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "⚠️ could not remove staging area '{}' on drop: {}",
                    self.root.display(),
                    err
                );
            }
        }
    }
}

/// 🗺️ Where `bucket/relative_path` gets staged: `root/bucket/relative_path`.
///
/// 🔒 Absolute paths and `..` are refused: a listing must not be able to write outside the root.
pub(crate) fn staged_path(root: &Path, bucket: &str, relative_path: &str) -> Result<PathBuf> {
    let mut path = root.join(safe_segment(bucket)?);
    let mut pushed_any = false;
    for component in Path::new(relative_path).components() {
        match component {
            Component::Normal(segment) => {
                path.push(segment);
                pushed_any = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => anyhow::bail!(
                "💀 refusing to stage '{}/{}': path escapes the staging area",
                bucket,
                relative_path
            ),
        }
    }
    if !pushed_any {
        anyhow::bail!("💀 refusing to stage '{}/{}': empty object path", bucket, relative_path);
    }
    Ok(path)
}

fn safe_segment(bucket: &str) -> Result<&str> {
    let mut components = Path::new(bucket).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(bucket),
        _ => anyhow::bail!("💀 '{}' is not usable as a staging directory name", bucket),
    }
}
