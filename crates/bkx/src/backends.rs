//! 🔌 Backends, where the real I/O happens.
//!
//! 🚰 One object store pours the bytes, the other slurps them up. Same trait on both
//! ends; the only difference is which credential we hand it and which direction we point it.
//!
//! 🎭 This module is the casting agency. Need a real hosted storage API over HTTP?
//! Need a map in RAM that fails on command for a test? We've got a backend for that.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

pub mod in_mem;
pub mod storage_api;

pub use in_mem::InMemoryStore;
pub use storage_api::StorageApi;

/// 📋 One listing call: which folder, how many entries, starting where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// 🗺️ Folder path, no leading or trailing slash. Empty = bucket root.
    pub prefix: String,
    pub limit: usize,
    pub offset: usize,
}

/// 📄 One raw entry from a listing page.
///
/// The discriminator is `id`: `None` means "this is a folder, go look inside",
/// `Some` means "this is a real object with real bytes".
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ListEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: Option<EntryMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EntryMetadata {
    #[serde(default)]
    pub size: Option<u64>,
}

impl ListEntry {
    pub fn is_folder(&self) -> bool {
        self.id.is_none()
    }

    /// 📏 Size from metadata, 0 when the store kept it to itself.
    pub fn size_bytes(&self) -> u64 {
        self.metadata.as_ref().and_then(|m| m.size).unwrap_or(0)
    }
}

/// 🪣 An object store we can list, read from, and write to.
///
/// # Contract 📜
/// - `list_page` returns one page of entries directly under `request.prefix`.
///   Non-success and transport errors come back as `Err`. No retries in here.
/// - `download` returns the full object body or `Err`.
/// - `upload` writes (and overwrites) the object or returns `Err`.
/// - Implementations are shared across transfer workers, hence `Send + Sync` and `&self`.
#[async_trait]
pub trait ObjectStore: std::fmt::Debug + Send + Sync {
    async fn list_page(&self, bucket: &str, request: &ListRequest) -> Result<Vec<ListEntry>>;
    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>>;
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<()>;
}

/// 🎭 The many faces of an object store, a polymorphic casting call.
///
/// Callers never need to know (or care) whether the bytes come from a hosted project
/// on the other side of the planet or a `BTreeMap` three stack frames away.
/// Ancient proverb: "He who hardcodes the backend, migrates only once."
#[derive(Debug)]
pub enum StoreBackend {
    Http(StorageApi),
    InMemory(InMemoryStore),
}

#[async_trait]
impl ObjectStore for StoreBackend {
    async fn list_page(&self, bucket: &str, request: &ListRequest) -> Result<Vec<ListEntry>> {
        match self {
            StoreBackend::Http(s) => s.list_page(bucket, request).await,
            StoreBackend::InMemory(s) => s.list_page(bucket, request).await,
        }
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        match self {
            StoreBackend::Http(s) => s.download(bucket, path).await,
            StoreBackend::InMemory(s) => s.download(bucket, path).await,
        }
    }

    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<()> {
        match self {
            StoreBackend::Http(s) => s.upload(bucket, path, bytes).await,
            StoreBackend::InMemory(s) => s.upload(bucket, path, bytes).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_null_ids_are_folders() {
        let entries: Vec<ListEntry> = serde_json::from_str(
            r#"[
                {"name": "folder", "id": null, "metadata": null},
                {"name": "a.pdf", "id": "0b1c", "metadata": {"size": 1024, "mimetype": "application/pdf"}},
                {"name": "nosize.bin", "id": "9f"}
            ]"#,
        )
        .expect("💀 listing JSON should parse");

        assert!(entries[0].is_folder());
        assert_eq!(entries[0].size_bytes(), 0);
        assert!(!entries[1].is_folder());
        assert_eq!(entries[1].size_bytes(), 1024);
        assert_eq!(entries[2].size_bytes(), 0);
    }
}
