//! # Previously, on bkx...
//!
//! 🎬 The objects were trapped. Stranded in a bucket like travelers in a connecting
//! airport with no WiFi. Someone had to test the rescue mission without actually
//! calling a hosted project a thousand times a minute from CI.
//!
//! That someone was this module.
//!
//! `InMemoryStore` is an [`ObjectStore`] that lives entirely in RAM. Folders are derived
//! from object paths (plus explicitly declared empty ones), listing is sorted by name and
//! paginated like the real thing, and every call is written down so tests can ask
//! "did we upload that?" and get an honest answer. Faults are injectable per prefix/path.
//!
//! ⚠️ This is NOT for production. If you're deploying this to prod, please also deploy a therapist.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;

use crate::backends::{EntryMetadata, ListEntry, ListRequest, ObjectStore};

type Key = (String, String);

fn key(bucket: &str, path: &str) -> Key {
    (bucket.to_string(), path.to_string())
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<Key, Vec<u8>>,
    /// 📁 folders declared on purpose, so empty ones still show up in listings
    folders: BTreeSet<Key>,
    failing_listings: HashSet<Key>,
    failing_downloads: HashSet<Key>,
    panicking_downloads: HashSet<Key>,
    failing_uploads: HashSet<Key>,
    list_calls: Vec<(String, ListRequest)>,
    download_calls: Vec<Key>,
    upload_calls: Vec<Key>,
}

/// 📦 A store that never forgets, and remembers every question you asked it.
///
/// Clone-able: clones share the same state through an `Arc`, so a test can hand one
/// copy to the coordinator and keep another to inspect afterwards.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- 🔒 never held across an .await, so std's Mutex is fine. a poisoned lock still has good data.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 📥 Seeds an object. Parent folders appear in listings automatically.
    pub fn with_object(self, bucket: &str, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.state().objects.insert(key(bucket, path), bytes.into());
        self
    }

    /// 📁 Declares a folder that exists even with nothing in it.
    pub fn with_folder(self, bucket: &str, path: &str) -> Self {
        self.state().folders.insert(key(bucket, path));
        self
    }

    /// 💀 Every listing call for exactly this prefix fails.
    pub fn failing_listing(self, bucket: &str, prefix: &str) -> Self {
        self.state().failing_listings.insert(key(bucket, prefix));
        self
    }

    pub fn failing_download(self, bucket: &str, path: &str) -> Self {
        self.state().failing_downloads.insert(key(bucket, path));
        self
    }

    /// 💥 Downloading exactly this path panics, taking the calling task down with it.
    pub fn panicking_download(self, bucket: &str, path: &str) -> Self {
        self.state().panicking_downloads.insert(key(bucket, path));
        self
    }

    pub fn failing_upload(self, bucket: &str, path: &str) -> Self {
        self.state().failing_uploads.insert(key(bucket, path));
        self
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.state().objects.get(&key(bucket, path)).cloned()
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.state().objects.keys().filter(|(b, _)| b == bucket).count()
    }

    pub fn list_calls(&self) -> Vec<(String, ListRequest)> {
        self.state().list_calls.clone()
    }

    pub fn download_calls(&self) -> Vec<(String, String)> {
        self.state().download_calls.clone()
    }

    pub fn upload_calls(&self) -> Vec<(String, String)> {
        self.state().upload_calls.clone()
    }

    /// 🔢 How many times `path` was uploaded. The "upload call count == 0" assertion lives here.
    pub fn upload_count(&self, bucket: &str, path: &str) -> usize {
        let wanted = key(bucket, path);
        self.state().upload_calls.iter().filter(|k| **k == wanted).count()
    }

    /// 🗂️ Entries directly under `prefix`, folders and files interleaved by name.
    fn children(state: &State, bucket: &str, prefix: &str) -> Vec<ListEntry> {
        let base = if prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", prefix)
        };

        let mut folders: BTreeSet<String> = BTreeSet::new();
        let mut files: BTreeMap<String, u64> = BTreeMap::new();

        for ((b, path), bytes) in &state.objects {
            let Some(rest) = path.strip_prefix(&base).filter(|_| b == bucket) else {
                continue;
            };
            match rest.split_once('/') {
                Some((folder, _)) => {
                    folders.insert(folder.to_string());
                }
                None => {
                    files.insert(rest.to_string(), bytes.len() as u64);
                }
            }
        }
        for (b, path) in &state.folders {
            let Some(rest) = path.strip_prefix(&base).filter(|_| b == bucket) else {
                continue;
            };
            let folder = rest.split('/').next().unwrap_or(rest);
            if !folder.is_empty() {
                folders.insert(folder.to_string());
            }
        }

        let mut entries: Vec<ListEntry> = folders
            .into_iter()
            .map(|name| ListEntry {
                name,
                id: None,
                metadata: None,
            })
            .chain(files.into_iter().map(|(name, size)| ListEntry {
                id: Some(format!("{}{}", base, name)),
                name,
                metadata: Some(EntryMetadata { size: Some(size) }),
            }))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn list_page(&self, bucket: &str, request: &ListRequest) -> Result<Vec<ListEntry>> {
        let mut state = self.state();
        state.list_calls.push((bucket.to_string(), request.clone()));

        if state.failing_listings.contains(&key(bucket, &request.prefix)) {
            anyhow::bail!("💀 injected listing failure for '{}/{}'", bucket, request.prefix);
        }

        Ok(Self::children(&state, bucket, &request.prefix)
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .collect())
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let mut state = self.state();
        let k = key(bucket, path);
        state.download_calls.push(k.clone());

        if state.panicking_downloads.contains(&k) {
            drop(state);
            panic!("💥 injected panic while downloading '{}/{}'", bucket, path);
        }
        if state.failing_downloads.contains(&k) {
            anyhow::bail!("💀 injected download failure for '{}/{}' (404)", bucket, path);
        }
        match state.objects.get(&k) {
            Some(bytes) => Ok(bytes.clone()),
            None => anyhow::bail!("💀 '{}/{}' does not exist (404)", bucket, path),
        }
    }

    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<()> {
        let mut state = self.state();
        let k = key(bucket, path);
        state.upload_calls.push(k.clone());

        if state.failing_uploads.contains(&k) {
            anyhow::bail!("💀 injected upload failure for '{}/{}' (500)", bucket, path);
        }
        state.objects.insert(k, bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(prefix: &str, limit: usize, offset: usize) -> ListRequest {
        ListRequest {
            prefix: prefix.to_string(),
            limit,
            offset,
        }
    }

    #[tokio::test]
    async fn the_one_where_folders_are_derived_and_empty_ones_declared() -> Result<()> {
        let store = InMemoryStore::new()
            .with_object("invoices", "a.pdf", vec![0u8; 1024])
            .with_object("invoices", "folder/b.pdf", vec![0u8; 2048])
            .with_folder("invoices", "empty");

        let root = store.list_page("invoices", &req("", 100, 0)).await?;
        let names: Vec<&str> = root.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "empty", "folder"]);
        assert!(!root[0].is_folder());
        assert!(root[1].is_folder());
        assert!(root[2].is_folder());

        let nested = store.list_page("invoices", &req("folder", 100, 0)).await?;
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].size_bytes(), 2048);

        assert!(store.list_page("invoices", &req("empty", 100, 0)).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_pages_are_sliced_by_offset_and_limit() -> Result<()> {
        let mut store = InMemoryStore::new();
        for i in 0..5 {
            store = store.with_object("b", &format!("f{i}.txt"), b"x".to_vec());
        }

        let first = store.list_page("b", &req("", 2, 0)).await?;
        let third = store.list_page("b", &req("", 2, 4)).await?;
        assert_eq!(first.len(), 2);
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].name, "f4.txt");
        assert_eq!(store.list_calls().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_injected_faults_fire_and_get_logged() {
        let store = InMemoryStore::new()
            .with_object("b", "ok.txt", b"ok".to_vec())
            .failing_download("b", "ok.txt")
            .failing_upload("b", "new.txt")
            .failing_listing("b", "");

        assert!(store.list_page("b", &req("", 10, 0)).await.is_err());
        assert!(store.download("b", "ok.txt").await.is_err());
        assert!(store.upload("b", "new.txt", b"n".to_vec()).await.is_err());
        assert!(store.object("b", "new.txt").is_none());
        assert_eq!(store.upload_count("b", "new.txt"), 1);
        assert_eq!(store.download_calls().len(), 1);
    }
}
