//! 📋 Lister: turns a bucket's folder hierarchy into one flat list of objects.
//!
//! 🎬 *[a bucket. folders inside folders inside folders. somewhere at the bottom, a PDF.]*
//!
//! The listing API only answers one folder at a time, and marks sub-folders with a `null` id.
//! The walk is depth-first in listing order: a folder's contents come out right where the
//! folder sat, before its later siblings. No recursion though. Each open folder is a frame on
//! an explicit stack, so a pathological nesting depth costs heap, not stack frames.
//!
//! 💀 Failure policy: a folder that won't list gets a warning and contributes nothing.
//! The walk carries on with everything else. No retries.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::app_config::ListingConfig;
use crate::backends::{ListEntry, ListRequest, ObjectStore, StoreBackend};
use crate::common::{ObjectRecord, join_prefix};

// -- 🛑 hard stop for a folder whose pages never come back short
const MAX_PAGES_PER_FOLDER: usize = 10_000;

#[derive(Debug, Clone)]
pub struct Lister {
    store: Arc<StoreBackend>,
    config: ListingConfig,
}

/// 📂 One open folder: where it lives and what's still left to look at.
struct Frame {
    prefix: String,
    entries: std::vec::IntoIter<ListEntry>,
}

impl Lister {
    pub fn new(store: Arc<StoreBackend>, config: ListingConfig) -> Self {
        Self { store, config }
    }

    /// 🗂️ Every object in `bucket`, with paths relative to the bucket root.
    ///
    /// Empty bucket → empty vec. Folders never show up as records, empty or not.
    pub async fn list(&self, bucket: &str) -> Vec<ObjectRecord> {
        let mut records = Vec::new();
        let mut stack = vec![Frame {
            prefix: String::new(),
            entries: self.list_folder(bucket, "").await.into_iter(),
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(entry) = frame.entries.next() else {
                stack.pop();
                continue;
            };
            if entry.name.is_empty() {
                continue;
            }
            if entry.is_folder() {
                let prefix = join_prefix(&frame.prefix, &entry.name);
                let entries = self.list_folder(bucket, &prefix).await.into_iter();
                stack.push(Frame { prefix, entries });
            } else {
                records.push(ObjectRecord::new(&frame.prefix, &entry.name, entry.size_bytes()));
            }
        }

        debug!("📋 '{}' listed: {} objects", bucket, records.len());
        records
    }

    /// 📄 All pages of one folder, in order. Whatever arrived before a failure is kept.
    async fn list_folder(&self, bucket: &str, prefix: &str) -> Vec<ListEntry> {
        // -- 🔢 a zero page size would ask for nothing forever
        let limit = self.config.page_size.max(1);
        let mut entries = Vec::new();
        let mut offset = 0;
        let mut previous_first: Option<String> = None;

        for _ in 0..MAX_PAGES_PER_FOLDER {
            let request = ListRequest {
                prefix: prefix.to_string(),
                limit,
                offset,
            };
            let page = match self.store.list_page(bucket, &request).await {
                Ok(page) => page,
                Err(err) => {
                    warn!("⚠️ could not list '{}/{}': {:#}", bucket, prefix, err);
                    return entries;
                }
            };
            let page_len = page.len();
            let first = page.first().map(|entry| entry.name.clone());

            // -- 🔁 same first entry as last time: the server isn't honoring `offset`
            if first.is_some() && first == previous_first {
                warn!(
                    "⚠️ '{}/{}' served the same page again at offset {}; the server ignores offsets, \
                     keeping the {} entries seen so far",
                    bucket,
                    prefix,
                    offset,
                    entries.len()
                );
                return entries;
            }
            entries.extend(page);

            // -- 📄 a short page is the last page
            if !self.config.follow_pagination || page_len < limit {
                return entries;
            }
            offset += page_len;
            previous_first = first;
        }

        warn!(
            "⚠️ '{}/{}' still had more after {} pages; listing stops here",
            bucket, prefix, MAX_PAGES_PER_FOLDER
        );
        entries
    }
}
