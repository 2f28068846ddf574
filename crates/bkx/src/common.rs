//! 📦 Common data structures, the building blocks of bkx.
//!
//! 🎬 COLD OPEN: INT. STAGING DIRECTORY, 3:47 AM
//!
//! A lone `ObjectRecord` sits in a queue. It knows its path. It knows its size.
//! It does not know whether the destination will answer with a 201 or a 500.
//! None of them know. Relatable.
//!
//! These are the humble structs that ferry objects from one bucket to another and
//! keep score along the way. They don't ask questions. They carry metadata. 🦆

use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// 📄 One object discovered by the lister.
///
/// Identity is `relative_path` within its bucket. The remote store guarantees
/// uniqueness, so we don't re-check it. Immutable once listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// 🏷️ The leaf name, as the listing API reported it.
    pub name: String,
    /// 🗺️ `folder/sub/name`, no leading slash, separators only at joins.
    pub relative_path: String,
    /// 📏 Size from the listing metadata. 0 when the store didn't say.
    pub size_bytes: u64,
}

impl ObjectRecord {
    /// 🏗️ Builds a record living under `prefix`. An empty prefix means "bucket root".
    pub fn new(prefix: &str, name: &str, size_bytes: u64) -> Self {
        Self {
            name: name.to_string(),
            relative_path: join_prefix(prefix, name),
            size_bytes,
        }
    }
}

/// 🧵 Joins a folder prefix and a name with exactly one `/`, or none at the root.
pub(crate) fn join_prefix(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// 🪣 A bucket and everything the lister found in it.
///
/// Lives for exactly one bucket migration, then gets folded into the totals and
/// forgotten like last sprint's retro action items.
#[derive(Debug, Clone, Default)]
pub struct BucketJob {
    pub bucket: String,
    pub objects: Vec<ObjectRecord>,
}

impl BucketJob {
    pub fn new(bucket: impl Into<String>, objects: Vec<ObjectRecord>) -> Self {
        Self {
            bucket: bucket.into(),
            objects,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// 📏 Sum of listed sizes. Feeds the progress bar, nothing else.
    pub fn total_bytes(&self) -> u64 {
        self.objects.iter().map(|o| o.size_bytes).sum()
    }
}

/// 🎯 What happened to one object. Produced once, consumed immediately, never persisted.
///
/// `DownloadFailed` and `UploadFailed` both count as `failed` in the aggregate;
/// the distinction only shows up in the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success(ObjectRecord),
    DownloadFailed(ObjectRecord),
    UploadFailed(ObjectRecord),
}

impl TransferOutcome {
    pub fn record(&self) -> &ObjectRecord {
        match self {
            TransferOutcome::Success(r)
            | TransferOutcome::DownloadFailed(r)
            | TransferOutcome::UploadFailed(r) => r,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success(_))
    }
}

/// 📊 The scoreboard. `{ total, success, failed }`, additive across buckets.
///
/// Invariant: `success + failed == total`. Every way of building one (`record`,
/// `+`, `sum`) keeps it that way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
}

impl RunSummary {
    /// 🔄 Folds one outcome into the counters.
    pub fn record(&mut self, outcome: &TransferOutcome) {
        self.total += 1;
        if outcome.is_success() {
            self.success += 1;
        } else {
            self.failed += 1;
        }
    }

    /// ✅ Clean means zero failures. An empty run is clean too.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl Add for RunSummary {
    type Output = RunSummary;

    fn add(self, rhs: RunSummary) -> RunSummary {
        RunSummary {
            total: self.total + rhs.total,
            success: self.success + rhs.success,
            failed: self.failed + rhs.failed,
        }
    }
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, rhs: RunSummary) {
        *self = *self + rhs;
    }
}

impl Sum for RunSummary {
    fn sum<I: Iterator<Item = RunSummary>>(iter: I) -> Self {
        iter.fold(RunSummary::default(), Add::add)
    }
}

/// 🪣 One bucket's line in the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketReport {
    pub bucket: String,
    pub summary: RunSummary,
}

/// 🏁 Everything the coordinator has to say when the dust settles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub buckets: Vec<BucketReport>,
    pub total: RunSummary,
}

impl MigrationReport {
    /// 📥 Appends a bucket and adds its counters into the total.
    pub fn push(&mut self, bucket: impl Into<String>, summary: RunSummary) {
        self.total += summary;
        self.buckets.push(BucketReport {
            bucket: bucket.into(),
            summary,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(path: &str) -> ObjectRecord {
        ObjectRecord::new("", path, 1)
    }

    #[test]
    fn the_one_where_prefixes_join_without_stray_slashes() {
        assert_eq!(join_prefix("", "a.pdf"), "a.pdf");
        assert_eq!(join_prefix("folder", "b.pdf"), "folder/b.pdf");
        assert_eq!(
            ObjectRecord::new("x/y", "z.png", 7).relative_path,
            "x/y/z.png"
        );
    }

    #[test]
    fn the_one_where_both_failure_flavors_count_as_failed() {
        let mut summary = RunSummary::default();
        summary.record(&TransferOutcome::Success(rec("a")));
        summary.record(&TransferOutcome::DownloadFailed(rec("b")));
        summary.record(&TransferOutcome::UploadFailed(rec("c")));

        assert_eq!(
            summary,
            RunSummary {
                total: 3,
                success: 1,
                failed: 2
            }
        );
        assert!(!summary.is_clean());
    }

    #[test]
    fn the_one_where_the_report_total_is_the_fieldwise_sum() {
        let per_bucket = [
            RunSummary { total: 2, success: 1, failed: 1 },
            RunSummary::default(),
            RunSummary { total: 5, success: 5, failed: 0 },
        ];

        let mut report = MigrationReport::default();
        for (i, s) in per_bucket.iter().enumerate() {
            report.push(format!("bucket-{i}"), *s);
        }

        let summed: RunSummary = per_bucket.iter().copied().sum();
        assert_eq!(report.total, summed);
        assert_eq!(report.total.success + report.total.failed, report.total.total);
        assert_eq!(report.buckets.len(), 3);
    }

    #[test]
    fn the_one_where_a_job_adds_up_its_bytes() {
        let job = BucketJob::new(
            "invoices",
            vec![
                ObjectRecord::new("", "a.pdf", 1024),
                ObjectRecord::new("folder", "b.pdf", 2048),
            ],
        );
        assert_eq!(job.total_bytes(), 3072);
        assert!(!job.is_empty());
        assert!(BucketJob::new("empty", vec![]).is_empty());
    }
}
