//! 📊 progress.rs: "Are we there yet?" Every migration asks. Every time.
//!
//! 🚀 One `indicatif` bar per bucket while objects are moving, and one `comfy-table`
//! summary when they've stopped. The bar hides itself when stderr isn't a terminal,
//! so CI logs stay readable and tests stay quiet.
//!
//! ⚠️ Watching this progress bar will not make it go faster. We've tried. Science says no.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::common::{MigrationReport, RunSummary, TransferOutcome};

// -- 📏 one mebibyte. not a megabyte, pedants. there's a difference and I will die on this hill.
const MIB: u64 = 1024 * 1024;

/// 📦 Raw bytes into something a human can read without counting digits.
pub(crate) fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * MIB {
        format!("{:.2} GiB", bytes as f64 / (1024 * MIB) as f64)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= 1024 {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} bytes", bytes)
    }
}

/// 🔢 "1000000" → "1,000,000". You're welcome, eyes.
pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS if you should probably call your mom. It's been a while.
pub(crate) fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📊 Live progress for one bucket.
///
/// Shared by every transfer worker of that bucket (behind an `Arc`), so the counters
/// are atomics and the bar is indicatif's own thread-safe handle.
pub(crate) struct BucketProgress {
    bucket: String,
    total_objects: u64,
    total_bytes: u64,
    moved_bytes: AtomicU64,
    success: AtomicU64,
    failed: AtomicU64,
    bar: ProgressBar,
    start_time: Instant,
}

impl std::fmt::Debug for BucketProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("BucketProgress")
            .field("bucket", &self.bucket)
            .field("total_objects", &self.total_objects)
            .field("total_bytes", &self.total_bytes)
            .finish()
    }
}

impl BucketProgress {
    pub(crate) fn new(bucket: &str, total_objects: u64, total_bytes: u64) -> Self {
        let bar = ProgressBar::new(total_objects);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("🪣 {msg}\n| [{bar:40.cyan/blue}] {pos}/{len} objects ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        let progress = Self {
            bucket: bucket.to_string(),
            total_objects,
            total_bytes,
            moved_bytes: AtomicU64::new(0),
            success: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            bar,
            start_time: Instant::now(),
        };
        progress.render();
        progress
    }

    /// 🔄 One more object done, for better or worse.
    pub(crate) fn record(&self, outcome: &TransferOutcome) {
        if outcome.is_success() {
            self.success.fetch_add(1, Ordering::Relaxed);
            self.moved_bytes
                .fetch_add(outcome.record().size_bytes, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.bar.inc(1);
        self.render();
    }

    /// 🧮 Every outcome reported so far, including those of workers that have since died.
    pub(crate) fn snapshot(&self) -> RunSummary {
        let success = self.success.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        RunSummary {
            total: success + failed,
            success,
            failed,
        }
    }

    /// 🏁 Closes the bar and logs the bucket's closing line.
    pub(crate) fn finish(&self, summary: &RunSummary) {
        self.bar.finish();
        info!(
            "🪣 '{}' done in {}: {} ok, {} failed of {} ({} moved)",
            self.bucket,
            format_duration(self.start_time.elapsed()),
            format_number(summary.success),
            format_number(summary.failed),
            format_number(summary.total),
            format_bytes(self.moved_bytes.load(Ordering::Relaxed)),
        );
    }

    fn render(&self) {
        self.bar.set_message(format!(
            "{}: {} / {} moved, ✅ {} ❌ {}",
            self.bucket,
            format_bytes(self.moved_bytes.load(Ordering::Relaxed)),
            format_bytes(self.total_bytes),
            format_number(self.success.load(Ordering::Relaxed)),
            format_number(self.failed.load(Ordering::Relaxed)),
        ));
    }
}

/// 🍽️ The final scoreboard: one row per bucket, then the total.
pub fn summary_table(report: &MigrationReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["bucket", "total", "✅ migrated", "❌ failed"]);

    let row = |label: &str, summary: &RunSummary| {
        vec![
            Cell::new(label),
            Cell::new(format_number(summary.total)).set_alignment(CellAlignment::Right),
            Cell::new(format_number(summary.success)).set_alignment(CellAlignment::Right),
            Cell::new(format_number(summary.failed)).set_alignment(CellAlignment::Right),
        ]
    };

    for bucket in &report.buckets {
        table.add_row(row(&bucket.bucket, &bucket.summary));
    }
    table.add_row(row("TOTAL", &report.total));
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ObjectRecord;

    #[test]
    fn the_one_where_numbers_get_their_commas() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn the_one_where_bytes_pick_a_sensible_unit() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KiB");
        assert_eq!(format_bytes(3 * MIB / 2), "1.50 MiB");
        assert_eq!(format_bytes(2 * 1024 * MIB), "2.00 GiB");
    }

    #[test]
    fn the_one_where_durations_only_show_hours_when_it_hurts() {
        assert_eq!(format_duration(Duration::from_secs(75)), "01:15");
        assert_eq!(format_duration(Duration::from_secs(3725)), "01:02:05");
    }

    #[test]
    fn the_one_where_the_bar_counts_both_kinds_of_ending() {
        let progress = BucketProgress::new("invoices", 2, 3072);
        let ok = ObjectRecord::new("", "a.pdf", 1024);
        let bad = ObjectRecord::new("folder", "b.pdf", 2048);

        progress.record(&TransferOutcome::Success(ok));
        progress.record(&TransferOutcome::DownloadFailed(bad));

        assert_eq!(progress.success.load(Ordering::Relaxed), 1);
        assert_eq!(progress.failed.load(Ordering::Relaxed), 1);
        assert_eq!(progress.moved_bytes.load(Ordering::Relaxed), 1024);
        assert_eq!(progress.bar.position(), 2);
        assert_eq!(
            progress.snapshot(),
            RunSummary {
                total: 2,
                success: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn the_one_where_the_table_has_a_row_per_bucket_and_a_total() {
        let mut report = MigrationReport::default();
        report.push("invoices", RunSummary { total: 2, success: 1, failed: 1 });
        report.push("cam", RunSummary { total: 1200, success: 1200, failed: 0 });

        let rendered = summary_table(&report).to_string();

        assert!(rendered.contains("invoices"));
        assert!(rendered.contains("cam"));
        assert!(rendered.contains("TOTAL"));
        assert!(rendered.contains("1,202"));
        assert!(rendered.contains("1,201"));
    }
}
