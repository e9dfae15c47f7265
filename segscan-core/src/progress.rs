//! Monotonic progress counters shared by all segment loops of a scanner.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters owned by one [`Scanner`](crate::scanner::Scanner).
///
/// They only ever grow and are not reset between scans on the same
/// instance. Mutation is `fetch_add` only; reads are safe at any time,
/// including while a scan is running.
#[derive(Debug, Default)]
pub struct ScanProgress {
    completed_segments: AtomicU64,
    completed_items: AtomicU64,
    pages_delivered: AtomicU64,
    retries: AtomicU64,
}

/// Point-in-time copy of [`ScanProgress`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub completed_segments: u64,
    pub completed_items: u64,
    pub pages_delivered: u64,
    pub retries: u64,
}

impl ScanProgress {
    pub fn completed_segments(&self) -> u64 {
        self.completed_segments.load(Ordering::Relaxed)
    }

    pub fn completed_items(&self) -> u64 {
        self.completed_items.load(Ordering::Relaxed)
    }

    pub fn pages_delivered(&self) -> u64 {
        self.pages_delivered.load(Ordering::Relaxed)
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed_segments: self.completed_segments(),
            completed_items: self.completed_items(),
            pages_delivered: self.pages_delivered(),
            retries: self.retries(),
        }
    }

    pub(crate) fn record_page(&self, items: u64) {
        self.completed_items.fetch_add(items, Ordering::Relaxed);
        self.pages_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_segment_completed(&self) {
        self.completed_segments.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }
}
