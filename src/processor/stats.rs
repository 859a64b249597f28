// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Processor-wide commit statistics.

use std::time::Duration;
use parking_lot::Mutex;

use crate::response::BulkResponse;

/// Aggregate counters across all workers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkProcessorStats {
    /// Number of `flush` calls, manual or periodic. Like every other counter
    /// it stays at zero while stats collection is disabled.
    pub flushed: u64,
    /// Number of commits, successful or not
    pub committed: u64,
    pub indexed: u64,
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// One entry per worker
    pub workers: Vec<BulkProcessorWorkerStats>,
}

/// Per-worker snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkProcessorWorkerStats {
    /// Requests held by the worker's current commit
    pub queued: usize,
    /// Duration of the worker's last commit
    pub last_duration: Duration,
}

/// Outcome of one commit, applied to the counters in a single update.
#[derive(Debug)]
pub(crate) struct CommitOutcome<'a> {
    pub worker: usize,
    pub batch_len: usize,
    pub response: Option<&'a BulkResponse>,
    pub elapsed: Duration,
}

/// Mutex-guarded stats. Every update and every snapshot takes the lock once.
#[derive(Debug)]
pub(crate) struct StatsCollector {
    enabled: bool,
    inner: Mutex<BulkProcessorStats>,
}

impl StatsCollector {
    pub fn new(enabled: bool, workers: usize) -> Self {
        Self {
            enabled,
            inner: Mutex::new(BulkProcessorStats {
                workers: vec![BulkProcessorWorkerStats::default(); workers],
                ..Default::default()
            }),
        }
    }

    pub fn snapshot(&self) -> BulkProcessorStats {
        self.inner.lock().clone()
    }

    pub fn record_flush(&self) {
        if self.enabled {
            self.inner.lock().flushed += 1;
        }
    }

    pub fn set_queued(&self, worker: usize, queued: usize) {
        if !self.enabled {
            return;
        }
        if let Some(w) = self.inner.lock().workers.get_mut(worker) {
            w.queued = queued;
        }
    }

    pub fn record_commit(&self, outcome: CommitOutcome<'_>) {
        if !self.enabled {
            return;
        }
        let mut stats = self.inner.lock();
        stats.committed += 1;

        let last_duration = match outcome.response {
            Some(res) => {
                stats.indexed += res.indexed().len() as u64;
                stats.created += res.created().len() as u64;
                stats.updated += res.updated().len() as u64;
                stats.deleted += res.deleted().len() as u64;
                stats.succeeded += res.succeeded().len() as u64;
                stats.failed += res.failed().len() as u64;
                Duration::from_millis(res.took)
            }
            None => {
                stats.failed += outcome.batch_len as u64;
                outcome.elapsed
            }
        };

        if let Some(w) = stats.workers.get_mut(outcome.worker) {
            w.queued = 0;
            w.last_duration = last_duration;
        }
    }
}
