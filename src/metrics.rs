// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the bulk processor.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `bulk_processor_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `processor`: processor name
//! - `reason`: actions, size, flush, shutdown
//! - `status`: success, error

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a finished commit
pub fn record_commit(processor: &str, reason: &str, status: &str) {
    counter!(
        "bulk_processor_commits_total",
        "processor" => processor.to_string(),
        "reason" => reason.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record requests handed to the submission collaborator
pub fn record_committed_requests(processor: &str, count: usize) {
    counter!(
        "bulk_processor_requests_total",
        "processor" => processor.to_string()
    )
    .increment(count as u64);
}

/// Record commit latency, retries included
pub fn record_commit_latency(processor: &str, duration: Duration) {
    histogram!(
        "bulk_processor_commit_seconds",
        "processor" => processor.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record batch size at commit time
pub fn record_batch_size(processor: &str, count: usize) {
    histogram!(
        "bulk_processor_batch_size",
        "processor" => processor.to_string()
    )
    .record(count as f64);
}

/// Record a retried submission attempt
pub fn record_retry(processor: &str) {
    counter!(
        "bulk_processor_retries_total",
        "processor" => processor.to_string()
    )
    .increment(1);
}

/// Record a processor-wide flush
pub fn record_flush(processor: &str) {
    counter!(
        "bulk_processor_flushes_total",
        "processor" => processor.to_string()
    )
    .increment(1);
}

/// Set the number of requests a worker is currently holding
pub fn set_worker_queued(processor: &str, worker: usize, queued: usize) {
    gauge!(
        "bulk_processor_worker_queued",
        "processor" => processor.to_string(),
        "worker" => worker.to_string()
    )
    .set(queued as f64);
}

/// Set the number of running processors with this name (0 or 1)
pub fn set_running(processor: &str, running: bool) {
    gauge!(
        "bulk_processor_running",
        "processor" => processor.to_string()
    )
    .set(if running { 1.0 } else { 0.0 });
}

/// A timing guard that records commit latency on drop
pub struct CommitTimer {
    processor: String,
    start: Instant,
}

impl CommitTimer {
    /// Start a new commit timer
    pub fn new(processor: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for CommitTimer {
    fn drop(&mut self) {
        record_commit_latency(&self.processor, self.start.elapsed());
    }
}
