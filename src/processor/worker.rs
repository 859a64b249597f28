// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bulk worker: owns one service and commits it on threshold, flush or shutdown.
//!
//! ```text
//!            ┌──────────── flush signal ───────────┐
//!            ▼                                      │
//!   dispatch ──► add to service ──► threshold? ──► commit ──► reset
//!            │                                      ▲
//!            └──────── channel closed ──────────────┘ (then exit)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use crate::batching::{CommitReason, CommitThresholds};
use crate::logger::Logger;
use crate::metrics::{self, CommitTimer};
use crate::resilience::{retry_notify, Backoff};
use crate::service::BulkService;

use super::stats::{CommitOutcome, StatsCollector};
use super::types::{AfterFn, BeforeFn, Envelope, FlushAck};

/// State shared by every worker of one processor run.
pub(crate) struct WorkerShared<R> {
    pub name: Arc<str>,
    pub thresholds: CommitThresholds,
    pub backoff: Arc<dyn Backoff>,
    pub stats: Arc<StatsCollector>,
    pub execution_id: Arc<AtomicU64>,
    pub before: Option<BeforeFn<R>>,
    pub after: Option<AfterFn<R>>,
    pub logger: Option<Arc<dyn Logger>>,
}

/// Receiving half of the dispatch channel, shared by all workers.
pub(crate) type SharedReceiver<R> = Arc<Mutex<mpsc::Receiver<Envelope<R>>>>;

pub(crate) struct Worker<S: BulkService> {
    id: usize,
    service: S,
    shared: Arc<WorkerShared<S::Request>>,
    requests: SharedReceiver<S::Request>,
    flushes: mpsc::Receiver<FlushAck>,
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// The lock is released as soon as one envelope is taken, and dropping this
// future mid-wait loses nothing: both the lock and `recv` are cancel-safe.
async fn next_request<R>(requests: &Mutex<mpsc::Receiver<Envelope<R>>>) -> Option<Envelope<R>> {
    requests.lock().await.recv().await
}

impl<S: BulkService> Worker<S> {
    pub fn new(
        id: usize,
        service: S,
        shared: Arc<WorkerShared<S::Request>>,
        requests: SharedReceiver<S::Request>,
        flushes: mpsc::Receiver<FlushAck>,
    ) -> Self {
        Self { id, service, shared, requests, flushes }
    }

    /// Run until the dispatch channel closes, committing whatever is left.
    pub async fn run(mut self) {
        debug!(processor = %self.shared.name, worker = self.id, "Bulk worker started");

        loop {
            tokio::select! {
                biased;

                Some(ack) = self.flushes.recv() => {
                    if self.service.number_of_actions() > 0 {
                        self.commit(CommitReason::Flush).await;
                    }
                    // Flush caller may have given up
                    let _ = ack.send(());
                }

                envelope = next_request(&self.requests) => match envelope {
                    Some(Envelope { request, accepted }) => {
                        self.service.add(request);
                        let _ = accepted.send(());

                        let reason = self.shared.thresholds.check(
                            self.service.number_of_actions(),
                            self.service.estimated_size_in_bytes(),
                        );
                        if let Some(reason) = reason {
                            self.commit(reason).await;
                        }
                    }
                    None => {
                        if self.service.number_of_actions() > 0 {
                            self.commit(CommitReason::Shutdown).await;
                        }
                        break;
                    }
                },
            }
        }

        debug!(processor = %self.shared.name, worker = self.id, "Bulk worker stopped");
    }

    /// Submit the service's pending requests with retry, then report and reset.
    ///
    /// Failures end here: they reach stats, the after callback and the logger,
    /// never the worker loop.
    async fn commit(&mut self, reason: CommitReason) {
        let shared = &self.shared;
        let name: &str = &shared.name;
        let worker = self.id;
        let execution_id = shared.execution_id.fetch_add(1, Ordering::SeqCst) + 1;
        let batch_len = self.service.number_of_actions();

        shared.stats.set_queued(worker, batch_len);
        metrics::set_worker_queued(name, worker, batch_len);
        metrics::record_batch_size(name, batch_len);
        let timer = CommitTimer::new(name);

        let service = &self.service;
        // Borrowed for the whole commit: execute() cannot change it
        let requests = service.requests();

        if let Some(before) = &shared.before {
            before(execution_id, requests);
        }

        let result = retry_notify(
            shared.backoff.as_ref(),
            || service.execute(),
            |err, attempt, wait| {
                warn!(
                    processor = %name,
                    worker,
                    execution_id,
                    attempt,
                    wait_ms = millis(wait),
                    error = %err,
                    "Bulk commit failed, retrying"
                );
                metrics::record_retry(name);
            },
        )
        .await;

        let elapsed = timer.elapsed();
        let (response, err) = match result {
            Ok(res) => (Some(res), None),
            Err(e) => (None, Some(e)),
        };

        shared.stats.record_commit(CommitOutcome {
            worker,
            batch_len,
            response: response.as_ref(),
            elapsed,
        });
        metrics::record_commit(name, reason.as_str(), if err.is_none() { "success" } else { "error" });
        metrics::record_committed_requests(name, batch_len);
        metrics::set_worker_queued(name, worker, 0);

        if let Some(after) = &shared.after {
            after(execution_id, requests, response.as_ref(), err.as_ref());
        }

        match (&response, &err) {
            (_, Some(e)) => {
                error!(
                    processor = %name,
                    worker,
                    execution_id,
                    requests = batch_len,
                    error = %e,
                    "Bulk commit failed"
                );
                if let Some(logger) = &shared.logger {
                    logger.log(format_args!("bulk processor {:?} failed: {}", name, e));
                }
            }
            (Some(res), None) => debug!(
                processor = %name,
                worker,
                execution_id,
                reason = %reason,
                requests = batch_len,
                took_ms = res.took,
                item_errors = res.errors,
                "Bulk commit done"
            ),
            (None, None) => {}
        }

        drop(timer);
        self.service.reset();
    }
}
