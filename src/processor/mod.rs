// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bulk processor.
//!
//! The [`BulkProcessor`] accepts individual requests and commits them in
//! batches through a fixed pool of workers, each owning its own
//! [`BulkService`](crate::service::BulkService).
//!
//! ```text
//!   add() ──► dispatch channel (hand-off) ──► worker 0 ─┐
//!                                         ├─► worker 1 ─┼─► service.execute() + retry
//!                                         └─► worker N ─┘
//!   flush() / flusher tick ──► flush signal to every worker ──► wait for all acks
//!   close() ──► stop flusher ──► close dispatch ──► workers commit remainder ──► join
//! ```
//!
//! # Example
//!
//! ```rust
//! use bulk_engine::{BulkProcessor, BulkIndexRequest, InMemoryClient};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), bulk_engine::BulkError> {
//! let client = InMemoryClient::new();
//! let processor = BulkProcessor::builder(client.clone())
//!     .name("tweets")
//!     .workers(2)
//!     .bulk_actions(100)
//!     .stats(true)
//!     .start()
//!     .await?;
//!
//! processor.add(BulkIndexRequest::new("tweets").id("1").doc(json!({"msg": "hi"}))).await?;
//! processor.flush().await?;
//! assert_eq!(client.len(), 1);
//!
//! processor.close().await?;
//! assert_eq!(processor.stats().succeeded, 1);
//! # Ok(())
//! # }
//! ```

mod flusher;
mod stats;
mod types;
mod worker;

pub use stats::{BulkProcessorStats, BulkProcessorWorkerStats};
pub use types::{AfterFn, BeforeFn};

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::batching::CommitThresholds;
use crate::config::BulkProcessorConfig;
use crate::error::BulkError;
use crate::logger::Logger;
use crate::metrics;
use crate::resilience::{Backoff, ExponentialBackoff};
use crate::response::BulkResponse;
use crate::service::{BulkClient, RequestOf};

use flusher::{FlushHandle, Flusher};
use stats::StatsCollector;
use types::Envelope;
use worker::{Worker, WorkerShared};

/// Everything that exists only between `start` and `close`.
struct Running<R> {
    requests: mpsc::Sender<Envelope<R>>,
    flush: FlushHandle,
    flusher: Option<Flusher>,
    workers: Vec<JoinHandle<()>>,
}

/// Concurrent batching front-end for a [`BulkClient`].
///
/// # Thread Safety
///
/// All methods take `&self`; share the processor behind an `Arc` to add from
/// many tasks. `add` and `flush` share the lifecycle lock, `start` and
/// `close` take it exclusively, so a producer racing `close` gets
/// [`BulkError::Closed`] instead of losing its request.
pub struct BulkProcessor<C: BulkClient> {
    client: C,
    config: BulkProcessorConfig,
    name: Arc<str>,
    backoff: Arc<dyn Backoff>,
    before: Option<BeforeFn<RequestOf<C>>>,
    after: Option<AfterFn<RequestOf<C>>>,
    logger: Option<Arc<dyn Logger>>,
    /// Never reset, so ids stay unique across restarts
    execution_id: Arc<AtomicU64>,
    /// Replaced on every start; survives close
    stats: parking_lot::Mutex<Arc<StatsCollector>>,
    state: RwLock<Option<Running<RequestOf<C>>>>,
}

impl<C: BulkClient> fmt::Debug for BulkProcessor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkProcessor")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl<C: BulkClient> BulkProcessor<C> {
    /// Configure a processor for `client`.
    pub fn builder(client: C) -> BulkProcessorBuilder<C> {
        BulkProcessorBuilder::new(client)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Spawn workers and, if configured, the periodic flusher.
    ///
    /// Idempotent: starting a running processor does nothing. Stats are
    /// reset to zero.
    #[tracing::instrument(skip(self), fields(processor = %self.name))]
    pub async fn start(&self) -> Result<(), BulkError> {
        let mut state = self.state.write().await;
        if state.is_some() {
            debug!("Bulk processor already running");
            return Ok(());
        }

        let workers = self.config.effective_workers();
        let stats = Arc::new(StatsCollector::new(self.config.stats, workers));
        *self.stats.lock() = Arc::clone(&stats);

        let shared = Arc::new(WorkerShared {
            name: Arc::clone(&self.name),
            thresholds: CommitThresholds {
                actions: self.config.action_threshold(),
                bytes: self.config.size_threshold(),
            },
            backoff: Arc::clone(&self.backoff),
            stats: Arc::clone(&stats),
            execution_id: Arc::clone(&self.execution_id),
            before: self.before.clone(),
            after: self.after.clone(),
            logger: self.logger.clone(),
        });

        // Capacity 1 plus the acceptance ack makes add a hand-off, not a queue
        let (requests, rx) = mpsc::channel(1);
        let rx = Arc::new(Mutex::new(rx));

        let mut flush_senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let (flush_tx, flush_rx) = mpsc::channel(1);
            let worker = Worker::new(id, self.client.bulk(), Arc::clone(&shared), Arc::clone(&rx), flush_rx);
            handles.push(tokio::spawn(worker.run()));
            flush_senders.push(flush_tx);
        }

        let flush = FlushHandle::new(Arc::clone(&self.name), flush_senders, stats);
        let flusher = self
            .config
            .flush_interval()
            .map(|period| Flusher::spawn(period, flush.clone()));

        info!(
            workers,
            bulk_actions = self.config.bulk_actions,
            bulk_size = self.config.bulk_size,
            flush_interval_ms = self.config.flush_interval_ms,
            "Bulk processor started"
        );
        metrics::set_running(&self.name, true);

        *state = Some(Running {
            requests,
            flush,
            flusher,
            workers: handles,
        });
        Ok(())
    }

    /// Hand `request` to a worker, waiting until one accepts it.
    ///
    /// This wait is the only backpressure: there is no queue behind it.
    /// Submission outcomes are reported through stats and callbacks, not here.
    ///
    /// # Errors
    ///
    /// [`BulkError::Closed`] if the processor is not running.
    pub async fn add(&self, request: impl Into<RequestOf<C>>) -> Result<(), BulkError> {
        let state = self.state.read().await;
        let running = state.as_ref().ok_or(BulkError::Closed)?;

        let (accepted, ack) = oneshot::channel();
        running
            .requests
            .send(Envelope { request: request.into(), accepted })
            .await
            .map_err(|_| BulkError::Closed)?;
        ack.await.map_err(|_| BulkError::Closed)
    }

    /// Commit every worker's batch now and wait until all are done.
    ///
    /// Every request whose `add` returned before this call is committed
    /// (attempted) by the time it returns.
    ///
    /// # Errors
    ///
    /// [`BulkError::Closed`] if the processor is not running.
    pub async fn flush(&self) -> Result<(), BulkError> {
        let state = self.state.read().await;
        let running = state.as_ref().ok_or(BulkError::Closed)?;
        running.flush.flush().await
    }

    /// Stop the flusher, let every worker commit what it holds, and wait for
    /// them to exit. Idempotent.
    #[tracing::instrument(skip(self), fields(processor = %self.name))]
    pub async fn close(&self) -> Result<(), BulkError> {
        let mut state = self.state.write().await;
        let Some(running) = state.take() else {
            debug!("Bulk processor not running");
            return Ok(());
        };
        let Running { requests, flush, flusher, workers } = running;

        if let Some(flusher) = flusher {
            flusher.stop().await;
        }

        // Closing the dispatch channel is the workers' shutdown signal
        drop(requests);
        drop(flush);
        for handle in workers {
            if let Err(e) = handle.await {
                error!(error = %e, "Bulk worker panicked");
            }
        }

        metrics::set_running(&self.name, false);
        info!("Bulk processor stopped");
        Ok(())
    }

    /// Alias for [`close`](Self::close).
    pub async fn stop(&self) -> Result<(), BulkError> {
        self.close().await
    }

    /// Consistent copy of the current counters.
    #[must_use]
    pub fn stats(&self) -> BulkProcessorStats {
        self.stats.lock().snapshot()
    }
}

/// Fluent configuration for a [`BulkProcessor`].
pub struct BulkProcessorBuilder<C: BulkClient> {
    client: C,
    config: BulkProcessorConfig,
    backoff: Option<Arc<dyn Backoff>>,
    before: Option<BeforeFn<RequestOf<C>>>,
    after: Option<AfterFn<RequestOf<C>>>,
    logger: Option<Arc<dyn Logger>>,
}

impl<C: BulkClient> BulkProcessorBuilder<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            config: BulkProcessorConfig::default(),
            backoff: None,
            before: None,
            after: None,
            logger: None,
        }
    }

    /// Replace all scalar options at once (e.g. from a config file).
    #[must_use]
    pub fn config(mut self, config: BulkProcessorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Number of workers; values below 1 become 1.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Commit once a worker holds this many requests. Negative disables.
    #[must_use]
    pub fn bulk_actions(mut self, actions: i64) -> Self {
        self.config.bulk_actions = actions;
        self
    }

    /// Commit once a worker's estimated payload reaches this many bytes.
    /// Negative disables.
    #[must_use]
    pub fn bulk_size(mut self, bytes: i64) -> Self {
        self.config.bulk_size = bytes;
        self
    }

    /// Flush all workers periodically. Zero disables.
    #[must_use]
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Collect commit statistics. When disabled every counter in
    /// [`BulkProcessor::stats`] stays zero, `flushed` included.
    #[must_use]
    pub fn stats(mut self, enabled: bool) -> Self {
        self.config.stats = enabled;
        self
    }

    #[must_use]
    pub fn before<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, &[RequestOf<C>]) + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn after<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, &[RequestOf<C>], Option<&BulkResponse>, Option<&BulkError>) + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(f));
        self
    }

    /// Retry policy for failed commits. Defaults to exponential backoff
    /// between the configured initial and max timeouts.
    #[must_use]
    pub fn backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    #[must_use]
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Build a stopped processor.
    pub fn build(self) -> BulkProcessor<C> {
        let backoff = self.backoff.unwrap_or_else(|| {
            Arc::new(ExponentialBackoff::new(
                self.config.initial_timeout(),
                self.config.max_timeout(),
            ))
        });
        let workers = self.config.effective_workers();

        BulkProcessor {
            name: Arc::from(self.config.display_name()),
            stats: parking_lot::Mutex::new(Arc::new(StatsCollector::new(self.config.stats, workers))),
            client: self.client,
            config: self.config,
            backoff,
            before: self.before,
            after: self.after,
            logger: self.logger,
            execution_id: Arc::new(AtomicU64::new(0)),
            state: RwLock::new(None),
        }
    }

    /// Build and start.
    pub async fn start(self) -> Result<BulkProcessor<C>, BulkError> {
        let processor = self.build();
        processor.start().await?;
        Ok(processor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{BulkDeleteRequest, BulkIndexRequest};
    use crate::resilience::StopBackoff;
    use crate::service::InMemoryClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_builder_defaults() {
        let p = BulkProcessor::builder(InMemoryClient::new()).build();
        assert_eq!(p.name(), "bulk");
        assert!(!p.is_running().await);
        assert_eq!(p.config.action_threshold(), Some(1000));
        assert_eq!(p.config.size_threshold(), Some(5 << 20));
        assert_eq!(p.config.flush_interval(), None);
        assert_eq!(p.stats().workers.len(), 1);
    }

    #[tokio::test]
    async fn test_builder_clamps_workers() {
        let p = BulkProcessor::builder(InMemoryClient::new()).workers(0).build();
        assert_eq!(p.stats().workers.len(), 1);
    }

    #[tokio::test]
    async fn test_add_before_start_is_closed() {
        let p = BulkProcessor::builder(InMemoryClient::new()).build();
        let err = p.add(BulkDeleteRequest::new("i", "1")).await.unwrap_err();
        assert!(err.is_closed());
        assert!(p.flush().await.unwrap_err().is_closed());
    }

    #[tokio::test]
    async fn test_start_add_close() {
        let client = InMemoryClient::new();
        let p = BulkProcessor::builder(client.clone())
            .name("unit")
            .backoff(StopBackoff)
            .stats(true)
            .start()
            .await
            .unwrap();
        assert!(p.is_running().await);

        for i in 0..10 {
            p.add(BulkIndexRequest::new("docs").id(i.to_string()).doc(json!({"n": i})))
                .await
                .unwrap();
        }
        p.close().await.unwrap();

        assert!(!p.is_running().await);
        assert_eq!(client.len(), 10);
        let stats = p.stats();
        assert_eq!(stats.committed, 1);
        assert_eq!(stats.indexed, 10);
        assert_eq!(stats.succeeded, 10);
    }

    #[tokio::test]
    async fn test_restart_resets_stats_but_not_execution_ids() {
        let ids = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen = ids.clone();
        let p = BulkProcessor::builder(InMemoryClient::new())
            .stats(true)
            .before(move |id, _reqs| seen.lock().push(id))
            .build();

        p.start().await.unwrap();
        p.add(BulkDeleteRequest::new("i", "1")).await.unwrap();
        p.close().await.unwrap();
        assert_eq!(p.stats().committed, 1);

        p.start().await.unwrap();
        assert_eq!(p.stats().committed, 0);
        p.add(BulkDeleteRequest::new("i", "2")).await.unwrap();
        p.close().await.unwrap();

        assert_eq!(ids.lock().as_slice(), &[1, 2]);
    }
}
