// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Processor-wide flush fan-out and the periodic flusher task.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::BulkError;
use crate::metrics;

use super::stats::StatsCollector;
use super::types::FlushAck;

/// Signals every worker to commit and waits for all acknowledgments.
///
/// Held outside the lifecycle lock so the periodic flusher never contends
/// with `close`.
#[derive(Clone)]
pub(crate) struct FlushHandle {
    name: Arc<str>,
    workers: Arc<[mpsc::Sender<FlushAck>]>,
    stats: Arc<StatsCollector>,
}

impl FlushHandle {
    pub fn new(name: Arc<str>, workers: Vec<mpsc::Sender<FlushAck>>, stats: Arc<StatsCollector>) -> Self {
        Self { name, workers: workers.into(), stats }
    }

    pub async fn flush(&self) -> Result<(), BulkError> {
        self.stats.record_flush();
        metrics::record_flush(&self.name);

        // Signal everyone first so workers commit in parallel
        let mut acks = Vec::with_capacity(self.workers.len());
        for worker in self.workers.iter() {
            let (tx, rx) = oneshot::channel();
            worker.send(tx).await.map_err(|_| BulkError::Closed)?;
            acks.push(rx);
        }
        for ack in acks {
            ack.await.map_err(|_| BulkError::Closed)?;
        }
        Ok(())
    }
}

/// Periodic flush task.
pub(crate) struct Flusher {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Flusher {
    /// Spawn the task. The first tick fires one full `period` from now.
    pub fn spawn(period: Duration, flush: FlushHandle) -> Self {
        let (stop, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = &mut stop_rx => break,

                    _ = ticker.tick() => {
                        if let Err(e) = flush.flush().await {
                            warn!(processor = %flush.name, error = %e, "Periodic flush failed, flusher exiting");
                            break;
                        }
                    }
                }
            }

            debug!(processor = %flush.name, "Flusher stopped");
        });

        Self { stop, handle }
    }

    /// Stop the task and wait for it. No tick fires after this returns.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Flusher task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(workers: usize) -> (FlushHandle, Vec<mpsc::Receiver<FlushAck>>) {
        let mut senders = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..workers {
            let (tx, rx) = mpsc::channel(1);
            senders.push(tx);
            receivers.push(rx);
        }
        let stats = Arc::new(StatsCollector::new(true, workers));
        (FlushHandle::new(Arc::from("test"), senders, stats), receivers)
    }

    // Acknowledge every flush signal, counting them
    fn ack_all(receivers: Vec<mpsc::Receiver<FlushAck>>) -> Arc<std::sync::atomic::AtomicUsize> {
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        for mut rx in receivers {
            let count = count.clone();
            tokio::spawn(async move {
                while let Some(ack) = rx.recv().await {
                    count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    let _ = ack.send(());
                }
            });
        }
        count
    }

    #[tokio::test]
    async fn test_flush_reaches_every_worker() {
        let (flush, receivers) = handle(3);
        let count = ack_all(receivers);

        flush.flush().await.unwrap();

        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert_eq!(flush.stats.snapshot().flushed, 1);
    }

    #[tokio::test]
    async fn test_flush_without_workers_is_closed() {
        let (flush, receivers) = handle(1);
        drop(receivers);
        assert!(flush.flush().await.unwrap_err().is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flusher_ticks_after_one_period() {
        let (flush, receivers) = handle(1);
        let count = ack_all(receivers);
        let flusher = Flusher::spawn(Duration::from_millis(50), flush.clone());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);

        flusher.stop().await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
