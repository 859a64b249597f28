// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Bulk Engine
//!
//! A concurrent bulk-submission engine: accepts a continuous stream of
//! individual write requests, groups them into bounded batches and submits
//! each batch to a remote store with bounded concurrency, periodic flush and
//! retry with backoff.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       BulkProcessor                         │
//! │  • add() hands each request to exactly one worker          │
//! │  • Blocking hand-off is the only backpressure              │
//! │  • flush() / close() fan out to every worker and wait      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                    (dispatch channel, no buffering)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Worker pool (N tasks)                   │
//! │  • One BulkService per worker, single owner                │
//! │  • Commit on action count, byte size, flush or shutdown    │
//! │  • Retry per Backoff policy, then stats + callbacks        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                     (service.execute())
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    BulkClient / BulkService                 │
//! │  • Transport-agnostic submission collaborator              │
//! │  • InMemoryClient ships as a complete implementation       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! An optional flusher task flushes all workers every `flush_interval`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bulk_engine::{BulkProcessor, BulkIndexRequest, InMemoryClient};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = InMemoryClient::new();
//!     let processor = BulkProcessor::builder(client)
//!         .name("events")
//!         .workers(4)
//!         .bulk_actions(1000)
//!         .flush_interval(Duration::from_secs(1))
//!         .after(|id, requests, _response, err| {
//!             if let Some(err) = err {
//!                 eprintln!("commit {} of {} requests failed: {}", id, requests.len(), err);
//!             }
//!         })
//!         .start()
//!         .await
//!         .expect("Failed to start");
//!
//!     processor
//!         .add(BulkIndexRequest::new("events").doc(json!({"kind": "login"})))
//!         .await
//!         .expect("Processor closed");
//!
//!     processor.close().await.expect("Failed to close");
//! }
//! ```
//!
//! ## Features
//!
//! - **Batch Commits**: Configurable by action count and estimated byte size
//! - **Worker Pool**: N independent workers, one slow commit never stalls the others
//! - **Periodic Flush**: Timer-driven flush of every worker
//! - **Retry Logic**: Exponential, list-based, constant, zero and stop policies
//! - **Stats**: Per-outcome counters and per-worker snapshots
//! - **Metrics**: `metrics` crate instrumentation, exporter chosen by the host
//!
//! ## Modules
//!
//! - [`processor`]: The [`BulkProcessor`], its workers and flusher
//! - [`service`]: Submission collaborator traits and the in-memory store
//! - [`batching`]: Request accumulation and commit thresholds
//! - [`resilience`]: Backoff policies and the retry loop
//! - [`request`] / [`response`]: Bulk request and response types

pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod batching;
pub mod service;
pub mod resilience;
pub mod processor;
pub mod logger;
pub mod metrics;

pub use config::BulkProcessorConfig;
pub use error::BulkError;
pub use request::{BulkableRequest, BulkIndexRequest, BulkUpdateRequest, BulkDeleteRequest, BulkRequest, OpType};
pub use response::{BulkResponse, BulkResponseItem, BulkErrorDetails};
pub use batching::{RequestBatch, CommitThresholds, CommitReason};
pub use service::{BulkClient, BulkService, RequestOf, InMemoryClient, InMemoryBulkService, StoredDocument};
pub use resilience::{Backoff, ExponentialBackoff, SimpleBackoff, ConstantBackoff, ZeroBackoff, StopBackoff, retry_notify};
pub use processor::{BulkProcessor, BulkProcessorBuilder, BulkProcessorStats, BulkProcessorWorkerStats, BeforeFn, AfterFn};
pub use logger::{Logger, TracingLogger};
pub use metrics::CommitTimer;
