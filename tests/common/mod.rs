//! Shared fixtures for integration tests.
//!
//! [`RecordingClient`] is a submission collaborator that records every
//! committed batch and can inject failures at precise attempt counts.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use bulk_engine::{
    BulkClient, BulkError, BulkIndexRequest, BulkRequest, BulkResponse, BulkResponseItem,
    BulkService, RequestBatch,
};

/// A document request with a predictable id.
pub fn doc(i: usize) -> BulkRequest {
    BulkIndexRequest::new("test")
        .id(i.to_string())
        .doc(json!({"n": i}))
        .into()
}

/// Ids of the given requests, in order.
pub fn ids(requests: &[BulkRequest]) -> Vec<String> {
    requests.iter().filter_map(|r| r.id().map(str::to_string)).collect()
}

#[derive(Debug, Default)]
struct Recorder {
    commits: Mutex<Vec<Vec<String>>>,
    attempts: AtomicU64,
    /// Fail this many attempts before succeeding
    fail_first: u64,
    fail_always: bool,
    delay: Option<Duration>,
}

impl Recorder {
    fn should_fail(&self) -> bool {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.fail_always || attempt <= self.fail_first
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingClient {
    recorder: Arc<Recorder>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` submission attempts across all services
    pub fn failing_first(n: u64) -> Self {
        Self {
            recorder: Arc::new(Recorder { fail_first: n, ..Default::default() }),
        }
    }

    pub fn always_failing() -> Self {
        Self {
            recorder: Arc::new(Recorder { fail_always: true, ..Default::default() }),
        }
    }

    /// Every submission takes `delay`
    pub fn slow(delay: Duration) -> Self {
        Self {
            recorder: Arc::new(Recorder { delay: Some(delay), ..Default::default() }),
        }
    }

    /// Request ids of every successful submission, one entry per batch
    pub fn commits(&self) -> Vec<Vec<String>> {
        self.recorder.commits.lock().clone()
    }

    pub fn committed_ids(&self) -> Vec<String> {
        self.commits().into_iter().flatten().collect()
    }

    pub fn attempts(&self) -> u64 {
        self.recorder.attempts.load(Ordering::SeqCst)
    }
}

impl BulkClient for RecordingClient {
    type Service = RecordingService;

    fn bulk(&self) -> RecordingService {
        RecordingService {
            recorder: Arc::clone(&self.recorder),
            batch: RequestBatch::new(),
        }
    }
}

#[derive(Debug)]
pub struct RecordingService {
    recorder: Arc<Recorder>,
    batch: RequestBatch<BulkRequest>,
}

#[async_trait]
impl BulkService for RecordingService {
    type Request = BulkRequest;

    fn add(&mut self, request: BulkRequest) {
        self.batch.push(request);
    }

    fn number_of_actions(&self) -> usize {
        self.batch.len()
    }

    fn estimated_size_in_bytes(&self) -> u64 {
        self.batch.total_bytes()
    }

    fn requests(&self) -> &[BulkRequest] {
        self.batch.items()
    }

    async fn execute(&self) -> Result<BulkResponse, BulkError> {
        if let Some(delay) = self.recorder.delay {
            tokio::time::sleep(delay).await;
        }
        if self.recorder.should_fail() {
            return Err(BulkError::transport("injected failure"));
        }

        self.recorder.commits.lock().push(ids(self.batch.items()));
        let items = self.batch.items().iter().map(|r| {
            let item = BulkResponseItem {
                index: r.index().to_string(),
                id: r.id().unwrap_or_default().to_string(),
                status: 201,
                result: Some("created".to_string()),
                ..Default::default()
            };
            (r.action().to_string(), item)
        });
        Ok(BulkResponse::from_items(1, items))
    }

    fn reset(&mut self) {
        self.batch.clear();
    }
}
