// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Request batching for bulk submissions.
//!
//! A [`RequestBatch`] is an ordered, append-only buffer of requests with a
//! running byte estimate. [`CommitThresholds`] decides when a worker has to
//! commit what it holds: by action count or by estimated size, whichever is
//! hit first. Either threshold can be disabled.
//!
//! # Example
//!
//! ```
//! use bulk_engine::{RequestBatch, CommitThresholds, CommitReason, BulkDeleteRequest};
//!
//! let thresholds = CommitThresholds { actions: Some(2), bytes: None };
//! let mut batch = RequestBatch::new();
//!
//! batch.push(BulkDeleteRequest::new("users", "1"));
//! assert_eq!(thresholds.check(batch.len(), batch.total_bytes()), None);
//!
//! batch.push(BulkDeleteRequest::new("users", "2"));
//! assert_eq!(thresholds.check(batch.len(), batch.total_bytes()), Some(CommitReason::Actions));
//! ```

use std::fmt;

use crate::request::BulkableRequest;

/// Why a worker committed its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitReason {
    /// Action-count threshold reached
    Actions,
    /// Byte-size threshold reached
    Size,
    /// Explicit or periodic flush
    Flush,
    /// Dispatch channel closed
    Shutdown,
}

impl CommitReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actions => "actions",
            Self::Size => "size",
            Self::Flush => "flush",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for CommitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commit thresholds. `None` disables a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitThresholds {
    pub actions: Option<usize>,
    pub bytes: Option<u64>,
}

impl CommitThresholds {
    /// Thresholds that never fire; only flush and shutdown commit.
    pub const DISABLED: Self = Self { actions: None, bytes: None };

    /// Check thresholds in priority order. Reaching a threshold exactly counts.
    #[must_use]
    pub fn check(&self, actions: usize, bytes: u64) -> Option<CommitReason> {
        if self.actions.is_some_and(|limit| actions >= limit) {
            Some(CommitReason::Actions)
        } else if self.bytes.is_some_and(|limit| bytes >= limit) {
            Some(CommitReason::Size)
        } else {
            None
        }
    }
}

/// An ordered batch of pending requests.
#[derive(Debug)]
pub struct RequestBatch<R> {
    items: Vec<R>,
    total_bytes: u64,
}

impl<R: BulkableRequest> RequestBatch<R> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            total_bytes: 0,
        }
    }

    /// Append a request, sizing it once on the way in.
    pub fn push(&mut self, item: R) {
        self.total_bytes += item.estimated_size_in_bytes();
        self.items.push(item);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    #[must_use]
    pub fn items(&self) -> &[R] {
        &self.items
    }

    /// Empty the batch, keeping its allocation for the next round.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total_bytes = 0;
    }
}

impl<R: BulkableRequest> Default for RequestBatch<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BulkError;

    // Simple fixed-size request
    #[derive(Debug, Clone)]
    struct TestRequest {
        id: String,
        size: u64,
    }

    impl fmt::Display for TestRequest {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.id)
        }
    }

    impl BulkableRequest for TestRequest {
        fn source(&self) -> Result<Vec<String>, BulkError> {
            Ok(vec![self.id.clone()])
        }

        fn estimated_size_in_bytes(&self) -> u64 {
            self.size
        }
    }

    fn req(id: &str, size: u64) -> TestRequest {
        TestRequest { id: id.to_string(), size }
    }

    #[test]
    fn test_batch_empty_initially() {
        let batch: RequestBatch<TestRequest> = RequestBatch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
        assert_eq!(batch.total_bytes(), 0);
    }

    #[test]
    fn test_batch_tracks_items_and_bytes() {
        let mut batch = RequestBatch::new();
        batch.push(req("a", 100));
        batch.push(req("b", 200));
        batch.push(req("c", 150));

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.total_bytes(), 450);
        let ids: Vec<&str> = batch.items().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_clear_resets_and_keeps_capacity() {
        let mut batch = RequestBatch::new();
        for i in 0..16 {
            batch.push(req(&i.to_string(), 10));
        }
        let capacity = batch.items.capacity();
        batch.clear();

        assert!(batch.is_empty());
        assert_eq!(batch.total_bytes(), 0);
        assert_eq!(batch.items.capacity(), capacity);
    }

    #[test]
    fn test_batch_reusable_after_clear() {
        let mut batch = RequestBatch::new();
        batch.push(req("a", 1));
        batch.clear();
        batch.push(req("b", 2));

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.total_bytes(), 2);
        assert_eq!(batch.items()[0].id, "b");
    }

    #[test]
    fn test_action_threshold_is_inclusive() {
        let thresholds = CommitThresholds { actions: Some(3), bytes: None };
        assert_eq!(thresholds.check(2, 0), None);
        assert_eq!(thresholds.check(3, 0), Some(CommitReason::Actions));
        assert_eq!(thresholds.check(4, 0), Some(CommitReason::Actions));
    }

    #[test]
    fn test_size_threshold_is_inclusive() {
        let thresholds = CommitThresholds { actions: None, bytes: Some(500) };
        assert_eq!(thresholds.check(10, 499), None);
        assert_eq!(thresholds.check(10, 500), Some(CommitReason::Size));
    }

    #[test]
    fn test_disabled_thresholds_never_fire() {
        let thresholds = CommitThresholds::DISABLED;
        assert_eq!(thresholds.check(1_000_000, u64::MAX), None);
    }

    #[test]
    fn test_zero_action_threshold_commits_every_request() {
        let thresholds = CommitThresholds { actions: Some(0), bytes: None };
        assert_eq!(thresholds.check(1, 0), Some(CommitReason::Actions));
    }

    #[test]
    fn test_actions_beat_size_on_simultaneous_threshold() {
        let thresholds = CommitThresholds { actions: Some(2), bytes: Some(200) };
        assert_eq!(thresholds.check(2, 200), Some(CommitReason::Actions));
    }

    #[test]
    fn test_commit_reason_display() {
        assert_eq!(CommitReason::Actions.to_string(), "actions");
        assert_eq!(CommitReason::Shutdown.to_string(), "shutdown");
    }
}
