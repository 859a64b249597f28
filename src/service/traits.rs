// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;

use crate::error::BulkError;
use crate::request::BulkableRequest;
use crate::response::BulkResponse;

/// Accumulates requests and submits them as one bulk call.
///
/// A service is owned by exactly one worker, so mutation needs no locking.
/// `execute` must leave the accumulated requests in place: the worker may
/// call it again on retry and calls [`reset`](Self::reset) once the commit
/// attempt is over, whatever the outcome.
#[async_trait]
pub trait BulkService: Send + Sync + 'static {
    type Request: BulkableRequest;

    fn add(&mut self, request: Self::Request);

    fn number_of_actions(&self) -> usize;

    fn estimated_size_in_bytes(&self) -> u64;

    /// Pending requests in insertion order
    fn requests(&self) -> &[Self::Request];

    /// Submit all pending requests.
    async fn execute(&self) -> Result<BulkResponse, BulkError>;

    /// Drop all pending requests.
    fn reset(&mut self);
}

/// Hands out one [`BulkService`] per worker.
pub trait BulkClient: Send + Sync + 'static {
    type Service: BulkService;

    fn bulk(&self) -> Self::Service;
}

/// Request type accepted by a client's services
pub type RequestOf<C> = <<C as BulkClient>::Service as BulkService>::Request;
