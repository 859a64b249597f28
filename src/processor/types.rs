// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Callback signatures and the messages exchanged with workers.

use std::sync::Arc;
use tokio::sync::oneshot;

use crate::error::BulkError;
use crate::response::BulkResponse;

/// Called before each commit with the execution id and the requests about
/// to be submitted.
pub type BeforeFn<R> = Arc<dyn Fn(u64, &[R]) + Send + Sync>;

/// Called after each commit, successful or not, with the same requests the
/// before callback saw. On terminal failure the response may be absent.
pub type AfterFn<R> = Arc<dyn Fn(u64, &[R], Option<&BulkResponse>, Option<&BulkError>) + Send + Sync>;

/// A request in flight on the dispatch channel. `accepted` fires once a
/// worker owns the request.
pub(crate) struct Envelope<R> {
    pub request: R,
    pub accepted: oneshot::Sender<()>,
}

/// Flush request; the worker acknowledges once its batch is committed.
pub(crate) type FlushAck = oneshot::Sender<()>;
