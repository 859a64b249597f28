// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use thiserror::Error;

/// Errors surfaced by the bulk engine.
///
/// Only [`BulkError::Closed`] is ever returned synchronously to producers.
/// The other variants travel from the submission collaborator to the
/// after-callback and the [`Logger`](crate::Logger).
#[derive(Error, Debug)]
pub enum BulkError {
    #[error("bulk processor is closed")]
    Closed,
    #[error("bulk transport error: {0}")]
    Transport(String),
    #[error("bulk request serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("bulk request rejected with status {status}: {reason}")]
    Rejected { status: u16, reason: String },
}

impl BulkError {
    /// Shorthand for a transport failure.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Check if this error means the processor refused the call outright
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
