// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Request accumulation and commit thresholds.

pub mod request_batch;

pub use request_batch::{CommitReason, CommitThresholds, RequestBatch};
