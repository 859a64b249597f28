// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry and backoff for bulk commits.

pub mod backoff;
pub mod retry;

pub use backoff::{Backoff, ConstantBackoff, ExponentialBackoff, SimpleBackoff, StopBackoff, ZeroBackoff};
pub use retry::retry_notify;
