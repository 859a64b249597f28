// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Submission collaborators.
//!
//! The processor is transport-agnostic: each worker owns one
//! [`BulkService`] obtained from a [`BulkClient`] and only ever asks it to
//! accumulate, report its size, submit and reset.

pub mod traits;
pub mod memory;

pub use traits::{BulkClient, BulkService, RequestOf};
pub use memory::{InMemoryBulkService, InMemoryClient, StoredDocument};
