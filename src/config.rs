// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the bulk processor.
//!
//! # Example
//!
//! ```
//! use bulk_engine::BulkProcessorConfig;
//! use std::time::Duration;
//!
//! // Minimal config (uses defaults)
//! let config = BulkProcessorConfig::default();
//! assert_eq!(config.bulk_actions, 1000);
//! assert_eq!(config.bulk_size, 5 * 1024 * 1024); // 5 MiB
//! assert_eq!(config.flush_interval(), None);
//!
//! // Count-driven commits only, flushed every second
//! let config = BulkProcessorConfig {
//!     workers: 4,
//!     bulk_actions: 500,
//!     bulk_size: -1,
//!     flush_interval_ms: 1000,
//!     ..Default::default()
//! };
//! assert_eq!(config.size_threshold(), None);
//! assert_eq!(config.flush_interval(), Some(Duration::from_secs(1)));
//! ```

use std::time::Duration;
use serde::Deserialize;

/// Configuration for the bulk processor.
///
/// Immutable once the processor has started. Negative thresholds disable
/// the corresponding commit trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkProcessorConfig {
    /// Name used in logs and metric labels
    #[serde(default)]
    pub name: Option<String>,

    /// Number of concurrent workers (clamped to at least 1 on start)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Commit once a worker holds this many actions (-1 disables)
    #[serde(default = "default_bulk_actions")]
    pub bulk_actions: i64,

    /// Commit once a worker's batch is estimated at this many bytes (-1 disables)
    #[serde(default = "default_bulk_size")]
    pub bulk_size: i64,

    /// Periodic flush interval in milliseconds (0 = disabled)
    #[serde(default)]
    pub flush_interval_ms: u64,

    /// Collect commit statistics
    #[serde(default)]
    pub stats: bool,

    /// Backoff settings for the default exponential policy
    #[serde(default = "default_initial_timeout_ms")]
    pub initial_timeout_ms: u64,
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,
}

fn default_workers() -> usize { 1 }
fn default_bulk_actions() -> i64 { 1000 }
fn default_bulk_size() -> i64 { 5 << 20 } // 5 MiB
fn default_initial_timeout_ms() -> u64 { 200 }
fn default_max_timeout_ms() -> u64 { 10_000 }

impl Default for BulkProcessorConfig {
    fn default() -> Self {
        Self {
            name: None,
            workers: default_workers(),
            bulk_actions: default_bulk_actions(),
            bulk_size: default_bulk_size(),
            flush_interval_ms: 0,
            stats: false,
            initial_timeout_ms: default_initial_timeout_ms(),
            max_timeout_ms: default_max_timeout_ms(),
        }
    }
}

impl BulkProcessorConfig {
    /// Action-count threshold, `None` when disabled.
    #[must_use]
    pub fn action_threshold(&self) -> Option<usize> {
        usize::try_from(self.bulk_actions).ok()
    }

    /// Byte-size threshold, `None` when disabled.
    #[must_use]
    pub fn size_threshold(&self) -> Option<u64> {
        u64::try_from(self.bulk_size).ok()
    }

    /// Flush interval, `None` when disabled.
    #[must_use]
    pub fn flush_interval(&self) -> Option<Duration> {
        (self.flush_interval_ms > 0).then(|| Duration::from_millis(self.flush_interval_ms))
    }

    /// Worker count after clamping degenerate values.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }

    #[must_use]
    pub fn initial_timeout(&self) -> Duration {
        Duration::from_millis(self.initial_timeout_ms)
    }

    #[must_use]
    pub fn max_timeout(&self) -> Duration {
        Duration::from_millis(self.max_timeout_ms)
    }

    /// Display name for logs and metrics.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("bulk")
    }
}
