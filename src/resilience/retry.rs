// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry loop driven by a [`Backoff`] policy.
//!
//! # Example
//!
//! ```
//! use bulk_engine::{retry_notify, SimpleBackoff};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let backoff = SimpleBackoff::new([1, 1]);
//! let mut calls = 0;
//! let result: Result<u32, String> = retry_notify(
//!     &backoff,
//!     || {
//!         calls += 1;
//!         let n = calls;
//!         async move { if n < 3 { Err(format!("fail {}", n)) } else { Ok(n) } }
//!     },
//!     |_err, _attempt, _wait| {},
//! )
//! .await;
//! assert_eq!(result, Ok(3));
//! # }
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use super::backoff::Backoff;

/// Run `operation` until it succeeds or `backoff` gives up.
///
/// The first failure consults `backoff.next(0)`. `notify` is called with the
/// error, the attempt index and the wait before each retry; the error that
/// made the policy stop is returned as-is.
pub async fn retry_notify<F, Fut, T, E, N>(
    backoff: &dyn Backoff,
    mut operation: F,
    mut notify: N,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    N: FnMut(&E, u32, Duration),
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if attempt > 0 {
                    debug!(retries = attempt, "Operation succeeded after retries");
                }
                return Ok(val);
            }
            Err(err) => {
                let Some(wait) = backoff.next(attempt) else {
                    return Err(err);
                };
                notify(&err, attempt, wait);
                attempt = attempt.saturating_add(1);
                sleep(wait).await;
            }
        }
    }
}
