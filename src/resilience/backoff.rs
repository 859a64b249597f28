// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Backoff policies for retrying failed commits.
//!
//! A [`Backoff`] maps a retry attempt index (0 for the first failure) to
//! the time to wait before the next try, or `None` to give up.
//!
//! # Example
//!
//! ```
//! use bulk_engine::{Backoff, SimpleBackoff, ExponentialBackoff, StopBackoff};
//! use std::time::Duration;
//!
//! let simple = SimpleBackoff::new([10, 20, 30]);
//! assert_eq!(simple.next(0), Some(Duration::from_millis(10)));
//! assert_eq!(simple.next(3), None);
//!
//! let exp = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1));
//! let first = exp.next(0).unwrap();
//! assert!(first >= Duration::from_millis(100) && first < Duration::from_millis(200));
//!
//! assert_eq!(StopBackoff.next(0), None);
//! ```

use std::fmt;
use std::time::Duration;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Maps a retry attempt to a wait duration, or `None` to stop retrying.
pub trait Backoff: fmt::Debug + Send + Sync {
    fn next(&self, retry: u32) -> Option<Duration>;
}

/// Exponential backoff bounded by a wall-clock ceiling.
///
/// `delay = r * initial * factor^retry` with `r` drawn from `[1, 2)`. Once the
/// computed delay reaches `max` the policy stops instead of clamping, so the
/// ceiling bounds each wait rather than the number of attempts.
#[derive(Debug)]
pub struct ExponentialBackoff {
    initial: Duration,
    factor: f64,
    max: Duration,
    // Serializes the random draw only
    rng: Mutex<StdRng>,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            factor: 2.0,
            max,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Override the growth factor (default 2.0)
    #[must_use]
    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    /// Deterministic draws, for tests and simulations
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }
}

impl Backoff for ExponentialBackoff {
    fn next(&self, retry: u32) -> Option<Duration> {
        let r: f64 = 1.0 + self.rng.lock().gen::<f64>();
        let exp = i32::try_from(retry).unwrap_or(i32::MAX);
        let millis = r * self.initial.as_millis() as f64 * self.factor.powi(exp);
        if millis >= self.max.as_millis() as f64 {
            return None;
        }
        Some(Duration::from_millis(millis as u64))
    }
}

/// Caller-supplied list of delays in milliseconds, optionally jittered.
///
/// Attempt `i` waits `ticks[i]`; past the end of the list it stops.
/// Jitter remaps `m` to a uniform draw in `[m/2, m/2 + m)`.
#[derive(Debug)]
pub struct SimpleBackoff {
    ticks: Vec<u64>,
    jitter: bool,
    rng: Mutex<StdRng>,
}

impl SimpleBackoff {
    pub fn new(ticks: impl IntoIterator<Item = u64>) -> Self {
        Self {
            ticks: ticks.into_iter().collect(),
            jitter: false,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    #[must_use]
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    fn jittered(&self, millis: u64) -> u64 {
        if millis == 0 {
            return 0;
        }
        millis / 2 + self.rng.lock().gen_range(0..millis)
    }
}

impl Backoff for SimpleBackoff {
    fn next(&self, retry: u32) -> Option<Duration> {
        let millis = *self.ticks.get(retry as usize)?;
        let millis = if self.jitter { self.jittered(millis) } else { millis };
        Some(Duration::from_millis(millis))
    }
}

/// Fixed interval, retries forever.
#[derive(Debug, Clone, Copy)]
pub struct ConstantBackoff {
    interval: Duration,
}

impl ConstantBackoff {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Backoff for ConstantBackoff {
    fn next(&self, _retry: u32) -> Option<Duration> {
        Some(self.interval)
    }
}

/// Retry immediately, forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroBackoff;

impl Backoff for ZeroBackoff {
    fn next(&self, _retry: u32) -> Option<Duration> {
        Some(Duration::ZERO)
    }
}

/// Never retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopBackoff;

impl Backoff for StopBackoff {
    fn next(&self, _retry: u32) -> Option<Duration> {
        None
    }
}
