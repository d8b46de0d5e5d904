//! Bounded exponential backoff
//!
//! The schedule is plain state (attempts, next interval, start time) with a
//! pure [`should_retry`] predicate; time comes from a [`Clock`] so the retry
//! loop runs without real delays in tests.

use crate::core::error::PromoteResult;
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of elapsed time and sleeping
pub trait Clock {
  /// Monotonic time since an arbitrary fixed origin
  fn now(&self) -> Duration;

  fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
  origin: Instant,
}

impl SystemClock {
  pub fn new() -> Self {
    Self { origin: Instant::now() }
  }
}

impl Default for SystemClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for SystemClock {
  fn now(&self) -> Duration {
    self.origin.elapsed()
  }

  fn sleep(&self, duration: Duration) {
    std::thread::sleep(duration);
  }
}

/// Exponential backoff schedule with a cap on total elapsed time
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
  pub initial_interval: Duration,
  pub multiplier: f64,
  pub max_interval: Duration,
  pub max_elapsed: Duration,

  attempts: u32,
  next_interval: Duration,
  started: Duration,
}

impl Backoff {
  pub fn new(initial_interval: Duration, multiplier: f64, max_interval: Duration, max_elapsed: Duration) -> Self {
    Self {
      initial_interval,
      multiplier,
      max_interval,
      max_elapsed,
      attempts: 0,
      next_interval: initial_interval,
      started: Duration::ZERO,
    }
  }

  /// Schedule used when re-reading a pull request after a write
  pub fn pull_request_refresh() -> Self {
    Self::new(
      Duration::from_secs(3),
      1.5,
      Duration::from_secs(60),
      Duration::from_secs(60),
    )
  }

  /// Start a new schedule at `now`
  pub fn reset(&mut self, now: Duration) {
    self.attempts = 0;
    self.next_interval = self.initial_interval;
    self.started = now;
  }

  /// Failed attempts recorded since the last reset
  pub fn attempts(&self) -> u32 {
    self.attempts
  }

  /// Record a failed attempt at `now`; returns the delay before the next
  /// attempt, or `None` once the elapsed budget is spent
  pub fn next_delay(&mut self, now: Duration) -> Option<Duration> {
    self.attempts += 1;
    let elapsed = now.saturating_sub(self.started);
    if !should_retry(elapsed, self.max_elapsed) {
      return None;
    }
    let delay = self.next_interval;
    self.next_interval = self
      .next_interval
      .mul_f64(self.multiplier)
      .min(self.max_interval);
    Some(delay)
  }
}

/// Whether another attempt fits in the budget
pub fn should_retry(elapsed: Duration, max_elapsed: Duration) -> bool {
  elapsed < max_elapsed
}

/// Run `operation` until it succeeds or the schedule is exhausted
///
/// On exhaustion the error of the last attempt is returned.
pub fn retry<T>(
  backoff: &mut Backoff,
  clock: &dyn Clock,
  mut operation: impl FnMut() -> PromoteResult<T>,
) -> PromoteResult<T> {
  backoff.reset(clock.now());
  loop {
    match operation() {
      Ok(value) => return Ok(value),
      Err(err) => match backoff.next_delay(clock.now()) {
        Some(delay) => {
          debug!(attempt = backoff.attempts(), delay_ms = delay.as_millis() as u64, error = %err, "retrying");
          clock.sleep(delay);
        }
        None => return Err(err),
      },
    }
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use super::*;
  use std::cell::{Cell, RefCell};

  /// Clock that only moves when slept on
  #[derive(Default)]
  pub struct ManualClock {
    pub now: Cell<Duration>,
    pub sleeps: RefCell<Vec<Duration>>,
  }

  impl Clock for ManualClock {
    fn now(&self) -> Duration {
      self.now.get()
    }

    fn sleep(&self, duration: Duration) {
      self.sleeps.borrow_mut().push(duration);
      self.now.set(self.now.get() + duration);
    }
  }
}
