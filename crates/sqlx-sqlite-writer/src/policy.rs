//! Retry budget, backoff schedule and serialization strategy.

use std::time::Duration;

/// Default number of attempts for a write.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Default ceiling for the exponential component of the delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

/// Fraction of the computed delay that may be added as random jitter.
pub const JITTER_FACTOR: f64 = 0.25;

/// How concurrent writes inside one process are serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
   /// Writers go straight to the engine and rely on the single-connection
   /// pool, the busy timeout and `BEGIN IMMEDIATE` to queue.
   #[default]
   NativeQueuing,

   /// Writers first take an in-process lock. The lock is held for one
   /// attempt and released before any backoff sleep.
   Mutex,
}

impl Strategy {
   pub fn from_native_queuing(use_native_queuing: bool) -> Self {
      if use_native_queuing {
         Strategy::NativeQueuing
      } else {
         Strategy::Mutex
      }
   }
}

/// Retry settings for the write coordinator.
///
/// `max_retries` is the total number of attempts, not the number of retries
/// after the first one. A value of zero is treated as one.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
   pub max_retries: u32,
   pub base_delay: Duration,
   pub max_delay: Duration,
   pub strategy: Strategy,
}

impl Default for RetryPolicy {
   fn default() -> Self {
      Self {
         max_retries: DEFAULT_MAX_RETRIES,
         base_delay: DEFAULT_BASE_DELAY,
         max_delay: DEFAULT_MAX_DELAY,
         strategy: Strategy::default(),
      }
   }
}

impl RetryPolicy {
   /// Total attempts a write may make, never less than one.
   pub fn max_attempts(&self) -> u32 {
      self.max_retries.max(1)
   }

   /// Delay before the retry that follows failed attempt `attempt`
   /// (1-based), without jitter.
   ///
   /// Doubles from `base_delay`, capped at `max_delay`, and never below
   /// `base_delay` even when the cap is configured lower.
   pub fn base_backoff(&self, attempt: u32) -> Duration {
      let exponent = attempt.saturating_sub(1).min(31);
      let doubled = self.base_delay.saturating_mul(1u32 << exponent);
      doubled.min(self.max_delay).max(self.base_delay)
   }

   /// Jittered delay for `attempt`, with `jitter_unit` in `[0, 1)`.
   ///
   /// Jitter only ever adds time: the result lies in
   /// `[base_backoff, base_backoff * 1.25)`.
   pub fn backoff_delay(&self, attempt: u32, jitter_unit: f64) -> Duration {
      let computed = self.base_backoff(attempt);
      let unit = if jitter_unit.is_finite() {
         jitter_unit.clamp(0.0, 1.0)
      } else {
         0.0
      };
      computed.saturating_add(computed.mul_f64(JITTER_FACTOR * unit))
   }

   pub(crate) fn jittered_delay(&self, attempt: u32) -> Duration {
      self.backoff_delay(attempt, rand::random::<f64>())
   }
}
