//! The observer interface the write coordinator reports through.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::event::WriteEvent;

/// Receives [`WriteEvent`]s from a write coordinator.
///
/// Called synchronously on the writing task, between attempts. Keep
/// implementations cheap and non-blocking.
pub trait WriteObserver: Send + Sync {
   fn on_event(&self, event: &WriteEvent);
}

impl<T: WriteObserver + ?Sized> WriteObserver for Arc<T> {
   fn on_event(&self, event: &WriteEvent) {
      (**self).on_event(event);
   }
}

/// Logs every event through `tracing` with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl WriteObserver for TracingObserver {
   fn on_event(&self, event: &WriteEvent) {
      match event {
         WriteEvent::Retrying {
            operation,
            attempt,
            max_attempts,
            delay,
            error,
         } => debug!(
            operation = %operation,
            attempt,
            max_attempts,
            delay_ms = saturating_millis(*delay),
            error = %error,
            "Transient write failure, retrying"
         ),
         WriteEvent::Recovered {
            operation,
            attempts,
            elapsed,
         } => debug!(
            operation = %operation,
            attempts,
            elapsed_ms = saturating_millis(*elapsed),
            "Write succeeded after retries"
         ),
         WriteEvent::Exhausted {
            operation,
            attempts,
            error,
         } => warn!(
            operation = %operation,
            attempts,
            error = %error,
            "Write retries exhausted"
         ),
         WriteEvent::Cancelled {
            operation,
            attempts,
         } => debug!(operation = %operation, attempts, "Write cancelled"),
      }
   }
}

fn saturating_millis(duration: Duration) -> u64 {
   u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl WriteObserver for NoopObserver {
   fn on_event(&self, _event: &WriteEvent) {}
}

/// Forwards each event to several observers, in insertion order.
#[derive(Clone, Default)]
pub struct FanoutObserver {
   observers: Vec<Arc<dyn WriteObserver>>,
}

impl FanoutObserver {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn with(mut self, observer: Arc<dyn WriteObserver>) -> Self {
      self.observers.push(observer);
      self
   }

   pub fn len(&self) -> usize {
      self.observers.len()
   }

   pub fn is_empty(&self) -> bool {
      self.observers.is_empty()
   }
}

impl WriteObserver for FanoutObserver {
   fn on_event(&self, event: &WriteEvent) {
      for observer in &self.observers {
         observer.on_event(event);
      }
   }
}
