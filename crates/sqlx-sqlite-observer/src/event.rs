use std::time::Duration;

/// Something that happened while a write operation was being coordinated.
///
/// Events are only emitted for the retry machinery. A write that commits on
/// its first attempt, or fails with a non-retryable error, produces none.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteEvent {
   /// A transient failure rolled back attempt `attempt`; the coordinator
   /// sleeps for `delay` before the next one.
   Retrying {
      operation: String,
      attempt: u32,
      max_attempts: u32,
      delay: Duration,
      error: String,
   },
   /// The write committed after `attempts` attempts (always more than one).
   Recovered {
      operation: String,
      attempts: u32,
      elapsed: Duration,
   },
   /// Every attempt failed transiently.
   Exhausted {
      operation: String,
      attempts: u32,
      error: String,
   },
   /// The caller cancelled before the retry budget was spent.
   Cancelled { operation: String, attempts: u32 },
}

impl WriteEvent {
   /// Name of the write operation this event belongs to.
   pub fn operation(&self) -> &str {
      match self {
         WriteEvent::Retrying { operation, .. }
         | WriteEvent::Recovered { operation, .. }
         | WriteEvent::Exhausted { operation, .. }
         | WriteEvent::Cancelled { operation, .. } => operation,
      }
   }

   /// Attempt number the event was emitted at.
   pub fn attempt(&self) -> u32 {
      match self {
         WriteEvent::Retrying { attempt, .. } => *attempt,
         WriteEvent::Recovered { attempts, .. }
         | WriteEvent::Exhausted { attempts, .. }
         | WriteEvent::Cancelled { attempts, .. } => *attempts,
      }
   }

   pub fn kind(&self) -> &'static str {
      match self {
         WriteEvent::Retrying { .. } => "retrying",
         WriteEvent::Recovered { .. } => "recovered",
         WriteEvent::Exhausted { .. } => "exhausted",
         WriteEvent::Cancelled { .. } => "cancelled",
      }
   }
}

/// Item yielded by a [`WriteEventStream`](crate::WriteEventStream).
#[derive(Debug, Clone, PartialEq)]
pub enum WriteEventItem {
   Event(WriteEvent),
   /// The subscriber fell behind and this many events were dropped.
   Lagged(u64),
}
