use tokio::sync::broadcast;
use tracing::trace;

use crate::event::WriteEvent;
use crate::observer::WriteObserver;
use crate::stream::WriteEventStream;

/// Default number of buffered events per subscriber.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Publishes write events to any number of subscribers over a tokio
/// broadcast channel.
///
/// Publishing never blocks. Without subscribers events are dropped; a
/// subscriber that falls more than `capacity` events behind loses the
/// oldest ones and is told how many through
/// [`WriteEventItem::Lagged`](crate::WriteEventItem::Lagged).
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
   tx: broadcast::Sender<WriteEvent>,
}

impl BroadcastObserver {
   pub fn new(capacity: usize) -> Self {
      let (tx, _) = broadcast::channel(capacity.max(1));
      Self { tx }
   }

   pub fn subscribe(&self) -> broadcast::Receiver<WriteEvent> {
      self.tx.subscribe()
   }

   /// Subscribe and get a `Stream`, optionally limited to the named
   /// operations.
   pub fn subscribe_stream<I, S>(&self, operations: I) -> WriteEventStream
   where
      I: IntoIterator<Item = S>,
      S: Into<String>,
   {
      let operations = operations.into_iter().map(Into::into).collect();
      WriteEventStream::new(self.tx.subscribe(), operations)
   }

   pub fn subscriber_count(&self) -> usize {
      self.tx.receiver_count()
   }
}

impl Default for BroadcastObserver {
   fn default() -> Self {
      Self::new(DEFAULT_CHANNEL_CAPACITY)
   }
}

impl WriteObserver for BroadcastObserver {
   fn on_event(&self, event: &WriteEvent) {
      if self.tx.send(event.clone()).is_err() {
         trace!(kind = event.kind(), "No subscribers for write event");
      }
   }
}
