use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::event::{WriteEvent, WriteEventItem};

type BoxedItems = Pin<Box<dyn Stream<Item = WriteEventItem> + Send>>;

/// Write events from one broadcast subscription, limited to a set of
/// operation names.
///
/// Lag is reported in-band as [`WriteEventItem::Lagged`] and never ends
/// the stream. The stream ends once every publisher is gone.
pub struct WriteEventStream {
   items: BoxedItems,
}

impl WriteEventStream {
   /// An empty `operations` list passes every event through.
   pub fn new(rx: broadcast::Receiver<WriteEvent>, operations: Vec<String>) -> Self {
      let items = BroadcastStream::new(rx).filter_map(move |received| match received {
         Ok(event) if wanted(&operations, &event) => Some(WriteEventItem::Event(event)),
         Ok(_) => None,
         Err(BroadcastStreamRecvError::Lagged(missed)) => {
            warn!(missed, "Write event subscriber fell behind, events dropped");
            Some(WriteEventItem::Lagged(missed))
         }
      });

      Self {
         items: Box::pin(items),
      }
   }
}

fn wanted(operations: &[String], event: &WriteEvent) -> bool {
   operations.is_empty() || operations.iter().any(|op| op == event.operation())
}

impl Stream for WriteEventStream {
   type Item = WriteEventItem;

   fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
      self.items.as_mut().poll_next(cx)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn cancelled(operation: &str, attempts: u32) -> WriteEvent {
      WriteEvent::Cancelled {
         operation: operation.into(),
         attempts,
      }
   }

   #[tokio::test]
   async fn test_lag_survives_operation_filter() {
      let (tx, rx) = broadcast::channel(2);
      let mut stream = WriteEventStream::new(rx, vec!["keep".into()]);

      tx.send(cancelled("skip", 1)).unwrap();
      tx.send(cancelled("skip", 2)).unwrap();
      tx.send(cancelled("keep", 3)).unwrap();
      tx.send(cancelled("skip", 4)).unwrap();
      drop(tx);

      assert_eq!(stream.next().await, Some(WriteEventItem::Lagged(2)));
      assert_eq!(
         stream.next().await,
         Some(WriteEventItem::Event(cancelled("keep", 3)))
      );
      assert_eq!(stream.next().await, None);
   }
}
