//! Integration tests for write event delivery through `BroadcastObserver`.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use sqlx_sqlite_observer::{
   BroadcastObserver, FanoutObserver, TracingObserver, WriteEvent, WriteEventItem, WriteObserver,
};
use tokio::time::timeout;

fn retrying(operation: &str, attempt: u32) -> WriteEvent {
   WriteEvent::Retrying {
      operation: operation.into(),
      attempt,
      max_attempts: 5,
      delay: Duration::from_millis(100 * u64::from(attempt)),
      error: "database is locked".into(),
   }
}

// ============================================================================
// Delivery
// ============================================================================

#[tokio::test]
async fn test_stream_yields_events_in_order() {
   let observer = BroadcastObserver::default();
   let mut stream = observer.subscribe_stream(Vec::<String>::new());

   observer.on_event(&retrying("insert", 1));
   observer.on_event(&retrying("insert", 2));
   observer.on_event(&WriteEvent::Recovered {
      operation: "insert".into(),
      attempts: 3,
      elapsed: Duration::from_millis(320),
   });

   let mut kinds = Vec::new();
   for _ in 0..3 {
      match timeout(Duration::from_millis(100), stream.next()).await {
         Ok(Some(WriteEventItem::Event(event))) => kinds.push((event.kind(), event.attempt())),
         other => panic!("unexpected item: {other:?}"),
      }
   }

   assert_eq!(
      kinds,
      vec![("retrying", 1), ("retrying", 2), ("recovered", 3)]
   );
}

#[tokio::test]
async fn test_every_subscriber_sees_every_event() {
   let observer = BroadcastObserver::default();
   let mut first = observer.subscribe();
   let mut second = observer.subscribe();

   observer.on_event(&retrying("update", 1));

   assert_eq!(first.recv().await.unwrap().operation(), "update");
   assert_eq!(second.recv().await.unwrap().operation(), "update");
}

// ============================================================================
// Filtering
// ============================================================================

#[tokio::test]
async fn test_stream_filters_by_operation() {
   let observer = BroadcastObserver::default();
   let mut stream = observer.subscribe_stream(["delete"]);

   observer.on_event(&retrying("insert", 1));
   observer.on_event(&retrying("delete", 1));

   let item = timeout(Duration::from_millis(100), stream.next())
      .await
      .expect("should receive the delete event");

   match item {
      Some(WriteEventItem::Event(event)) => assert_eq!(event.operation(), "delete"),
      other => panic!("unexpected item: {other:?}"),
   }

   let nothing = timeout(Duration::from_millis(50), stream.next()).await;
   assert!(nothing.is_err(), "insert event should have been filtered");
}

// ============================================================================
// Lag
// ============================================================================

#[tokio::test]
async fn test_slow_subscriber_is_told_about_lag() {
   let observer = BroadcastObserver::new(2);
   let mut stream = observer.subscribe_stream(Vec::<String>::new());

   for attempt in 1..=5 {
      observer.on_event(&retrying("insert", attempt));
   }

   let first = stream.next().await;
   assert_eq!(first, Some(WriteEventItem::Lagged(3)));

   match stream.next().await {
      Some(WriteEventItem::Event(event)) => assert_eq!(event.attempt(), 4),
      other => panic!("unexpected item: {other:?}"),
   }
}

#[tokio::test]
async fn test_stream_ends_when_observer_dropped() {
   let observer = BroadcastObserver::default();
   let mut stream = observer.subscribe_stream(Vec::<String>::new());

   drop(observer);

   assert_eq!(stream.next().await, None);
}

// ============================================================================
// Composition
// ============================================================================

#[tokio::test]
async fn test_fanout_with_tracing_and_broadcast() {
   let broadcast = Arc::new(BroadcastObserver::default());
   let mut rx = broadcast.subscribe();
   let fanout = FanoutObserver::new()
      .with(Arc::new(TracingObserver))
      .with(broadcast.clone());

   fanout.on_event(&WriteEvent::Exhausted {
      operation: "insert".into(),
      attempts: 10,
      error: "database is locked".into(),
   });

   let event = rx.recv().await.unwrap();
   assert_eq!(event.kind(), "exhausted");
   assert_eq!(event.attempt(), 10);
}
