//! # sqlx-sqlite-observer
//!
//! The observability side of coordinated SQLite writes. A write coordinator
//! reports retries, recoveries, exhaustion and cancellation through the
//! [`WriteObserver`] trait and never implements logging itself.
//!
//! Observers provided here:
//!
//! - [`TracingObserver`]: structured `tracing` events (the usual default)
//! - [`BroadcastObserver`]: fan-out to async subscribers, also as a `Stream`
//! - [`FanoutObserver`]: forwards to several observers
//! - [`NoopObserver`]: discards everything
//!
//! # Example
//!
//! ```
//! use futures::StreamExt;
//! use sqlx_sqlite_observer::{BroadcastObserver, WriteEvent, WriteEventItem, WriteObserver};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let observer = BroadcastObserver::default();
//! let mut events = observer.subscribe_stream(["insert_user"]);
//!
//! observer.on_event(&WriteEvent::Cancelled {
//!    operation: "insert_user".into(),
//!    attempts: 1,
//! });
//!
//! let item = events.next().await;
//! assert!(matches!(item, Some(WriteEventItem::Event(_))));
//! # }
//! ```

mod broadcast;
mod event;
mod observer;
mod stream;

pub use broadcast::{BroadcastObserver, DEFAULT_CHANNEL_CAPACITY};
pub use event::{WriteEvent, WriteEventItem};
pub use observer::{FanoutObserver, NoopObserver, TracingObserver, WriteObserver};
pub use stream::WriteEventStream;
