//! Retry loop around single-writer transactions

use std::sync::Arc;

use futures::future::BoxFuture;
use sqlx_sqlite_conn_mgr::SqliteDatabase;
use sqlx_sqlite_observer::{TracingObserver, WriteEvent, WriteObserver};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span};
use uuid::Uuid;

use crate::builder::WriteBuilder;
use crate::policy::{RetryPolicy, Strategy};
use crate::transaction::WriteTx;
use crate::{Error, Result};

/// Operation name used when the caller does not provide one.
pub const DEFAULT_OPERATION_NAME: &str = "write";

/// Runs write operations inside explicit transactions on the single write
/// connection, retrying them when SQLite reports lock contention.
///
/// Each attempt acquires the writer, issues `BEGIN` (or `BEGIN IMMEDIATE`),
/// runs the operation, then commits. Any error rolls the attempt back. Busy
/// and locked errors are retried with jittered exponential backoff until the
/// policy's attempt budget is spent; every other error is returned to the
/// caller unchanged after the rollback.
///
/// Operations may run several times, so they must be safe to repeat. A
/// rolled-back attempt leaves no database changes behind, but side effects
/// outside the transaction are the operation's own responsibility.
pub struct WriteCoordinator {
   db: Arc<SqliteDatabase>,
   policy: RetryPolicy,
   write_lock: Mutex<()>,
   observer: Arc<dyn WriteObserver>,
}

impl WriteCoordinator {
   pub fn new(db: Arc<SqliteDatabase>, policy: RetryPolicy) -> Self {
      Self {
         db,
         policy,
         write_lock: Mutex::new(()),
         observer: Arc::new(TracingObserver),
      }
   }

   /// Replace the default [`TracingObserver`].
   pub fn with_observer(mut self, observer: Arc<dyn WriteObserver>) -> Self {
      self.observer = observer;
      self
   }

   pub fn policy(&self) -> &RetryPolicy {
      &self.policy
   }

   pub fn database(&self) -> &Arc<SqliteDatabase> {
      &self.db
   }

   /// Run `op` as one atomic write, retrying on busy/locked errors.
   ///
   /// The operation receives the open transaction and returns a boxed
   /// future, the same shape `sqlx::Connection::transaction` takes:
   ///
   /// ```no_run
   /// # use sqlx_sqlite_writer::{Error, WriteCoordinator};
   /// # async fn demo(coordinator: &WriteCoordinator) -> Result<(), Error> {
   /// coordinator
   ///    .perform_write(|tx| {
   ///       Box::pin(async move {
   ///          sqlx::query("INSERT INTO users (name) VALUES (?)")
   ///             .bind("alice")
   ///             .execute(&mut **tx)
   ///             .await?;
   ///          Ok::<_, Error>(())
   ///       })
   ///    })
   ///    .await
   /// # }
   /// ```
   pub async fn perform_write<T, F>(&self, op: F) -> Result<T>
   where
      T: Send,
      F: for<'c> FnMut(&'c mut WriteTx) -> BoxFuture<'c, Result<T>> + Send,
   {
      self.run(DEFAULT_OPERATION_NAME, None, op).await
   }

   /// Start a named and/or cancellable write. Await the returned builder to
   /// run it.
   pub fn write<T, F>(&self, op: F) -> WriteBuilder<'_, T, F>
   where
      T: Send,
      F: for<'c> FnMut(&'c mut WriteTx) -> BoxFuture<'c, Result<T>> + Send,
   {
      WriteBuilder::new(self, op)
   }

   pub(crate) async fn run<T, F>(
      &self,
      operation: &str,
      cancel: Option<&CancellationToken>,
      mut op: F,
   ) -> Result<T>
   where
      T: Send,
      F: for<'c> FnMut(&'c mut WriteTx) -> BoxFuture<'c, Result<T>> + Send,
   {
      let span = debug_span!(
         "write",
         write_id = %Uuid::new_v4(),
         operation,
         strategy = ?self.policy.strategy
      );
      self
         .retry_loop(operation, cancel, &mut op)
         .instrument(span)
         .await
   }

   async fn retry_loop<T, F>(
      &self,
      operation: &str,
      cancel: Option<&CancellationToken>,
      op: &mut F,
   ) -> Result<T>
   where
      T: Send,
      F: for<'c> FnMut(&'c mut WriteTx) -> BoxFuture<'c, Result<T>> + Send,
   {
      let max_attempts = self.policy.max_attempts();
      let started = Instant::now();
      let mut attempt: u32 = 1;

      loop {
         if let Some(token) = cancel
            && token.is_cancelled()
         {
            return Err(self.cancelled(operation, attempt - 1));
         }

         let result = match self.policy.strategy {
            Strategy::Mutex => {
               // Released at the end of this arm, before any backoff sleep
               let _serialized = match cancel {
                  Some(token) => tokio::select! {
                     guard = self.write_lock.lock() => guard,
                     () = token.cancelled() => {
                        return Err(self.cancelled(operation, attempt - 1));
                     }
                  },
                  None => self.write_lock.lock().await,
               };
               self.attempt(attempt, op).await
            }
            Strategy::NativeQueuing => self.attempt(attempt, op).await,
         };

         let err = match result {
            Ok(value) => {
               if attempt > 1 {
                  self.observer.on_event(&WriteEvent::Recovered {
                     operation: operation.to_string(),
                     attempts: attempt,
                     elapsed: started.elapsed(),
                  });
               }
               return Ok(value);
            }
            Err(err) => err,
         };

         if !err.is_transient() {
            debug!(attempt, "Write failed with non-retryable error: {}", err);
            return Err(err);
         }

         if attempt >= max_attempts {
            self.observer.on_event(&WriteEvent::Exhausted {
               operation: operation.to_string(),
               attempts: attempt,
               error: err.to_string(),
            });
            return Err(Error::RetriesExhausted {
               operation: operation.to_string(),
               attempts: attempt,
               source: Box::new(err),
            });
         }

         let delay = self.policy.jittered_delay(attempt);
         self.observer.on_event(&WriteEvent::Retrying {
            operation: operation.to_string(),
            attempt,
            max_attempts,
            delay,
            error: err.to_string(),
         });

         match cancel {
            Some(token) => {
               tokio::select! {
                  () = sleep(delay) => {}
                  () = token.cancelled() => {
                     return Err(self.cancelled(operation, attempt));
                  }
               }
            }
            None => sleep(delay).await,
         }

         attempt += 1;
      }
   }

   /// One transaction: acquire, begin, run, commit. Rolls back on any error.
   async fn attempt<T, F>(&self, attempt: u32, op: &mut F) -> Result<T>
   where
      T: Send,
      F: for<'c> FnMut(&'c mut WriteTx) -> BoxFuture<'c, Result<T>> + Send,
   {
      let writer = self.db.acquire_writer().await?;
      let mut tx = WriteTx::begin(writer, attempt, self.db.config().begin_statement()).await?;

      match op(&mut tx).await {
         Ok(value) => {
            tx.commit().await?;
            Ok(value)
         }
         Err(e) => {
            debug!(attempt, "Write operation failed, rolling back: {}", e);
            tx.rollback().await;
            Err(e)
         }
      }
   }

   fn cancelled(&self, operation: &str, attempts: u32) -> Error {
      self.observer.on_event(&WriteEvent::Cancelled {
         operation: operation.to_string(),
         attempts,
      });
      Error::Cancelled {
         operation: operation.to_string(),
         attempts,
      }
   }
}
