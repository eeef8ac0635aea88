//! Awaitable builder for named and cancellable writes

use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::pin::Pin;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::coordinator::{DEFAULT_OPERATION_NAME, WriteCoordinator};
use crate::transaction::WriteTx;
use crate::Result;

/// Builder returned by [`WriteCoordinator::write`].
///
/// ```no_run
/// # use sqlx_sqlite_writer::{Error, WriteCoordinator};
/// # use tokio_util::sync::CancellationToken;
/// # async fn demo(coordinator: &WriteCoordinator, shutdown: CancellationToken) -> Result<(), Error> {
/// let id: i64 = coordinator
///    .write(|tx| {
///       Box::pin(async move {
///          let id = sqlx::query_scalar::<_, i64>("INSERT INTO jobs (state) VALUES ('queued') RETURNING id")
///             .fetch_one(&mut **tx)
///             .await?;
///          Ok::<_, Error>(id)
///       })
///    })
///    .named("enqueue_job")
///    .with_cancellation(shutdown)
///    .await?;
/// # Ok(())
/// # }
/// ```
pub struct WriteBuilder<'a, T, F> {
   coordinator: &'a WriteCoordinator,
   operation: String,
   cancel: Option<CancellationToken>,
   op: F,
   _output: PhantomData<fn() -> T>,
}

impl<'a, T, F> WriteBuilder<'a, T, F>
where
   T: Send,
   F: for<'c> FnMut(&'c mut WriteTx) -> BoxFuture<'c, Result<T>> + Send,
{
   pub(crate) fn new(coordinator: &'a WriteCoordinator, op: F) -> Self {
      Self {
         coordinator,
         operation: DEFAULT_OPERATION_NAME.to_string(),
         cancel: None,
         op,
         _output: PhantomData,
      }
   }

   /// Name used in logs, events and errors for this write
   pub fn named(mut self, operation: impl Into<String>) -> Self {
      self.operation = operation.into();
      self
   }

   /// Stop retrying once `token` is cancelled.
   ///
   /// Cancellation is observed before each attempt and during backoff
   /// sleeps. An attempt already in flight runs to commit or rollback.
   pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
      self.cancel = Some(token);
      self
   }

   /// Run the write
   pub async fn execute(self) -> Result<T> {
      self
         .coordinator
         .run(&self.operation, self.cancel.as_ref(), self.op)
         .await
   }
}

impl<'a, T, F> IntoFuture for WriteBuilder<'a, T, F>
where
   T: Send + 'a,
   F: for<'c> FnMut(&'c mut WriteTx) -> BoxFuture<'c, Result<T>> + Send + 'a,
{
   type Output = Result<T>;
   type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(self.execute())
   }
}
