//! Store facade tying the connection manager, write coordinator and
//! checkpointer together

use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use sqlx_sqlite_conn_mgr::{CheckpointMode, CheckpointResult, SqliteDatabase};
use sqlx_sqlite_observer::{
   BroadcastObserver, FanoutObserver, TracingObserver, WriteEvent, WriteEventStream, WriteObserver,
};
use sqlx_sqlite_writer::{WriteBuilder, WriteCoordinator, WriteTx};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::checkpointer::spawn_checkpointer;
use crate::config::StoreConfig;
use crate::{Error, Result};

/// Builder for a [`Store`].
pub struct Builder {
   config: StoreConfig,
   observer: Option<Arc<dyn WriteObserver>>,
   broadcast_capacity: Option<usize>,
}

impl Builder {
   pub fn new(config: StoreConfig) -> Self {
      Self {
         config,
         observer: None,
         broadcast_capacity: None,
      }
   }

   /// Report write events to `observer` instead of the default
   /// [`TracingObserver`].
   pub fn observer(mut self, observer: Arc<dyn WriteObserver>) -> Self {
      self.observer = Some(observer);
      self
   }

   /// Also publish write events to subscribers, enabling
   /// [`Store::subscribe`].
   pub fn broadcast(mut self, capacity: usize) -> Self {
      self.broadcast_capacity = Some(capacity);
      self
   }

   /// Validate the configuration, open the database and start the
   /// checkpointer if one is configured.
   pub async fn open(self) -> Result<Store> {
      self.config.validate()?;
      ensure_parent_dir(&self.config.path).await?;

      let db = SqliteDatabase::open(&self.config.path, self.config.database_config()).await?;

      let broadcast = self
         .broadcast_capacity
         .map(|capacity| Arc::new(BroadcastObserver::new(capacity)));
      let observer: Arc<dyn WriteObserver> = match (&broadcast, self.observer) {
         (None, Some(observer)) => observer,
         (None, None) => Arc::new(TracingObserver),
         (Some(events), observer) => Arc::new(
            FanoutObserver::new()
               .with(observer.unwrap_or_else(|| Arc::new(TracingObserver)))
               .with(events.clone()),
         ),
      };

      let coordinator = WriteCoordinator::new(Arc::clone(&db), self.config.retry_policy())
         .with_observer(observer);

      let shutdown = CancellationToken::new();
      let checkpointer = match self.config.checkpoint_interval() {
         Some(interval) if self.config.enable_wal => Some(spawn_checkpointer(
            Arc::clone(&db),
            interval,
            self.config.checkpoint_mode(),
            shutdown.child_token(),
         )),
         Some(_) => {
            debug!("WAL disabled, periodic checkpointing not started");
            None
         }
         None => None,
      };

      debug!("Store opened at {}", self.config.path.display());

      Ok(Store {
         db,
         coordinator,
         broadcast,
         config: self.config,
         shutdown,
         checkpointer: Mutex::new(checkpointer),
      })
   }
}

/// An open single-writer SQLite database with coordinated writes.
///
/// Writes go through [`Store::perform_write`] or [`Store::write`]; reads can
/// use [`Store::database`] directly. Call [`Store::shutdown`] before
/// dropping to stop the checkpointer and run the final checkpoint.
pub struct Store {
   db: Arc<SqliteDatabase>,
   coordinator: WriteCoordinator,
   broadcast: Option<Arc<BroadcastObserver>>,
   config: StoreConfig,
   shutdown: CancellationToken,
   checkpointer: Mutex<Option<JoinHandle<()>>>,
}

impl Store {
   /// Open with the default observer.
   pub async fn open(config: StoreConfig) -> Result<Self> {
      Builder::new(config).open().await
   }

   pub fn builder(config: StoreConfig) -> Builder {
      Builder::new(config)
   }

   /// See [`WriteCoordinator::perform_write`].
   pub async fn perform_write<T, F>(&self, op: F) -> sqlx_sqlite_writer::Result<T>
   where
      T: Send,
      F: for<'c> FnMut(&'c mut WriteTx) -> BoxFuture<'c, sqlx_sqlite_writer::Result<T>> + Send,
   {
      self.coordinator.perform_write(op).await
   }

   /// See [`WriteCoordinator::write`].
   pub fn write<T, F>(&self, op: F) -> WriteBuilder<'_, T, F>
   where
      T: Send,
      F: for<'c> FnMut(&'c mut WriteTx) -> BoxFuture<'c, sqlx_sqlite_writer::Result<T>> + Send,
   {
      self.coordinator.write(op)
   }

   /// Run a checkpoint now. `mode` is parsed leniently; unknown names run
   /// a NORMAL checkpoint.
   pub async fn checkpoint(&self, mode: &str) -> Result<CheckpointResult> {
      let mode = CheckpointMode::parse_lenient(mode);
      Ok(self.db.checkpoint(mode).await?)
   }

   pub fn database(&self) -> &Arc<SqliteDatabase> {
      &self.db
   }

   pub fn coordinator(&self) -> &WriteCoordinator {
      &self.coordinator
   }

   pub fn config(&self) -> &StoreConfig {
      &self.config
   }

   /// Receive write events. `None` unless built with
   /// [`Builder::broadcast`].
   pub fn subscribe(&self) -> Option<broadcast::Receiver<WriteEvent>> {
      self.broadcast.as_ref().map(|events| events.subscribe())
   }

   /// Stream write events for the named operations (all operations when
   /// empty). `None` unless built with [`Builder::broadcast`].
   pub fn subscribe_stream<I, S>(&self, operations: I) -> Option<WriteEventStream>
   where
      I: IntoIterator<Item = S>,
      S: Into<String>,
   {
      self
         .broadcast
         .as_ref()
         .map(|events| events.subscribe_stream(operations))
   }

   /// Stop the checkpointer, then close the database. Closing runs a final
   /// TRUNCATE checkpoint when WAL is enabled. Safe to call more than once.
   pub async fn shutdown(&self) -> Result<()> {
      self.shutdown.cancel();
      let checkpointer = self.checkpointer.lock().await.take();
      if let Some(handle) = checkpointer
         && let Err(e) = handle.await
      {
         warn!("Periodic checkpointer ended abnormally: {}", e);
      }
      self.db.close().await?;
      Ok(())
   }

   /// Shut down and delete the database files.
   pub async fn remove(&self) -> Result<()> {
      self.shutdown().await?;
      self.db.remove().await?;
      Ok(())
   }
}

impl Drop for Store {
   fn drop(&mut self) {
      self.shutdown.cancel();
   }
}

async fn ensure_parent_dir(path: &Path) -> Result<()> {
   if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
   {
      tokio::fs::create_dir_all(parent).await?;
   }
   Ok(())
}
