//! SQLite database owning the single write connection

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::checkpoint::{CheckpointMode, CheckpointResult, run_checkpoint};
use crate::config::SqliteDatabaseConfig;
use crate::pragma::{PragmaError, apply_pragmas, pragma_plan};
use crate::write_guard::WriteGuard;
use crate::{Error, Result};

/// SQLite database with one correctly configured write connection.
///
/// ## Architecture
///
/// - **`pool`**: sqlx pool bounded by `max_open_connections` (1 by default),
///   opened lazily on first use and never more than once
/// - **`closed`**: prevents use after the database has been closed
/// - **`path`**: database file path, also used to remove side files
///
/// Every physical connection runs the [`pragma_plan`] in its
/// `after_connect` hook, so connections recycled after `max_lifetime` come
/// back configured exactly like the first one.
///
/// ## Usage Pattern
///
/// ```text
/// 1. SqliteDatabase::new(path, config)   (no I/O)
/// 2. connect()                           (opens file, applies pragmas)
/// 3. acquire_writer()                    (exclusive connection for a transaction)
/// 4. checkpoint(mode)                    (optional maintenance)
/// 5. close()                             (final TRUNCATE checkpoint, then close)
/// ```
#[derive(Debug)]
pub struct SqliteDatabase {
   /// Pool holding the write connection, set once by `connect`
   pool: OnceCell<Pool<Sqlite>>,

   /// Marks database as closed to prevent further operations
   closed: AtomicBool,

   config: SqliteDatabaseConfig,

   path: PathBuf,
}

impl SqliteDatabase {
   /// Create an unconnected database handle.
   pub fn new(path: impl AsRef<Path>, config: SqliteDatabaseConfig) -> Self {
      Self {
         pool: OnceCell::new(),
         closed: AtomicBool::new(false),
         config,
         path: path.as_ref().to_path_buf(),
      }
   }

   /// Create a handle and connect it, returning it behind an `Arc` for
   /// sharing with a write coordinator.
   pub async fn open(path: impl AsRef<Path>, config: SqliteDatabaseConfig) -> Result<Arc<Self>> {
      let db = Arc::new(Self::new(path, config));
      db.connect().await?;
      Ok(db)
   }

   /// Open the physical connection and apply pragmas.
   ///
   /// Idempotent: concurrent and repeated calls share the one pool created
   /// by the first successful call. A failed attempt leaves the handle
   /// unconnected, so a later call may try again.
   pub async fn connect(&self) -> Result<&Pool<Sqlite>> {
      self.ensure_open()?;

      self
         .pool
         .get_or_try_init(|| async {
            let pool = self.build_pool().await?;
            debug!(
               path = %self.path.display(),
               max_connections = self.config.pool_max(),
               "SQLite connection opened"
            );
            Ok::<_, Error>(pool)
         })
         .await
   }

   /// Return the connection pool, connecting on first use.
   ///
   /// Failures are logged and returned as a typed error so callers that can
   /// run degraded decide for themselves what to do.
   pub async fn connection(&self) -> Result<&Pool<Sqlite>> {
      match self.connect().await {
         Ok(pool) => Ok(pool),
         Err(e) => {
            warn!(path = %self.path.display(), error = %e, "SQLite connection unavailable");
            Err(e)
         }
      }
   }

   /// Return the pool if `connect` has already succeeded.
   pub fn pool(&self) -> Result<&Pool<Sqlite>> {
      self.ensure_open()?;
      self.pool.get().ok_or(Error::NotInitialized)
   }

   /// Acquire exclusive use of the write connection.
   ///
   /// Waits up to `acquire_timeout` when another writer holds it. The
   /// connection is opened first if needed.
   pub async fn acquire_writer(&self) -> Result<WriteGuard> {
      let pool = self.connection().await?;
      let conn = pool.acquire().await?;
      Ok(WriteGuard::new(conn))
   }

   /// Fold the WAL back into the database file.
   ///
   /// Requires an open connection; fails with [`Error::NotInitialized`]
   /// otherwise.
   pub async fn checkpoint(&self, mode: CheckpointMode) -> Result<CheckpointResult> {
      let pool = self.pool()?;
      let mut conn = pool.acquire().await?;
      run_checkpoint(&mut conn, mode).await
   }

   /// Close the database.
   ///
   /// Runs a final `TRUNCATE` checkpoint (logged and ignored on failure),
   /// then closes the pool. Waits for an in-flight writer to release the
   /// connection. Safe to call when never connected and safe to call twice.
   pub async fn close(&self) -> Result<()> {
      if self.closed.swap(true, Ordering::SeqCst) {
         return Ok(());
      }

      let Some(pool) = self.pool.get() else {
         debug!(path = %self.path.display(), "Close called on unconnected database");
         return Ok(());
      };

      if self.config.enable_wal {
         match pool.acquire().await {
            Ok(mut conn) => {
               if let Err(e) = run_checkpoint(&mut conn, CheckpointMode::Truncate).await {
                  warn!(error = %e, "Final WAL checkpoint failed");
               }
            }
            Err(e) => warn!(error = %e, "Could not acquire connection for final checkpoint"),
         }
      }

      pool.close().await;
      debug!(path = %self.path.display(), "SQLite connection closed");
      Ok(())
   }

   /// Close the database and delete its file along with the `-wal` and
   /// `-shm` side files.
   pub async fn remove(&self) -> Result<()> {
      self.close().await?;

      for file in self.database_files() {
         match tokio::fs::remove_file(&file).await {
            Ok(()) => debug!("Removed {}", file.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
         }
      }

      Ok(())
   }

   pub fn is_connected(&self) -> bool {
      self.pool.initialized() && !self.is_closed()
   }

   pub fn is_closed(&self) -> bool {
      self.closed.load(Ordering::SeqCst)
   }

   pub fn path(&self) -> &Path {
      &self.path
   }

   pub fn config(&self) -> &SqliteDatabaseConfig {
      &self.config
   }

   fn ensure_open(&self) -> Result<()> {
      if self.is_closed() {
         return Err(Error::DatabaseClosed);
      }
      Ok(())
   }

   fn database_files(&self) -> Vec<PathBuf> {
      let base = self.path.as_os_str();
      ["", "-wal", "-shm"]
         .iter()
         .map(|suffix| {
            let mut name = base.to_os_string();
            name.push(suffix);
            PathBuf::from(name)
         })
         .collect()
   }

   async fn build_pool(&self) -> Result<Pool<Sqlite>> {
      let options = SqliteConnectOptions::new()
         .filename(&self.path)
         .create_if_missing(true)
         .busy_timeout(self.config.busy_timeout)
         .foreign_keys(self.config.foreign_keys);

      let plan = Arc::new(pragma_plan(&self.config));

      SqlitePoolOptions::new()
         .max_connections(self.config.pool_max())
         .min_connections(self.config.pool_min())
         .max_lifetime(Some(self.config.max_lifetime))
         .idle_timeout(Some(self.config.idle_timeout))
         .acquire_timeout(self.config.acquire_timeout)
         .after_connect(move |conn, _meta| {
            let plan = Arc::clone(&plan);
            Box::pin(async move {
               apply_pragmas(conn, &plan).await?;
               Ok(())
            })
         })
         .connect_with(options)
         .await
         .map_err(|e| self.open_error(e))
   }

   fn open_error(&self, err: sqlx::Error) -> Error {
      match err {
         sqlx::Error::Configuration(inner) => match inner.downcast::<PragmaError>() {
            Ok(pragma_err) => {
               let PragmaError { pragma, source } = *pragma_err;
               Error::Pragma { pragma, source }
            }
            Err(other) => Error::Open {
               path: self.path.clone(),
               source: sqlx::Error::Configuration(other),
            },
         },
         source => Error::Open {
            path: self.path.clone(),
            source,
         },
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use std::time::Duration;
   use tempfile::TempDir;

   fn temp_db(config: SqliteDatabaseConfig) -> (SqliteDatabase, TempDir) {
      let temp_dir = TempDir::new().expect("Failed to create temp directory");
      let db = SqliteDatabase::new(temp_dir.path().join("test.db"), config);
      (db, temp_dir)
   }

   #[tokio::test]
   async fn test_pool_before_connect_is_not_initialized() {
      let (db, _temp) = temp_db(SqliteDatabaseConfig::default());

      assert!(matches!(db.pool(), Err(Error::NotInitialized)));
      assert!(!db.is_connected());
   }

   #[tokio::test]
   async fn test_connect_is_idempotent() {
      let (db, _temp) = temp_db(SqliteDatabaseConfig::default());

      let first: *const Pool<Sqlite> = db.connect().await.unwrap();
      let second: *const Pool<Sqlite> = db.connect().await.unwrap();

      assert!(std::ptr::eq(first, second));
      assert_eq!(db.pool().unwrap().size(), 1);
      assert!(db.is_connected());
      assert!(db.path().exists());

      db.close().await.unwrap();
   }

   #[tokio::test]
   async fn test_concurrent_connect_opens_one_connection() {
      let (db, _temp) = temp_db(SqliteDatabaseConfig::default());
      let db = Arc::new(db);

      let tasks: Vec<_> = (0..8)
         .map(|_| {
            let db = Arc::clone(&db);
            tokio::spawn(async move { db.connect().await.map(|p| p.size()) })
         })
         .collect();

      for task in tasks {
         assert_eq!(task.await.unwrap().unwrap(), 1);
      }

      db.close().await.unwrap();
   }

   #[tokio::test]
   async fn test_pragmas_applied_on_connect() {
      let (db, _temp) = temp_db(SqliteDatabaseConfig::default());
      db.connect().await.unwrap();

      let mut writer = db.acquire_writer().await.unwrap();

      let journal: String = sqlx::query_scalar("PRAGMA journal_mode")
         .fetch_one(&mut *writer)
         .await
         .unwrap();
      let fk: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
         .fetch_one(&mut *writer)
         .await
         .unwrap();
      let busy: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
         .fetch_one(&mut *writer)
         .await
         .unwrap();
      let sync: i64 = sqlx::query_scalar("PRAGMA synchronous")
         .fetch_one(&mut *writer)
         .await
         .unwrap();

      assert_eq!(journal.to_lowercase(), "wal");
      assert_eq!(fk, 1);
      assert_eq!(busy, 5000);
      // NORMAL
      assert_eq!(sync, 1);

      drop(writer);
      db.close().await.unwrap();
   }

   #[tokio::test]
   async fn test_custom_pragmas_applied() {
      let (db, _temp) = temp_db(SqliteDatabaseConfig {
         busy_timeout: Duration::from_millis(1234),
         foreign_keys: false,
         enable_wal: false,
         ..Default::default()
      });

      let mut writer = db.acquire_writer().await.unwrap();

      let journal: String = sqlx::query_scalar("PRAGMA journal_mode")
         .fetch_one(&mut *writer)
         .await
         .unwrap();
      let fk: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
         .fetch_one(&mut *writer)
         .await
         .unwrap();
      let busy: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
         .fetch_one(&mut *writer)
         .await
         .unwrap();

      assert_eq!(journal.to_lowercase(), "delete");
      assert_eq!(fk, 0);
      assert_eq!(busy, 1234);

      drop(writer);
      db.close().await.unwrap();
   }

   #[tokio::test]
   async fn test_open_error_for_unreachable_path() {
      let temp_dir = TempDir::new().unwrap();
      let path = temp_dir.path().join("missing-dir").join("test.db");
      let db = SqliteDatabase::new(&path, SqliteDatabaseConfig::default());

      let err = db.connect().await.unwrap_err();

      assert!(matches!(err, Error::Open { .. }), "got {err:?}");
      assert!(matches!(db.pool(), Err(Error::NotInitialized)));
      assert!(db.connection().await.is_err());
   }

   #[tokio::test]
   async fn test_checkpoint_requires_connection() {
      let (db, _temp) = temp_db(SqliteDatabaseConfig::default());

      let err = db.checkpoint(CheckpointMode::Passive).await.unwrap_err();
      assert!(matches!(err, Error::NotInitialized));
   }

   #[tokio::test]
   async fn test_checkpoint_modes() {
      let (db, _temp) = temp_db(SqliteDatabaseConfig::default());
      let mut writer = db.acquire_writer().await.unwrap();
      sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)")
         .execute(&mut *writer)
         .await
         .unwrap();
      sqlx::query("INSERT INTO t (v) VALUES ('a'), ('b')")
         .execute(&mut *writer)
         .await
         .unwrap();
      drop(writer);

      let result = db.checkpoint(CheckpointMode::Truncate).await.unwrap();
      assert!(!result.busy);
      assert_eq!(result.log_frames, 0);

      let bogus = db
         .checkpoint(CheckpointMode::parse_lenient("bogus"))
         .await
         .unwrap();
      let normal = db.checkpoint(CheckpointMode::Normal).await.unwrap();
      assert_eq!(bogus, normal);

      db.close().await.unwrap();
   }

   #[tokio::test]
   async fn test_checkpoint_outside_wal_reports_negative_frames() {
      let (db, _temp) = temp_db(SqliteDatabaseConfig {
         enable_wal: false,
         ..Default::default()
      });
      db.connect().await.unwrap();

      let result = db.checkpoint(CheckpointMode::Passive).await.unwrap();
      assert_eq!(result.log_frames, -1);

      db.close().await.unwrap();
   }

   #[tokio::test]
   async fn test_close_without_connect_is_noop() {
      let (db, _temp) = temp_db(SqliteDatabaseConfig::default());

      db.close().await.expect("close should succeed");
      db.close().await.expect("second close should succeed");
      assert!(db.is_closed());
   }

   #[tokio::test]
   async fn test_operations_after_close_fail() {
      let (db, _temp) = temp_db(SqliteDatabaseConfig::default());
      db.connect().await.unwrap();
      db.close().await.unwrap();

      assert!(matches!(db.pool(), Err(Error::DatabaseClosed)));
      assert!(matches!(db.connect().await, Err(Error::DatabaseClosed)));
      assert!(matches!(
         db.acquire_writer().await,
         Err(Error::DatabaseClosed)
      ));
      assert!(matches!(
         db.checkpoint(CheckpointMode::Full).await,
         Err(Error::DatabaseClosed)
      ));
   }

   #[tokio::test]
   async fn test_close_truncates_wal() {
      let (db, temp) = temp_db(SqliteDatabaseConfig::default());
      let mut writer = db.acquire_writer().await.unwrap();
      sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY)")
         .execute(&mut *writer)
         .await
         .unwrap();
      drop(writer);

      db.close().await.unwrap();

      let wal = temp.path().join("test.db-wal");
      let wal_len = std::fs::metadata(&wal).map(|m| m.len()).unwrap_or(0);
      assert_eq!(wal_len, 0);
   }

   #[tokio::test]
   async fn test_remove_deletes_files() {
      let (db, temp) = temp_db(SqliteDatabaseConfig::default());
      db.connect().await.unwrap();
      let main = temp.path().join("test.db");
      assert!(main.exists());

      db.remove().await.unwrap();

      assert!(!main.exists());
      assert!(!temp.path().join("test.db-wal").exists());
      assert!(!temp.path().join("test.db-shm").exists());
   }

   #[tokio::test]
   async fn test_discarded_guard_rolls_back_open_transaction() {
      let (db, _temp) = temp_db(SqliteDatabaseConfig::default());
      {
         let mut writer = db.acquire_writer().await.unwrap();
         sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .execute(&mut *writer)
            .await
            .unwrap();
      }

      {
         let mut writer = db.acquire_writer().await.unwrap();
         sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *writer)
            .await
            .unwrap();
         sqlx::query("INSERT INTO t (id) VALUES (1)")
            .execute(&mut *writer)
            .await
            .unwrap();
         writer.discard();
      }

      let mut writer = db.acquire_writer().await.unwrap();
      let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
         .fetch_one(&mut *writer)
         .await
         .unwrap();
      assert_eq!(count, 0);

      drop(writer);
      db.close().await.unwrap();
   }
}
