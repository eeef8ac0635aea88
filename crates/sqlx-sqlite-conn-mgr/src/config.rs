//! Configuration for the single SQLite write connection

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `PRAGMA synchronous` level applied to every new connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SynchronousMode {
   Off,
   /// Safe with WAL: durable across application crashes, may lose the last
   /// transactions on power loss.
   #[default]
   Normal,
   Full,
   Extra,
}

impl SynchronousMode {
   pub fn as_str(&self) -> &'static str {
      match self {
         SynchronousMode::Off => "OFF",
         SynchronousMode::Normal => "NORMAL",
         SynchronousMode::Full => "FULL",
         SynchronousMode::Extra => "EXTRA",
      }
   }
}

impl fmt::Display for SynchronousMode {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

/// `PRAGMA temp_store` location applied to every new connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TempStore {
   Default,
   File,
   #[default]
   Memory,
}

impl TempStore {
   pub fn as_str(&self) -> &'static str {
      match self {
         TempStore::Default => "DEFAULT",
         TempStore::File => "FILE",
         TempStore::Memory => "MEMORY",
      }
   }
}

impl fmt::Display for TempStore {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

/// Configuration for a [`SqliteDatabase`](crate::SqliteDatabase)
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_conn_mgr::SqliteDatabaseConfig;
/// use std::time::Duration;
///
/// // Use defaults
/// let config = SqliteDatabaseConfig::default();
/// assert_eq!(config.max_open_connections, 1);
///
/// // Override just a few fields
/// let config = SqliteDatabaseConfig {
///     busy_timeout: Duration::from_millis(250),
///     tx_immediate: false,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct SqliteDatabaseConfig {
   /// Upper bound on open physical connections
   ///
   /// SQLite admits a single writer, so anything above 1 only adds
   /// connections that contend for the same file lock.
   ///
   /// Default: 1
   pub max_open_connections: u32,

   /// Connections kept open while idle
   ///
   /// Clamped to `max_open_connections`.
   ///
   /// Default: 1
   pub max_idle_connections: u32,

   /// Ceiling on the lifetime of a physical connection. A recycled
   /// connection gets its pragmas applied again on open.
   ///
   /// Default: 10 minutes
   pub max_lifetime: Duration,

   /// Idle timeout for connections above `max_idle_connections`
   ///
   /// Default: 30 seconds
   pub idle_timeout: Duration,

   /// How long a caller waits for the pooled connection before the pool
   /// reports a timeout
   ///
   /// Default: 30 seconds
   pub acquire_timeout: Duration,

   /// Engine-side wait for a file lock before returning `SQLITE_BUSY`
   ///
   /// Default: 5000 ms
   pub busy_timeout: Duration,

   /// Switch the journal to write-ahead logging on connect
   ///
   /// Default: true
   pub enable_wal: bool,

   /// Default: NORMAL
   pub synchronous: SynchronousMode,

   /// Default: MEMORY
   pub temp_store: TempStore,

   /// Default: true
   pub foreign_keys: bool,

   /// Open write transactions with `BEGIN IMMEDIATE` instead of a deferred
   /// `BEGIN`
   ///
   /// Taking the write lock up front avoids two deferred transactions that
   /// both hold read locks deadlocking on upgrade. Contention then shows up
   /// as `SQLITE_BUSY` on `BEGIN`, which is retryable.
   ///
   /// Default: true
   pub tx_immediate: bool,
}

impl Default for SqliteDatabaseConfig {
   fn default() -> Self {
      Self {
         max_open_connections: 1,
         max_idle_connections: 1,
         max_lifetime: Duration::from_secs(10 * 60),
         idle_timeout: Duration::from_secs(30),
         acquire_timeout: Duration::from_secs(30),
         busy_timeout: Duration::from_millis(5000),
         enable_wal: true,
         synchronous: SynchronousMode::Normal,
         temp_store: TempStore::Memory,
         foreign_keys: true,
         tx_immediate: true,
      }
   }
}

impl SqliteDatabaseConfig {
   /// Statement used to open a write transaction.
   pub fn begin_statement(&self) -> &'static str {
      if self.tx_immediate {
         "BEGIN IMMEDIATE"
      } else {
         "BEGIN"
      }
   }

   /// Pool size, never zero.
   pub(crate) fn pool_max(&self) -> u32 {
      self.max_open_connections.max(1)
   }

   /// Idle floor, never above the pool size.
   pub(crate) fn pool_min(&self) -> u32 {
      self.max_idle_connections.min(self.pool_max())
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_defaults_match_single_writer_policy() {
      let config = SqliteDatabaseConfig::default();

      assert_eq!(config.max_open_connections, 1);
      assert_eq!(config.max_idle_connections, 1);
      assert_eq!(config.max_lifetime, Duration::from_secs(600));
      assert_eq!(config.busy_timeout, Duration::from_millis(5000));
      assert!(config.enable_wal);
      assert!(config.tx_immediate);
      assert!(config.foreign_keys);
   }

   #[test]
   fn test_begin_statement() {
      let mut config = SqliteDatabaseConfig::default();
      assert_eq!(config.begin_statement(), "BEGIN IMMEDIATE");

      config.tx_immediate = false;
      assert_eq!(config.begin_statement(), "BEGIN");
   }

   #[test]
   fn test_pool_bounds_are_clamped() {
      let config = SqliteDatabaseConfig {
         max_open_connections: 0,
         max_idle_connections: 4,
         ..Default::default()
      };

      assert_eq!(config.pool_max(), 1);
      assert_eq!(config.pool_min(), 1);
   }

   #[test]
   fn test_mode_names() {
      assert_eq!(SynchronousMode::Extra.to_string(), "EXTRA");
      assert_eq!(TempStore::File.to_string(), "FILE");
   }
}
