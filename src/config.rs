//! Store configuration as consumed from JSON or built in code

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx_sqlite_conn_mgr::{CheckpointMode, SqliteDatabaseConfig};
use sqlx_sqlite_writer::{RetryPolicy, Strategy};

use crate::{Error, Result};

/// Everything needed to open a [`Store`](crate::Store).
///
/// Field names are camelCase on the wire and every field except `path` has
/// a default, so `{"path": "app.db"}` is a complete configuration.
///
/// ```
/// use sqlx_sqlite_store::StoreConfig;
///
/// let config = StoreConfig::from_json_str(
///    r#"{ "path": "app.db", "busyTimeoutMs": 250, "useNativeQueuing": false }"#,
/// )
/// .unwrap();
/// assert_eq!(config.busy_timeout_ms, 250);
/// assert_eq!(config.max_retries, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
   pub path: PathBuf,
   pub max_open_conns: u32,
   pub max_idle_conns: u32,
   pub conn_max_lifetime_ms: u64,
   pub busy_timeout_ms: u64,
   pub enable_wal: bool,
   pub tx_immediate: bool,
   pub use_native_queuing: bool,
   /// Total attempts per write
   pub max_retries: u32,
   pub base_delay_ms: u64,
   pub max_delay_ms: u64,
   /// Run a checkpoint on this interval while the store is open.
   /// Absent or zero disables it.
   pub checkpoint_interval_ms: Option<u64>,
   /// Mode for periodic checkpoints. Unknown names fall back to NORMAL.
   pub checkpoint_mode: String,
}

impl Default for StoreConfig {
   fn default() -> Self {
      let db = SqliteDatabaseConfig::default();
      let retry = RetryPolicy::default();
      Self {
         path: PathBuf::new(),
         max_open_conns: db.max_open_connections,
         max_idle_conns: db.max_idle_connections,
         conn_max_lifetime_ms: duration_ms(db.max_lifetime),
         busy_timeout_ms: duration_ms(db.busy_timeout),
         enable_wal: db.enable_wal,
         tx_immediate: db.tx_immediate,
         use_native_queuing: retry.strategy == Strategy::NativeQueuing,
         max_retries: retry.max_retries,
         base_delay_ms: duration_ms(retry.base_delay),
         max_delay_ms: duration_ms(retry.max_delay),
         checkpoint_interval_ms: None,
         checkpoint_mode: CheckpointMode::default().as_str().to_string(),
      }
   }
}

impl StoreConfig {
   pub fn new(path: impl Into<PathBuf>) -> Self {
      Self {
         path: path.into(),
         ..Self::default()
      }
   }

   pub fn from_json_str(json: &str) -> Result<Self> {
      let config: Self = serde_json::from_str(json)?;
      config.validate()?;
      Ok(config)
   }

   pub fn validate(&self) -> Result<()> {
      if self.path.as_os_str().is_empty() {
         return Err(Error::InvalidConfig("path is required".to_string()));
      }
      Ok(())
   }

   pub fn database_config(&self) -> SqliteDatabaseConfig {
      SqliteDatabaseConfig {
         max_open_connections: self.max_open_conns,
         max_idle_connections: self.max_idle_conns,
         max_lifetime: Duration::from_millis(self.conn_max_lifetime_ms),
         busy_timeout: Duration::from_millis(self.busy_timeout_ms),
         enable_wal: self.enable_wal,
         tx_immediate: self.tx_immediate,
         ..SqliteDatabaseConfig::default()
      }
   }

   pub fn retry_policy(&self) -> RetryPolicy {
      RetryPolicy {
         max_retries: self.max_retries,
         base_delay: Duration::from_millis(self.base_delay_ms),
         max_delay: Duration::from_millis(self.max_delay_ms),
         strategy: Strategy::from_native_queuing(self.use_native_queuing),
      }
   }

   pub fn checkpoint_interval(&self) -> Option<Duration> {
      self
         .checkpoint_interval_ms
         .filter(|ms| *ms > 0)
         .map(Duration::from_millis)
   }

   pub fn checkpoint_mode(&self) -> CheckpointMode {
      CheckpointMode::parse_lenient(&self.checkpoint_mode)
   }
}

fn duration_ms(duration: Duration) -> u64 {
   u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_defaults() {
      let config = StoreConfig::new("app.db");

      assert_eq!(config.max_open_conns, 1);
      assert_eq!(config.max_idle_conns, 1);
      assert_eq!(config.conn_max_lifetime_ms, 600_000);
      assert_eq!(config.busy_timeout_ms, 5000);
      assert!(config.enable_wal);
      assert!(config.tx_immediate);
      assert!(config.use_native_queuing);
      assert_eq!(config.max_retries, 10);
      assert_eq!(config.base_delay_ms, 100);
      assert_eq!(config.max_delay_ms, 5000);
      assert_eq!(config.checkpoint_interval(), None);
      assert_eq!(config.checkpoint_mode(), CheckpointMode::Normal);
   }

   #[test]
   fn test_minimal_json() {
      let config = StoreConfig::from_json_str(r#"{"path": "/tmp/app.db"}"#).unwrap();
      assert_eq!(config, StoreConfig::new("/tmp/app.db"));
   }

   #[test]
   fn test_full_json() {
      let config = StoreConfig::from_json_str(
         r#"{
            "path": "data/app.db",
            "maxOpenConns": 2,
            "maxIdleConns": 0,
            "connMaxLifetimeMs": 1000,
            "busyTimeoutMs": 50,
            "enableWal": false,
            "txImmediate": false,
            "useNativeQueuing": false,
            "maxRetries": 3,
            "baseDelayMs": 20,
            "maxDelayMs": 80,
            "checkpointIntervalMs": 60000,
            "checkpointMode": "truncate"
         }"#,
      )
      .unwrap();

      let db = config.database_config();
      assert_eq!(db.max_open_connections, 2);
      assert_eq!(db.max_idle_connections, 0);
      assert_eq!(db.max_lifetime, Duration::from_secs(1));
      assert_eq!(db.busy_timeout, Duration::from_millis(50));
      assert!(!db.enable_wal);
      assert_eq!(db.begin_statement(), "BEGIN");

      let policy = config.retry_policy();
      assert_eq!(policy.max_retries, 3);
      assert_eq!(policy.base_delay, Duration::from_millis(20));
      assert_eq!(policy.max_delay, Duration::from_millis(80));
      assert_eq!(policy.strategy, Strategy::Mutex);

      assert_eq!(config.checkpoint_interval(), Some(Duration::from_secs(60)));
      assert_eq!(config.checkpoint_mode(), CheckpointMode::Truncate);
   }

   #[test]
   fn test_zero_interval_disables_checkpointing() {
      let config = StoreConfig {
         checkpoint_interval_ms: Some(0),
         ..StoreConfig::new("app.db")
      };
      assert_eq!(config.checkpoint_interval(), None);
   }

   #[test]
   fn test_unknown_checkpoint_mode_is_normal() {
      let config = StoreConfig {
         checkpoint_mode: "sideways".into(),
         ..StoreConfig::new("app.db")
      };
      assert_eq!(config.checkpoint_mode(), CheckpointMode::Normal);
   }

   #[test]
   fn test_missing_path_rejected() {
      let err = StoreConfig::from_json_str(r#"{"maxRetries": 2}"#).unwrap_err();
      assert!(matches!(err, Error::InvalidConfig(_)));
   }

   #[test]
   fn test_malformed_json_rejected() {
      let err = StoreConfig::from_json_str(r#"{"path": 5}"#).unwrap_err();
      assert!(matches!(err, Error::ConfigParse(_)));
   }
}
