//! # sqlx-sqlite-store
//!
//! A single-writer SQLite store: one pooled connection configured for WAL,
//! writes wrapped in explicit transactions and retried on `SQLITE_BUSY`,
//! and optional periodic WAL checkpoints.
//!
//! The pieces live in their own crates and are re-exported here:
//!
//! - [`sqlx_sqlite_conn_mgr`]: connection lifecycle, pragmas, checkpoints
//! - [`sqlx_sqlite_writer`]: the retrying write coordinator
//! - [`sqlx_sqlite_observer`]: write event reporting
//!
//! ## Example
//!
//! ```no_run
//! use sqlx_sqlite_store::{Store, StoreConfig, WriteError};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open(StoreConfig::from_json_str(
//!    r#"{ "path": "data/app.db", "checkpointIntervalMs": 60000 }"#,
//! )?)
//! .await?;
//!
//! store
//!    .write(|tx| {
//!       Box::pin(async move {
//!          sqlx::query("INSERT INTO notes (body) VALUES ('hello')")
//!             .execute(&mut **tx)
//!             .await?;
//!          Ok::<_, WriteError>(())
//!       })
//!    })
//!    .named("add_note")
//!    .await?;
//!
//! store.checkpoint("passive").await?;
//! store.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod checkpointer;
mod config;
mod error;
mod store;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::{Builder, Store};

pub use sqlx_sqlite_conn_mgr::{CheckpointMode, CheckpointResult, SqliteDatabase, SqliteDatabaseConfig};
pub use sqlx_sqlite_observer::{
   BroadcastObserver, FanoutObserver, NoopObserver, TracingObserver, WriteEvent, WriteEventItem,
   WriteEventStream, WriteObserver,
};
pub use sqlx_sqlite_writer::{
   Error as WriteError, RetryPolicy, Strategy, WriteBuilder, WriteCoordinator, WriteTx,
};
