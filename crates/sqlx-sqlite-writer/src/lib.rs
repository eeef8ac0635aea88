//! # sqlx-sqlite-writer
//!
//! Coordinated writes for a single-writer SQLite database managed by
//! [`sqlx_sqlite_conn_mgr`].
//!
//! Every write runs inside an explicit transaction on the one write
//! connection. When SQLite reports `SQLITE_BUSY` or `SQLITE_LOCKED` the
//! transaction is rolled back and the whole operation is attempted again
//! after a jittered exponential backoff. Anything else is rolled back and
//! returned unchanged.
//!
//! Two serialization strategies are available (see [`Strategy`]):
//!
//! - **Native queuing** (default): writers wait on the engine and the
//!   single-connection pool.
//! - **Mutex**: writers also take an in-process lock for the duration of
//!   each attempt, so at most one attempt runs at a time.
//!
//! Retries, recoveries, exhaustion and cancellation are reported through a
//! [`WriteObserver`](sqlx_sqlite_observer::WriteObserver).
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sqlx_sqlite_conn_mgr::{SqliteDatabase, SqliteDatabaseConfig};
//! use sqlx_sqlite_writer::{Error, RetryPolicy, Strategy, WriteCoordinator};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = SqliteDatabase::open("app.db", SqliteDatabaseConfig::default()).await?;
//! let coordinator = WriteCoordinator::new(
//!    Arc::clone(&db),
//!    RetryPolicy {
//!       strategy: Strategy::Mutex,
//!       ..RetryPolicy::default()
//!    },
//! );
//!
//! coordinator
//!    .write(|tx| {
//!       Box::pin(async move {
//!          sqlx::query("UPDATE counters SET value = value + 1 WHERE name = 'visits'")
//!             .execute(&mut **tx)
//!             .await?;
//!          Ok::<_, Error>(())
//!       })
//!    })
//!    .named("count_visit")
//!    .await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod classify;
mod coordinator;
mod error;
mod policy;
mod transaction;

pub use builder::WriteBuilder;
pub use classify::{ErrorClass, classify, is_busy_code, is_busy_message};
pub use coordinator::{DEFAULT_OPERATION_NAME, WriteCoordinator};
pub use error::{Error, Result};
pub use policy::{
   DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES, JITTER_FACTOR, RetryPolicy, Strategy,
};
pub use transaction::WriteTx;
