//! # sqlx-sqlite-conn-mgr
//!
//! Owns the one physical connection a single-writer SQLite store allows,
//! configured so that WAL-mode readers elsewhere are never blocked by it.
//!
//! ## Core Types
//!
//! - **[`SqliteDatabase`]**: Lazily connected handle with connect/close/checkpoint
//! - **[`SqliteDatabaseConfig`]**: Pool bounds and per-connection pragma settings
//! - **[`WriteGuard`]**: RAII guard ensuring exclusive use of the write connection
//! - **[`CheckpointMode`]**: WAL checkpoint modes, parsed leniently
//! - **[`Error`]**: Error type for database operations
//!
//! ## Architecture
//!
//! - **One connection**: the sqlx pool is bounded to a single connection by default
//! - **Ordered pragmas**: busy_timeout, synchronous, temp_store, journal_mode, foreign_keys
//! - **Explicit ownership**: no global registry; the application owns the handle
//! - **Orderly close**: a final `TRUNCATE` checkpoint precedes closing the pool
//!
//! ## Usage
//!
//! ```no_run
//! use sqlx_sqlite_conn_mgr::{CheckpointMode, SqliteDatabase, SqliteDatabaseConfig};
//!
//! #[tokio::main]
//! async fn main() -> sqlx_sqlite_conn_mgr::Result<()> {
//!    let db = SqliteDatabase::open("example.db", SqliteDatabaseConfig::default()).await?;
//!
//!    let mut writer = db.acquire_writer().await?;
//!    sqlx::query("CREATE TABLE IF NOT EXISTS users (name TEXT)")
//!       .execute(&mut *writer)
//!       .await?;
//!    drop(writer);
//!
//!    db.checkpoint(CheckpointMode::Passive).await?;
//!    db.close().await?;
//!    Ok(())
//! }
//! ```

mod checkpoint;
mod config;
mod database;
mod error;
mod pragma;
mod write_guard;

// Re-export public types
pub use checkpoint::{CheckpointMode, CheckpointResult};
pub use config::{SqliteDatabaseConfig, SynchronousMode, TempStore};
pub use database::SqliteDatabase;
pub use error::{Error, Result};
pub use pragma::{Pragma, pragma_plan};
pub use write_guard::WriteGuard;
