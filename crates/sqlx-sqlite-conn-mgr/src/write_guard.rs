//! RAII guard over the single write connection

use std::ops::{Deref, DerefMut};

use sqlx::Sqlite;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteConnection;
use tracing::debug;

/// Exclusive handle to the write connection.
///
/// Dereferences to [`SqliteConnection`] so it can be passed to sqlx
/// executors as `&mut *guard`. Dropping the guard returns the connection to
/// the pool, unless [`WriteGuard::discard`] was called, in which case the
/// physical connection is closed instead. SQLite rolls back any open
/// transaction when its connection closes, so discarding is how a guard
/// with an unfinished transaction is kept from being handed to the next
/// writer.
#[must_use = "if unused, the write connection is immediately released"]
pub struct WriteGuard {
   conn: PoolConnection<Sqlite>,
}

impl WriteGuard {
   pub(crate) fn new(conn: PoolConnection<Sqlite>) -> Self {
      Self { conn }
   }

   /// Close the physical connection when this guard drops.
   pub fn discard(&mut self) {
      debug!("Write connection marked for close on drop");
      self.conn.close_on_drop();
   }
}

impl Deref for WriteGuard {
   type Target = SqliteConnection;

   fn deref(&self) -> &Self::Target {
      &self.conn
   }
}

impl DerefMut for WriteGuard {
   fn deref_mut(&mut self) -> &mut Self::Target {
      &mut self.conn
   }
}
