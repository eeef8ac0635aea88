//! Explicit transaction wrapped around one write attempt

use std::ops::{Deref, DerefMut};

use sqlx::sqlite::SqliteConnection;
use sqlx_sqlite_conn_mgr::WriteGuard;
use tracing::{debug, warn};

use crate::Result;

/// Open transaction handed to a write operation.
///
/// Dereferences to [`SqliteConnection`], so statements run as
/// `query.execute(&mut **tx)` or `query.execute(tx.conn())`. The
/// coordinator owns `COMMIT` and `ROLLBACK`; operations must not issue
/// either themselves.
#[must_use = "if unused, the transaction is immediately rolled back"]
pub struct WriteTx {
   writer: WriteGuard,
   attempt: u32,
   open: bool,
}

impl WriteTx {
   pub(crate) async fn begin(
      mut writer: WriteGuard,
      attempt: u32,
      begin_statement: &'static str,
   ) -> Result<Self> {
      sqlx::query(begin_statement).execute(&mut *writer).await?;
      debug!(attempt, "Transaction started ({})", begin_statement);
      Ok(Self {
         writer,
         attempt,
         open: true,
      })
   }

   /// 1-based number of the attempt this transaction belongs to.
   pub fn attempt(&self) -> u32 {
      self.attempt
   }

   pub fn conn(&mut self) -> &mut SqliteConnection {
      &mut self.writer
   }

   /// Commit. On failure the transaction is rolled back before the commit
   /// error is returned.
   pub(crate) async fn commit(&mut self) -> Result<()> {
      match sqlx::query("COMMIT").execute(&mut *self.writer).await {
         Ok(_) => {
            self.open = false;
            debug!(attempt = self.attempt, "Transaction committed");
            Ok(())
         }
         Err(e) => {
            debug!(attempt = self.attempt, "Commit failed: {}", e);
            self.rollback().await;
            Err(e.into())
         }
      }
   }

   /// Best-effort rollback. If it fails the connection is closed instead of
   /// going back to the pool, which drops the transaction with it.
   pub(crate) async fn rollback(&mut self) {
      if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *self.writer).await {
         warn!(
            attempt = self.attempt,
            "Rollback failed, discarding write connection: {}", e
         );
         self.writer.discard();
      } else {
         debug!(attempt = self.attempt, "Transaction rolled back");
      }
      self.open = false;
   }
}

impl Deref for WriteTx {
   type Target = SqliteConnection;

   fn deref(&self) -> &Self::Target {
      &self.writer
   }
}

impl DerefMut for WriteTx {
   fn deref_mut(&mut self) -> &mut Self::Target {
      &mut self.writer
   }
}

impl Drop for WriteTx {
   fn drop(&mut self) {
      // Dropped mid-operation (caller future dropped). The connection must
      // not return to the pool with a live transaction.
      if self.open {
         debug!(
            attempt = self.attempt,
            "Dropping open transaction, connection will be closed"
         );
         self.writer.discard();
      }
   }
}
