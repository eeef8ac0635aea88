//! Error types for sqlx-sqlite-conn-mgr

use std::path::PathBuf;

use thiserror::Error;

/// Errors that may occur when working with sqlx-sqlite-conn-mgr
#[derive(Error, Debug)]
pub enum Error {
   /// IO error when accessing database files. Standard library IO errors
   /// are converted to this variant.
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// The database file could not be opened. Fatal at startup, never retried.
   #[error("failed to open database at {}: {source}", path.display())]
   Open {
      path: PathBuf,
      #[source]
      source: sqlx::Error,
   },

   /// A connection pragma could not be applied. Initialization is aborted
   /// rather than continuing with a half-configured connection.
   #[error("failed to apply `{pragma}`: {source}")]
   Pragma {
      pragma: String,
      #[source]
      source: sqlx::Error,
   },

   /// The connection has not been opened yet
   #[error("Database connection has not been initialized")]
   NotInitialized,

   /// Database has been closed and cannot be used
   #[error("Database has been closed")]
   DatabaseClosed,

   /// A WAL checkpoint requested by the caller failed
   #[error("wal_checkpoint({mode}) failed: {source}")]
   Checkpoint {
      mode: String,
      #[source]
      source: sqlx::Error,
   },
}

impl Error {
   /// Machine-readable code for this error.
   pub fn error_code(&self) -> &'static str {
      match self {
         Error::Io(_) => "IO_ERROR",
         Error::Sqlx(_) => "SQLX_ERROR",
         Error::Open { .. } => "OPEN_ERROR",
         Error::Pragma { .. } => "PRAGMA_ERROR",
         Error::NotInitialized => "NOT_INITIALIZED",
         Error::DatabaseClosed => "DATABASE_CLOSED",
         Error::Checkpoint { .. } => "CHECKPOINT_ERROR",
      }
   }

   /// The underlying sqlx error, if this error wraps one.
   pub fn as_sqlx(&self) -> Option<&sqlx::Error> {
      match self {
         Error::Sqlx(e)
         | Error::Open { source: e, .. }
         | Error::Pragma { source: e, .. }
         | Error::Checkpoint { source: e, .. } => Some(e),
         _ => None,
      }
   }
}

/// A type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_error_codes() {
      assert_eq!(Error::NotInitialized.error_code(), "NOT_INITIALIZED");
      assert_eq!(Error::DatabaseClosed.error_code(), "DATABASE_CLOSED");

      let err = Error::Pragma {
         pragma: "PRAGMA synchronous = NORMAL".into(),
         source: sqlx::Error::PoolClosed,
      };
      assert_eq!(err.error_code(), "PRAGMA_ERROR");
      assert!(err.to_string().contains("synchronous"));
   }

   #[test]
   fn test_open_error_mentions_path() {
      let err = Error::Open {
         path: PathBuf::from("/nope/app.db"),
         source: sqlx::Error::PoolTimedOut,
      };
      assert!(err.to_string().contains("/nope/app.db"));
      assert!(matches!(err.as_sqlx(), Some(sqlx::Error::PoolTimedOut)));
   }

   #[test]
   fn test_as_sqlx_none_for_state_errors() {
      assert!(Error::DatabaseClosed.as_sqlx().is_none());
   }
}
