/// Result type alias for write coordinator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for coordinated writes.
///
/// Errors returned by a write operation come back exactly as the operation
/// produced them unless they were retried until the budget ran out, in
/// which case the last one is wrapped in [`Error::RetriesExhausted`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx operations.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Error from the connection manager.
   #[error(transparent)]
   ConnectionManager(#[from] sqlx_sqlite_conn_mgr::Error),

   /// Every attempt failed with a transient (busy/locked) error.
   #[error("{operation}: retries exhausted after {attempts} attempts: {source}")]
   RetriesExhausted {
      operation: String,
      attempts: u32,
      #[source]
      source: Box<Error>,
   },

   /// The caller cancelled the write before it committed.
   #[error("{operation}: cancelled after {attempts} attempts")]
   Cancelled { operation: String, attempts: u32 },

   /// Application error raised by a write operation.
   #[error(transparent)]
   Operation(Box<dyn std::error::Error + Send + Sync + 'static>),

   /// I/O error raised by a write operation.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),

   /// Generic error for operations that don't fit other categories.
   #[error("{0}")]
   Other(String),
}

impl Error {
   /// Wrap an application error returned from a write operation.
   pub fn operation<E>(err: E) -> Self
   where
      E: std::error::Error + Send + Sync + 'static,
   {
      Error::Operation(Box::new(err))
   }

   /// True when this error signals lock contention and the write may
   /// succeed if attempted again.
   pub fn is_transient(&self) -> bool {
      crate::classify::classify(self).is_transient()
   }

   /// The transient error that used up the retry budget, if any.
   pub fn last_transient(&self) -> Option<&Error> {
      match self {
         Error::RetriesExhausted { source, .. } => Some(source),
         _ => None,
      }
   }

   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => sqlx_error_code(e),
         Error::ConnectionManager(e) => match e.as_sqlx() {
            Some(inner) if inner.as_database_error().is_some() => sqlx_error_code(inner),
            _ => e.error_code().to_string(),
         },
         Error::RetriesExhausted { .. } => "RETRIES_EXHAUSTED".to_string(),
         Error::Cancelled { .. } => "CANCELLED".to_string(),
         Error::Operation(_) => "OPERATION_ERROR".to_string(),
         Error::Io(_) => "IO_ERROR".to_string(),
         Error::Other(_) => "ERROR".to_string(),
      }
   }
}

fn sqlx_error_code(e: &sqlx::Error) -> String {
   if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
      return format!("SQLITE_{}", code);
   }
   "SQLX_ERROR".to_string()
}
