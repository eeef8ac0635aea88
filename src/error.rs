/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while opening, checkpointing or shutting down a store.
///
/// Write operations return [`sqlx_sqlite_writer::Error`] directly so the
/// operation's own error reaches the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Configuration rejected before anything was opened.
   #[error("invalid store config: {0}")]
   InvalidConfig(String),

   /// Configuration JSON could not be parsed.
   #[error("failed to parse store config: {0}")]
   ConfigParse(#[from] serde_json::Error),

   /// Error from the connection manager.
   #[error(transparent)]
   ConnectionManager(#[from] sqlx_sqlite_conn_mgr::Error),

   /// Error from the write coordinator.
   #[error(transparent)]
   Write(#[from] sqlx_sqlite_writer::Error),

   /// I/O error when preparing the database directory.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),
}

impl Error {
   /// Machine-readable error code.
   pub fn error_code(&self) -> String {
      match self {
         Error::InvalidConfig(_) => "INVALID_CONFIG".to_string(),
         Error::ConfigParse(_) => "CONFIG_PARSE_ERROR".to_string(),
         Error::ConnectionManager(e) => e.error_code().to_string(),
         Error::Write(e) => e.error_code(),
         Error::Io(_) => "IO_ERROR".to_string(),
      }
   }
}
