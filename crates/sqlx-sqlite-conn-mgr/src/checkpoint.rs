//! WAL checkpointing
//!
//! Folds the write-ahead log back into the main database file. Checkpoints
//! are routine maintenance, so an unrecognised mode name degrades to
//! [`CheckpointMode::Normal`] instead of failing.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnection;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Checkpoint modes accepted by `PRAGMA wal_checkpoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckpointMode {
   /// Copy as many frames as possible without waiting on readers or writers
   Passive,
   /// Engine default. Issued as the bare pragma, which SQLite runs as passive
   #[default]
   Normal,
   /// Wait for writers, then checkpoint every frame
   Full,
   /// Like `Full`, then wait for readers so the next writer restarts the log
   Restart,
   /// Like `Restart`, then truncate the WAL file to zero bytes
   Truncate,
}

impl CheckpointMode {
   /// Parse a mode name case-insensitively, falling back to `Normal` for
   /// anything unrecognised.
   pub fn parse_lenient(mode: &str) -> Self {
      match mode.trim().to_ascii_uppercase().as_str() {
         "PASSIVE" => CheckpointMode::Passive,
         "NORMAL" => CheckpointMode::Normal,
         "FULL" => CheckpointMode::Full,
         "RESTART" => CheckpointMode::Restart,
         "TRUNCATE" => CheckpointMode::Truncate,
         other => {
            warn!(mode = other, "Unknown checkpoint mode, using NORMAL");
            CheckpointMode::Normal
         }
      }
   }

   pub fn as_str(&self) -> &'static str {
      match self {
         CheckpointMode::Passive => "PASSIVE",
         CheckpointMode::Normal => "NORMAL",
         CheckpointMode::Full => "FULL",
         CheckpointMode::Restart => "RESTART",
         CheckpointMode::Truncate => "TRUNCATE",
      }
   }

   pub fn statement(&self) -> String {
      match self {
         CheckpointMode::Normal => "PRAGMA wal_checkpoint".to_string(),
         mode => format!("PRAGMA wal_checkpoint({})", mode.as_str()),
      }
   }
}

impl fmt::Display for CheckpointMode {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

/// Row returned by `PRAGMA wal_checkpoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointResult {
   /// True when a `Full`, `Restart` or `Truncate` checkpoint could not
   /// finish because another connection held a lock.
   pub busy: bool,
   /// Frames in the WAL, or -1 when the database is not in WAL mode.
   pub log_frames: i64,
   /// Frames copied back into the database file, or -1 outside WAL mode.
   pub checkpointed_frames: i64,
}

pub(crate) async fn run_checkpoint(
   conn: &mut SqliteConnection,
   mode: CheckpointMode,
) -> Result<CheckpointResult> {
   let (busy, log_frames, checkpointed_frames): (i64, i64, i64) =
      sqlx::query_as(&mode.statement())
         .fetch_one(&mut *conn)
         .await
         .map_err(|source| Error::Checkpoint {
            mode: mode.to_string(),
            source,
         })?;

   let result = CheckpointResult {
      busy: busy != 0,
      log_frames,
      checkpointed_frames,
   };

   debug!(
      mode = %mode,
      busy = result.busy,
      log_frames,
      checkpointed_frames,
      "WAL checkpoint complete"
   );

   Ok(result)
}
